use super::codes::{Bars, QrMatrix};
use super::document::{Align, Element, Face, Rgb, TextRun, VisualDocument};
use super::RenderError;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, RgbImage};
use rusttype::{point, Font, PositionedGlyph, Scale};
use std::path::{Path, PathBuf};

/// Supersampling factor between document pixels and surface pixels
pub const SUPERSAMPLE: f32 = 2.0;

const WHITE: image::Rgb<u8> = image::Rgb([255, 255, 255]);

const SANS_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const SERIF_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
    "/usr/share/fonts/TTF/DejaVuSerif.ttf",
    "/usr/share/fonts/dejavu/DejaVuSerif.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
    "/Library/Fonts/Times New Roman.ttf",
    "C:\\Windows\\Fonts\\times.ttf",
];

/// Fonts used for text runs; missing faces fall back to the sans face
#[derive(Default)]
pub struct FontSet {
    sans: Option<Font<'static>>,
    serif: Option<Font<'static>>,
}

fn load_font(path: &Path) -> Option<Font<'static>> {
    let bytes = std::fs::read(path).ok()?;
    Font::try_from_vec(bytes)
}

fn first_available(configured: Option<&PathBuf>, candidates: &[&str]) -> Option<Font<'static>> {
    if let Some(path) = configured {
        match load_font(path) {
            Some(font) => return Some(font),
            None => tracing::warn!("Could not load font {}", path.display()),
        }
    }
    candidates.iter().find_map(|p| load_font(Path::new(p)))
}

impl FontSet {
    pub fn load(sans_path: Option<&PathBuf>, serif_path: Option<&PathBuf>) -> Self {
        let fonts = Self {
            sans: first_available(sans_path, SANS_CANDIDATES),
            serif: first_available(serif_path, SERIF_CANDIDATES),
        };
        if fonts.sans.is_none() && fonts.serif.is_none() {
            tracing::warn!("No TrueType font found; invoices will be rendered without text");
        }
        fonts
    }

    /// A set with no faces; text runs are skipped
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_text(&self) -> bool {
        self.sans.is_some() || self.serif.is_some()
    }

    fn face(&self, face: Face) -> Option<&Font<'static>> {
        match face {
            Face::Serif => self.serif.as_ref().or(self.sans.as_ref()),
            Face::Sans => self.sans.as_ref().or(self.serif.as_ref()),
        }
    }
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("sans", &self.sans.is_some())
            .field("serif", &self.serif.is_some())
            .finish()
    }
}

/// Captured page
#[derive(Debug, Clone)]
pub struct PageImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Pixel buffer for one page at supersampled resolution
pub struct Surface {
    image: RgbImage,
    scale: f32,
}

impl Surface {
    pub fn new(doc_width: f32, doc_height: f32, scale: f32) -> Self {
        let width = (doc_width * scale).round() as u32;
        let height = (doc_height * scale).round() as u32;
        Self {
            image: ImageBuffer::from_pixel(width, height, WHITE),
            scale,
        }
    }

    pub fn for_document(doc: &VisualDocument) -> Self {
        Self::new(doc.width, doc.height, SUPERSAMPLE)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn fits(&self, doc: &VisualDocument) -> bool {
        let (w, h) = self.dimensions();
        w == (doc.width * self.scale).round() as u32 && h == (doc.height * self.scale).round() as u32
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = WHITE;
        }
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> Rgb {
        let p = self.image.get_pixel(x, y);
        Rgb(p[0], p[1], p[2])
    }

    /// Draw every element of `doc`; code slots take the encoded patterns and
    /// stay blank when a pattern is missing
    pub fn paint(
        &mut self,
        doc: &VisualDocument,
        fonts: &FontSet,
        bars: Option<&Bars>,
        qr: Option<&QrMatrix>,
    ) {
        for element in &doc.elements {
            match element {
                Element::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                } => self.fill(*x, *y, *width, *height, *fill),
                Element::Text(run) => self.draw_text(run, fonts),
                Element::BarcodeSlot {
                    x,
                    y,
                    width,
                    height,
                } => {
                    if let Some(bars) = bars {
                        self.draw_bars(bars, fonts, *x, *y, *width, *height);
                    }
                }
                Element::QrSlot { x, y, size } => {
                    if let Some(matrix) = qr {
                        self.draw_qr(matrix, *x, *y, *size);
                    }
                }
            }
        }
    }

    /// Fill a rectangle given in document pixels
    fn fill(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let (w, h) = self.dimensions();
        let x0 = ((x * self.scale).round().max(0.0) as u32).min(w);
        let y0 = ((y * self.scale).round().max(0.0) as u32).min(h);
        let x1 = (((x + width) * self.scale).round().max(0.0) as u32).min(w);
        let y1 = (((y + height) * self.scale).round().max(0.0) as u32).min(h);
        let px = image::Rgb([color.0, color.1, color.2]);
        for py in y0..y1 {
            for pxx in x0..x1 {
                self.image.put_pixel(pxx, py, px);
            }
        }
    }

    fn blend(&mut self, x: i32, y: i32, color: Rgb, coverage: f32) {
        let (w, h) = self.dimensions();
        if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h || coverage <= 0.0 {
            return;
        }
        let current = self.image.get_pixel_mut(x as u32, y as u32);
        let target = [color.0, color.1, color.2];
        for i in 0..3 {
            current[i] = (target[i] as f32 * coverage + current[i] as f32 * (1.0 - coverage)).round() as u8;
        }
    }

    fn draw_text(&mut self, run: &TextRun, fonts: &FontSet) {
        let Some(font) = fonts.face(run.face) else {
            return;
        };
        let scale = Scale::uniform(run.size * self.scale);
        let width = text_width(font, &run.content, scale);
        let left = run.x * self.scale;
        let start_x = match run.align {
            Align::Left => left,
            Align::Center => left - width / 2.0,
            Align::Right => left - width,
        };
        let baseline = run.y * self.scale;
        let glyphs: Vec<PositionedGlyph<'_>> = font.layout(&run.content, scale, point(start_x, baseline)).collect();
        let passes: &[i32] = if run.bold { &[0, 1] } else { &[0] };
        for shift in passes {
            for glyph in &glyphs {
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|gx, gy, coverage| {
                        self.blend(bb.min.x + gx as i32 + shift, bb.min.y + gy as i32, run.color, coverage);
                    });
                }
            }
        }
    }

    fn draw_bars(&mut self, bars: &Bars, fonts: &FontSet, x: f32, y: f32, width: f32, height: f32) {
        if bars.modules.is_empty() {
            return;
        }
        let caption_height = if fonts.has_text() { 16.0 } else { 0.0 };
        let bar_height = height - caption_height;
        let module = width / bars.modules.len() as f32;
        for (i, m) in bars.modules.iter().enumerate() {
            if *m == 1 {
                self.fill(x + i as f32 * module, y, module, bar_height, Rgb::BLACK);
            }
        }
        if caption_height > 0.0 {
            self.draw_text(
                &TextRun {
                    x: x + width / 2.0,
                    y: y + height - 2.0,
                    size: 12.0,
                    content: bars.caption.clone(),
                    color: Rgb::BLACK,
                    bold: false,
                    face: Face::Sans,
                    align: Align::Center,
                },
                fonts,
            );
        }
    }

    fn draw_qr(&mut self, matrix: &QrMatrix, x: f32, y: f32, size: f32) {
        if matrix.width == 0 {
            return;
        }
        // two-module quiet zone
        let modules = matrix.width + 4;
        let cell = size / modules as f32;
        self.fill(x, y, size, size, Rgb::WHITE);
        for my in 0..matrix.width {
            for mx in 0..matrix.width {
                if matrix.is_dark(mx, my) {
                    self.fill(
                        x + (mx + 2) as f32 * cell,
                        y + (my + 2) as f32 * cell,
                        cell,
                        cell,
                        Rgb::BLACK,
                    );
                }
            }
        }
    }

    /// Encode the current pixels as a JPEG
    pub fn capture(&self, quality: u8) -> Result<PageImage, RenderError> {
        let (width, height) = self.dimensions();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode(self.image.as_raw(), width, height, image::ColorType::Rgb8)
            .map_err(|e| RenderError::Capture(e.to_string()))?;
        Ok(PageImage { jpeg, width, height })
    }
}

fn text_width(font: &Font<'_>, text: &str, scale: Scale) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}
