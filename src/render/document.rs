/// A4 at 96 dpi, in CSS pixels
pub const PAGE_WIDTH_PX: f32 = 794.0;
pub const PAGE_HEIGHT_PX: f32 = 1123.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GRAY_900: Rgb = Rgb(17, 24, 39);
    pub const GRAY_700: Rgb = Rgb(55, 65, 81);
    pub const GRAY_500: Rgb = Rgb(107, 114, 128);
    pub const GRAY_200: Rgb = Rgb(229, 231, 235);
    pub const GRAY_50: Rgb = Rgb(249, 250, 251);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Sans,
    Serif,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Anchor x; meaning depends on `align`
    pub x: f32,
    /// Baseline
    pub y: f32,
    pub size: f32,
    pub content: String,
    pub color: Rgb,
    pub bold: bool,
    pub face: Face,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Rgb,
    },
    Text(TextRun),
    /// Filled by the barcode drawing step
    BarcodeSlot {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Filled by the QR drawing step
    QrSlot { x: f32, y: f32, size: f32 },
}

/// Display list for one invoice page
#[derive(Debug, Clone, PartialEq)]
pub struct VisualDocument {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Element>,
}

impl VisualDocument {
    pub fn a4() -> Self {
        Self {
            width: PAGE_WIDTH_PX,
            height: PAGE_HEIGHT_PX,
            elements: Vec::new(),
        }
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Rgb) {
        self.elements.push(Element::Rect {
            x,
            y,
            width,
            height,
            fill,
        });
    }

    /// Horizontal rule of the given thickness
    pub fn rule(&mut self, x: f32, y: f32, width: f32, weight: f32, color: Rgb) {
        if weight > 0.0 {
            self.rect(x, y, width, weight, color);
        }
    }

    /// Rectangle outline drawn as four rules
    pub fn frame(&mut self, x: f32, y: f32, width: f32, height: f32, weight: f32, color: Rgb) {
        if weight <= 0.0 {
            return;
        }
        self.rect(x, y, width, weight, color);
        self.rect(x, y + height - weight, width, weight, color);
        self.rect(x, y, weight, height, color);
        self.rect(x + width - weight, y, weight, height, color);
    }

    pub fn text(&mut self, run: TextRun) {
        self.elements.push(Element::Text(run));
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text(run) => Some(run),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.content.contains(needle))
    }
}
