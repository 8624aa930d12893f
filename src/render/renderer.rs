use super::codes::{self, Bars, QrMatrix};
use super::raster::{FontSet, PageImage, Surface};
use super::template::TemplateDescriptor;
use super::RenderError;
use crate::models::InvoiceRecord;
use std::sync::Arc;
use tokio::task;

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Turns records into page images through one reusable surface
pub struct Renderer {
    surface: Option<Surface>,
    fonts: Arc<FontSet>,
    quality: u8,
}

/// Scoped attachment of the renderer's surface to one document.
/// Dropping the guard detaches the surface so the next record can reuse it.
struct Mount<'a> {
    slot: &'a mut Option<Surface>,
    surface: Option<Surface>,
}

impl<'a> Mount<'a> {
    fn attach(slot: &'a mut Option<Surface>, doc: &super::VisualDocument) -> Self {
        let surface = match slot.take() {
            Some(mut surface) if surface.fits(doc) => {
                surface.clear();
                surface
            }
            _ => Surface::for_document(doc),
        };
        Self {
            slot,
            surface: Some(surface),
        }
    }

    /// Lend the surface out for off-thread drawing
    fn lend(&mut self) -> Option<Surface> {
        self.surface.take()
    }

    fn give_back(&mut self, surface: Surface) {
        self.surface = Some(surface);
    }
}

impl Drop for Mount<'_> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            *self.slot = Some(surface);
        }
    }
}

impl Renderer {
    pub fn new(fonts: Arc<FontSet>, quality: u8) -> Self {
        Self {
            surface: None,
            fonts,
            quality,
        }
    }

    /// Whether a surface is parked for reuse
    #[cfg(test)]
    fn is_idle(&self) -> bool {
        self.surface.is_some()
    }

    /// Render one record with `template` and capture it as a JPEG page
    pub async fn render(
        &mut self,
        record: &InvoiceRecord,
        template: &TemplateDescriptor,
    ) -> Result<PageImage, RenderError> {
        let document = template.render(record);
        let mut mount = Mount::attach(&mut self.surface, &document);

        let (bars, qr) = drawing_steps(record).await?;

        let surface = mount
            .lend()
            .ok_or_else(|| RenderError::Capture("surface not mounted".to_string()))?;
        let fonts = Arc::clone(&self.fonts);
        let quality = self.quality;
        let (surface, page) = task::spawn_blocking(move || {
            let mut surface = surface;
            surface.paint(&document, &fonts, bars.as_ref(), qr.as_ref());
            let page = surface.capture(quality);
            (surface, page)
        })
        .await?;
        mount.give_back(surface);
        page
    }
}

/// Barcode and QR encoding, run concurrently on the blocking pool.
/// Both have finished when this returns; a step that fails leaves its slot blank.
async fn drawing_steps(record: &InvoiceRecord) -> Result<(Option<Bars>, Option<QrMatrix>), RenderError> {
    let data = record.invoice_number.clone();
    let ntn = record.importer.ntn.clone();
    let barcode = task::spawn_blocking(move || codes::encode_barcode(&data, &ntn));

    let payload = codes::qr_payload(&record.invoice_number, &record.importer.ntn, &record.fbr_code);
    let qr = task::spawn_blocking(move || codes::encode_qr(&payload));

    let (bars, qr) = futures::future::try_join(barcode, qr).await?;
    let bars = match bars {
        Ok(bars) => Some(bars),
        Err(e) => {
            tracing::error!(
                "Barcode step failed for invoice {}, leaving slot blank: {}",
                record.invoice_number,
                e
            );
            None
        }
    };
    let qr = match qr {
        Ok(matrix) => Some(matrix),
        Err(e) => {
            tracing::error!("QR code step failed, leaving slot blank: {}", e);
            None
        }
    };
    Ok((bars, qr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use crate::render::find_template;

    #[tokio::test]
    async fn renders_a_supersampled_jpeg_page() {
        let mut renderer = Renderer::new(Arc::new(FontSet::empty()), DEFAULT_JPEG_QUALITY);
        let template = find_template("standard").unwrap();
        let page = renderer.render(&record("INV-1"), template).await.unwrap();
        assert_eq!((page.width, page.height), (1588, 2246));
        assert_eq!(&page.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn surface_is_detached_and_reused_between_records() {
        let mut renderer = Renderer::new(Arc::new(FontSet::empty()), DEFAULT_JPEG_QUALITY);
        assert!(!renderer.is_idle());
        let template = find_template("modern").unwrap();
        renderer.render(&record("INV-1"), template).await.unwrap();
        assert!(renderer.is_idle());
        renderer.render(&record("INV-2"), template).await.unwrap();
        assert!(renderer.is_idle());
    }

    #[tokio::test]
    async fn same_record_gives_same_page() {
        let mut renderer = Renderer::new(Arc::new(FontSet::empty()), DEFAULT_JPEG_QUALITY);
        let template = find_template("business").unwrap();
        let first = renderer.render(&record("INV-1"), template).await.unwrap();
        let second = renderer.render(&record("INV-1"), template).await.unwrap();
        assert_eq!(first.jpeg, second.jpeg);
    }

    #[tokio::test]
    async fn drawing_steps_join_both_codes() {
        let (bars, qr) = drawing_steps(&record("INV-1")).await.unwrap();
        assert!(!bars.unwrap().modules.is_empty());
        assert!(qr.is_some());
    }

    #[tokio::test]
    async fn unencodable_invoice_number_still_renders() {
        let (bars, qr) = drawing_steps(&record("INV-ü€")).await.unwrap();
        assert!(bars.is_none());
        assert!(qr.is_some());

        let mut renderer = Renderer::new(Arc::new(FontSet::empty()), DEFAULT_JPEG_QUALITY);
        let template = find_template("standard").unwrap();
        let page = renderer.render(&record("INV-ü€"), template).await.unwrap();
        assert_eq!((page.width, page.height), (1588, 2246));
    }
}
