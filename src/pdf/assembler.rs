use super::geometry::{mm_to_pt, place, Placement, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::PdfError;
use crate::render::PageImage;
use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

pub const PRODUCER: &str = "InvoiceGen";

/// Finished multi-page PDF plus the layout of every page
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub placements: Vec<Placement>,
    pub template_id: String,
    pub created_at: DateTime<Utc>,
}

impl AssembledDocument {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }
}

/// Builds an A4 portrait PDF one captured page at a time
pub struct PdfAssembler {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    placements: Vec<Placement>,
    template_id: String,
    created_at: DateTime<Utc>,
}

impl PdfAssembler {
    pub fn new(template_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );

        let info_id = document.add_object(dictionary! {
            "Title" => Object::string_literal(format!("Invoices-{}", created_at.format("%Y-%m-%d"))),
            "Subject" => Object::string_literal("Tax Invoices"),
            "Author" => Object::string_literal(PRODUCER),
            "Creator" => Object::string_literal(PRODUCER),
            "Keywords" => Object::string_literal("invoice, tax, business"),
        });
        document.trailer.set("Info", info_id);

        Self {
            document,
            pages_id,
            page_ids: Vec::new(),
            placements: Vec::new(),
            template_id: template_id.into(),
            created_at,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append a page holding `image`, fitted and centered inside the margins
    pub fn add_page(&mut self, image: &PageImage) -> Result<Placement, PdfError> {
        let placement = place(image.width, image.height);
        let page_width = mm_to_pt(PAGE_WIDTH_MM) as f32;
        let page_height = mm_to_pt(PAGE_HEIGHT_MM) as f32;

        let image_id = self.document.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                image.jpeg.clone(),
            )
            .with_compression(false),
        );

        // PDF space grows upwards from the bottom-left corner
        let draw_width = mm_to_pt(placement.width) as f32;
        let draw_height = mm_to_pt(placement.height) as f32;
        let x = mm_to_pt(placement.x) as f32;
        let y = page_height - mm_to_pt(placement.y) as f32 - draw_height;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        draw_width.into(),
                        0.into(),
                        0.into(),
                        draw_height.into(),
                        x.into(),
                        y.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .document
            .add_object(Stream::new(lopdf::Dictionary::new(), content.encode()?));

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_width.into(), page_height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        self.page_ids.push(page_id);
        self.placements.push(placement);
        Ok(placement)
    }

    /// Write the document out. At least one page is required.
    pub fn finish(mut self) -> Result<AssembledDocument, PdfError> {
        if self.page_ids.is_empty() {
            return Err(PdfError::NoPages);
        }
        if let Some(Object::Dictionary(pages)) = self.document.objects.get_mut(&self.pages_id) {
            let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::from(*id)).collect();
            pages.set("Kids", kids);
            pages.set("Count", self.page_ids.len() as i64);
        }
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        tracing::debug!(
            "Assembled {} page PDF ({} bytes) for template {}",
            self.page_ids.len(),
            bytes.len(),
            self.template_id
        );
        Ok(AssembledDocument {
            bytes,
            placements: self.placements,
            template_id: self.template_id,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::raster::Surface;
    use chrono::TimeZone;

    fn page() -> PageImage {
        Surface::new(40.0, 56.0, 2.0).capture(80).unwrap()
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn one_page_per_image_in_order() {
        let mut assembler = PdfAssembler::new("standard", created_at());
        for _ in 0..3 {
            assembler.add_page(&page()).unwrap();
        }
        let doc = assembler.finish().unwrap();
        assert_eq!(doc.page_count(), 3);

        let parsed = Document::load_mem(&doc.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 3);
    }

    #[test]
    fn metadata_carries_the_creation_date() {
        let mut assembler = PdfAssembler::new("modern", created_at());
        assembler.add_page(&page()).unwrap();
        let doc = assembler.finish().unwrap();
        let text = String::from_utf8_lossy(&doc.bytes);
        assert!(text.contains("Invoices-2024-03-01"));
        assert!(text.contains("Tax Invoices"));
        assert!(text.contains("DCTDecode"));
        assert_eq!(doc.template_id, "modern");
    }

    #[test]
    fn empty_document_is_refused() {
        let assembler = PdfAssembler::new("standard", created_at());
        assert!(matches!(assembler.finish(), Err(PdfError::NoPages)));
    }

    #[test]
    fn geometry_is_repeatable() {
        let build = || {
            let mut assembler = PdfAssembler::new("classic", created_at());
            assembler.add_page(&page()).unwrap();
            assembler.add_page(&page()).unwrap();
            assembler.finish().unwrap()
        };
        let first = build();
        let second = build();
        assert_eq!(first.placements, second.placements);
        assert_eq!(first.page_count(), second.page_count());
    }
}
