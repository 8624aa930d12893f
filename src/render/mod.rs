pub mod codes;
pub mod document;
pub mod raster;
pub mod renderer;
pub mod template;

pub use document::VisualDocument;
pub use raster::{FontSet, PageImage};
pub use renderer::{Renderer, DEFAULT_JPEG_QUALITY};
pub use template::{find_template, templates, TemplateDescriptor, TemplateSummary, Theme};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Barcode error: {0}")]
    Barcode(String),

    #[error("QR code error: {0}")]
    Qr(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Drawing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
