pub mod assembler;
pub mod geometry;

pub use assembler::{AssembledDocument, PdfAssembler};
pub use geometry::{place, Placement};

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("PDF error: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document has no pages")]
    NoPages,
}
