pub mod invoice_csv;
pub mod party_csv;

pub use invoice_csv::{parse_batch, ParsedBatch, RecordReader, RowOutcome, SkipReason, SkippedRow};
pub use party_csv::{read_parties, ClientRow, DuplicateRow, ImportOutcome, ImporterRow, PartyRow, RejectedRow};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
