pub mod delivery;
pub mod generator;
pub mod jobs;

pub use generator::{CancelFlag, GenerateError, InvoiceGenerator};
pub use jobs::{JobRegistry, JobState, JobStatus};
