use crate::models::InvoiceRecord;
use crate::pdf::{AssembledDocument, PdfAssembler, PdfError};
use crate::render::{find_template, FontSet, RenderError, Renderer};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("No valid invoice records to generate")]
    EmptyBatch,

    #[error("Template '{0}' not found")]
    UnknownTemplate(String),

    #[error("Rendering invoice {index} ({invoice_number}) failed: {source}")]
    Render {
        index: usize,
        invoice_number: String,
        #[source]
        source: RenderError,
    },

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("Generation cancelled")]
    Cancelled,
}

/// Shared stop request, checked between records
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Percentage reported before record `index` of `total`; 100 is kept for the finished document
pub fn progress_before(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (index as f64 / total as f64 * 100.0).round() as u8;
    pct.min(99)
}

/// Runs batches: one renderer and one assembler per batch, records in order
pub struct InvoiceGenerator {
    fonts: Arc<FontSet>,
    quality: u8,
    batches: Arc<Semaphore>,
}

impl InvoiceGenerator {
    pub fn new(fonts: Arc<FontSet>, quality: u8, max_concurrent_batches: usize) -> Self {
        Self {
            fonts,
            quality,
            batches: Arc::new(Semaphore::new(max_concurrent_batches.max(1))),
        }
    }

    /// Fail fast on what can be known before any rendering
    pub fn check(&self, records: &[InvoiceRecord], template_id: &str) -> Result<(), GenerateError> {
        if records.is_empty() {
            return Err(GenerateError::EmptyBatch);
        }
        if find_template(template_id).is_none() {
            return Err(GenerateError::UnknownTemplate(template_id.to_string()));
        }
        Ok(())
    }

    pub async fn generate(
        &self,
        records: &[InvoiceRecord],
        template_id: &str,
        progress: &watch::Sender<u8>,
        cancel: &CancelFlag,
    ) -> Result<AssembledDocument, GenerateError> {
        self.check(records, template_id)?;
        let template = find_template(template_id)
            .ok_or_else(|| GenerateError::UnknownTemplate(template_id.to_string()))?;

        // a closed semaphore only happens at shutdown; run unthrottled then
        let _permit = self.batches.acquire().await.ok();

        let total = records.len();
        let created_at = Utc::now();
        let mut renderer = Renderer::new(Arc::clone(&self.fonts), self.quality);
        let mut assembler: Option<PdfAssembler> = None;

        tracing::info!("Generating {} invoices with template {}", total, template.id);
        for (index, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Batch cancelled after {} of {} invoices", index, total);
                return Err(GenerateError::Cancelled);
            }
            progress.send_replace(progress_before(index, total));
            tracing::info!(
                "Rendering invoice {} remaining {}",
                record.invoice_number,
                total - index - 1
            );

            let page = renderer
                .render(record, template)
                .await
                .map_err(|source| GenerateError::Render {
                    index,
                    invoice_number: record.invoice_number.clone(),
                    source,
                })?;
            assembler
                .get_or_insert_with(|| PdfAssembler::new(template.id, created_at))
                .add_page(&page)?;
        }

        let document = assembler.ok_or(GenerateError::EmptyBatch)?.finish()?;
        progress.send_replace(100);
        tracing::info!(
            "Generated {} page PDF ({} bytes)",
            document.page_count(),
            document.bytes.len()
        );
        Ok(document)
    }
}
