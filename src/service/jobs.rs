use super::generator::{CancelFlag, GenerateError, InvoiceGenerator};
use crate::models::InvoiceRecord;
use crate::pdf::AssembledDocument;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinError;
use uuid::Uuid;

/// Finished jobs are dropped from the registry after this long
const JOB_RETENTION_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub enum JobState {
    Running,
    Completed(Arc<AssembledDocument>),
    Failed(String),
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Completed(_) => "completed",
            JobState::Failed(_) => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    fn is_finished(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

struct JobEntry {
    team_id: i64,
    template_id: String,
    records: usize,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    progress: watch::Receiver<u8>,
    cancel: CancelFlag,
    state: JobState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: Uuid,
    pub status: &'static str,
    pub progress: u8,
    pub template_id: String,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Background generation batches, addressed by id and scoped to a team
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, JobEntry>>,
    generator: Arc<InvoiceGenerator>,
}

impl JobRegistry {
    pub fn new(generator: Arc<InvoiceGenerator>) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            generator,
        }
    }

    /// Validate and start a batch in the background
    pub fn submit(
        &self,
        team_id: i64,
        records: Vec<InvoiceRecord>,
        template_id: String,
    ) -> Result<Uuid, GenerateError> {
        self.generator.check(&records, &template_id)?;
        self.prune();

        let id = Uuid::new_v4();
        let (progress_tx, progress_rx) = watch::channel(0u8);
        let cancel = CancelFlag::new();
        self.jobs.insert(
            id,
            JobEntry {
                team_id,
                template_id: template_id.clone(),
                records: records.len(),
                created_at: Utc::now(),
                finished_at: None,
                progress: progress_rx,
                cancel: cancel.clone(),
                state: JobState::Running,
            },
        );
        tracing::info!("Job {} created: {} invoices, template {}", id, records.len(), template_id);

        let jobs = Arc::clone(&self.jobs);
        let generator = Arc::clone(&self.generator);
        let run = tokio::spawn(async move {
            generator
                .generate(&records, &template_id, &progress_tx, &cancel)
                .await
        });
        // the watcher outlives a panicking batch so the job still finishes
        tokio::spawn(async move {
            let state = finished_state(id, run.await);
            if let Some(mut entry) = jobs.get_mut(&id) {
                entry.state = state;
                entry.finished_at = Some(Utc::now());
            }
        });
        Ok(id)
    }

    pub fn status(&self, team_id: i64, id: Uuid) -> Option<JobStatus> {
        let entry = self.jobs.get(&id).filter(|e| e.team_id == team_id)?;
        let progress = *entry.progress.borrow();
        let (pages, error) = match &entry.state {
            JobState::Completed(doc) => (Some(doc.page_count()), None),
            JobState::Failed(message) => (None, Some(message.clone())),
            _ => (None, None),
        };
        Some(JobStatus {
            job_id: id,
            status: entry.state.as_str(),
            progress,
            template_id: entry.template_id.clone(),
            records: entry.records,
            pages,
            error,
            created_at: entry.created_at,
            finished_at: entry.finished_at,
        })
    }

    pub fn state(&self, team_id: i64, id: Uuid) -> Option<JobState> {
        self.jobs
            .get(&id)
            .filter(|e| e.team_id == team_id)
            .map(|e| e.state.clone())
    }

    /// Request cancellation; returns false when the job is unknown to this team
    pub fn cancel(&self, team_id: i64, id: Uuid) -> bool {
        match self.jobs.get(&id).filter(|e| e.team_id == team_id) {
            Some(entry) => {
                entry.cancel.cancel();
                tracing::info!("Job {} cancellation requested", id);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn prune(&self) {
        let cutoff = Utc::now() - Duration::minutes(JOB_RETENTION_MINUTES);
        self.jobs.retain(|_, entry| {
            !(entry.state.is_finished() && entry.finished_at.map_or(false, |t| t < cutoff))
        });
    }
}

fn finished_state(id: Uuid, result: Result<Result<AssembledDocument, GenerateError>, JoinError>) -> JobState {
    match result {
        Ok(Ok(doc)) => {
            tracing::info!("Job {} completed with {} pages", id, doc.page_count());
            JobState::Completed(Arc::new(doc))
        }
        Ok(Err(GenerateError::Cancelled)) => JobState::Cancelled,
        Ok(Err(e)) => {
            tracing::error!("Job {} failed: {}", id, e);
            JobState::Failed(e.to_string())
        }
        Err(e) => {
            tracing::error!("Job {} aborted: {}", id, e);
            JobState::Failed(format!("Generation aborted: {}", e))
        }
    }
}
