use super::handlers::{message, pdf_response};
use super::validate::parse_body;
use super::AppState;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::models::InvoiceRecord;
use crate::parser::{parse_batch, ParsedBatch};
use crate::service::delivery::{share_links, ShareLinks};
use crate::service::{CancelFlag, GenerateError, JobState};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use uuid::Uuid;

pub const DEFAULT_TEMPLATE: &str = "standard";

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub template: Option<String>,
}

impl TemplateQuery {
    fn template_id(&self) -> String {
        self.template
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TEMPLATE)
            .to_string()
    }
}

fn read_upload(body: &[u8]) -> Result<ParsedBatch, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid(["CSV body is empty"]));
    }
    Ok(parse_batch(body)?)
}

/// Parse only; lets the client preview what will be rendered
pub async fn parse(body: Bytes) -> Result<Response, ApiError> {
    let batch = read_upload(&body)?;
    Ok(Json(json!({
        "records": batch.records,
        "skipped": batch.skipped,
    }))
    .into_response())
}

/// Render the whole upload and answer with the PDF
pub async fn generate(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let batch = read_upload(&body)?;
    let template_id = query.template_id();
    let (progress, _) = watch::channel(0u8);
    let doc = state
        .generator
        .generate(&batch.records, &template_id, &progress, &CancelFlag::new())
        .await?;
    pdf_response(&doc, Some(batch.skipped.len()))
}

/// Start a background batch; poll it under `/api/invoices/jobs/:id`
pub async fn submit_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<TemplateQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let batch = read_upload(&body)?;
    let records = batch.records.len();
    let job_id = state.jobs.submit(claims.team, batch.records, query.template_id())?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "jobId": job_id,
            "records": records,
            "skipped": batch.skipped,
        })),
    )
        .into_response())
}

fn job_not_found() -> ApiError {
    ApiError::NotFound("Job not found".to_string())
}

pub async fn job_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let status = state.jobs.status(claims.team, id).ok_or_else(job_not_found)?;
    Ok(Json(status).into_response())
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if !state.jobs.cancel(claims.team, id) {
        return Err(job_not_found());
    }
    Ok(message(StatusCode::OK, "Cancellation requested"))
}

pub async fn download_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    match state.jobs.state(claims.team, id).ok_or_else(job_not_found)? {
        JobState::Completed(doc) => pdf_response(&doc, None),
        JobState::Running => Err(ApiError::Conflict("Job is still running".to_string())),
        JobState::Failed(reason) => Err(ApiError::Conflict(format!("Job failed: {}", reason))),
        JobState::Cancelled => Err(GenerateError::Cancelled.into()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShareRequest {
    pub record: InvoiceRecord,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Compose messaging hand-off links; nothing is sent
pub async fn share(body: Bytes) -> Result<Json<ShareLinks>, ApiError> {
    let request: ShareRequest = parse_body(&body)?;
    Ok(Json(share_links(
        &request.record,
        request.phone.as_deref(),
        request.email.as_deref(),
        request.download_url.as_deref(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_defaults_to_standard() {
        assert_eq!(TemplateQuery { template: None }.template_id(), "standard");
        assert_eq!(TemplateQuery { template: Some(" ".into()) }.template_id(), "standard");
        assert_eq!(TemplateQuery { template: Some("modern".into()) }.template_id(), "modern");
    }
}
