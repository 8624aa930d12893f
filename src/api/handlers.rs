use crate::error::ApiError;
use crate::render::{templates, TemplateSummary};
use crate::service::delivery::{content_disposition, PDF_MIME};
use crate::pdf::AssembledDocument;
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Header carrying the number of CSV rows left out of a generated document
pub const SKIPPED_ROWS_HEADER: &str = "x-skipped-rows";

/// Liveness check
pub async fn health_check() -> &'static str {
    "OK"
}

/// Bundled visual templates, in registry order
pub async fn bundled_templates() -> impl IntoResponse {
    let list: Vec<TemplateSummary> = templates().iter().map(TemplateSummary::from).collect();
    Json(json!({ "templates": list }))
}

/// PDF attachment response for a finished document
pub fn pdf_response(doc: &AssembledDocument, skipped: Option<usize>) -> Result<Response, ApiError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PDF_MIME)
        .header(header::CONTENT_DISPOSITION, content_disposition(doc))
        .header(header::CONTENT_LENGTH, doc.bytes.len());
    if let Some(count) = skipped {
        builder = builder.header(SKIPPED_ROWS_HEADER, HeaderValue::from(count));
    }
    builder
        .body(Body::from(doc.bytes.clone()))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// `{"message": ...}` with a status
pub fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}
