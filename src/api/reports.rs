use super::validate::parse_body;
use super::AppState;
use crate::auth::Claims;
use crate::db;
use crate::error::ApiError;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportRequest {
    pub start_date: String,
    pub end_date: String,
}

/// RFC 3339 timestamps pass through; bare dates cover the whole day
fn parse_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(Utc.from_utc_datetime(&time))
}

impl ReportRequest {
    fn range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
        let mut errors = Vec::new();
        let start = parse_bound(&self.start_date, false);
        let end = parse_bound(&self.end_date, true);
        if start.is_none() {
            errors.push(format!("startDate is not a date: {}", self.start_date));
        }
        if end.is_none() {
            errors.push(format!("endDate is not a date: {}", self.end_date));
        }
        match (start, end) {
            (Some(start), Some(end)) if start <= end => Ok((start, end)),
            (Some(_), Some(_)) => Err(ApiError::invalid(["startDate is after endDate"])),
            _ => Err(ApiError::invalid(errors)),
        }
    }
}

pub async fn counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ReportRequest = parse_body(&body)?;
    let (start, end) = request.range()?;
    let counts = db::reports::counts(&state.pool, claims.team, start, end).await?;
    Ok((StatusCode::CREATED, Json(counts)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str) -> ReportRequest {
        ReportRequest {
            start_date: start.to_string(),
            end_date: end.to_string(),
        }
    }

    #[test]
    fn bare_dates_span_whole_days() {
        let (start, end) = request("2024-03-01", "2024-03-01").range().unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(end > start);
        assert_eq!(end.date_naive(), start.date_naive());
    }

    #[test]
    fn timestamps_are_accepted() {
        let (start, _) = request("2024-03-01T10:00:00+05:00", "2024-03-02").range().unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T05:00:00+00:00");
    }

    #[test]
    fn reversed_or_garbage_ranges_are_rejected() {
        assert!(request("2024-03-02", "2024-03-01").range().is_err());
        assert!(request("yesterday", "2024-03-01").range().is_err());
    }
}
