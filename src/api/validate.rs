use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Decode a JSON body; shape errors become a 400 before anything touches the database
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid(["request body is empty"]));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::invalid([e.to_string()]))
}

/// `?id=<n>` on update endpoints
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub fn require(&self) -> Result<i64, ApiError> {
        self.id
            .as_deref()
            .and_then(|id| id.trim().parse().ok())
            .ok_or_else(ApiError::missing_id)
    }
}

/// `?ids=[1,2,3]` on delete endpoints; absent means nothing to delete
#[derive(Debug, Default, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

impl IdsQuery {
    pub fn parse(&self) -> Result<Vec<i64>, ApiError> {
        match self.ids.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| ApiError::invalid([format!("ids must be a JSON array of integers: {}", e)])),
        }
    }
}

pub fn require_non_empty(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{} must not be empty", field));
    }
}

pub fn finish(errors: Vec<String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::invalid(errors))
    }
}
