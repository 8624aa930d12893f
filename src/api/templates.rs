use super::handlers::message;
use super::validate::{finish, parse_body, require_non_empty, IdQuery, IdsQuery};
use super::AppState;
use crate::db::{self, templates::TemplateFilter, Page};
use crate::error::ApiError;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatePayload {
    pub name: String,
}

impl TemplatePayload {
    fn checked(self) -> Result<Self, ApiError> {
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "name", &self.name);
        finish(errors)?;
        Ok(self)
    }
}

pub async fn create(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let payload = parse_body::<TemplatePayload>(&body)?.checked()?;
    let created = db::templates::insert(&state.pool, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<TemplateFilter>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let templates = db::templates::list(&state.pool, &filter, &page).await?;
    Ok(Json(json!({ "templates": templates })).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Query(id): Query<IdQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = id.require()?;
    let payload = parse_body::<TemplatePayload>(&body)?.checked()?;
    if db::templates::update(&state.pool, id, &payload.name).await? == 0 {
        return Err(ApiError::NotFound("Template not found".to_string()));
    }
    Ok(Json(json!({ "name": payload.name, "id": id })).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Query(ids): Query<IdsQuery>,
) -> Result<Response, ApiError> {
    let ids = ids.parse()?;
    db::templates::delete(&state.pool, &ids).await?;
    Ok(message(StatusCode::OK, "Template(s) Deleted successfully"))
}
