use super::validate::{finish, parse_body, require_non_empty};
use super::AppState;
use crate::auth::{hash_password, verify_password, Claims};
use crate::db;
use crate::error::ApiError;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: TokenUser,
}

fn check_password(password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    require_non_empty(&mut errors, "password", password);
    finish(errors)
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: LoginRequest = parse_body(&body)?;
    let user = db::users::credentials(&state.pool, &request.username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(request.password, user.hash.clone()).await? {
        tracing::warn!("Failed login for {}", user.username);
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(user.id, &user.username, user.team_id, &user.role)?;
    tracing::info!("User {} logged in", user.username);
    let body = TokenResponse {
        token,
        user: TokenUser {
            id: user.id,
            username: user.username,
        },
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Change the caller's own password and hand back a fresh token
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: PasswordRequest = parse_body(&body)?;
    check_password(&request.password)?;
    let hash = hash_password(request.password).await?;
    if db::users::set_password(&state.pool, claims.id, &hash).await? == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let token = state
        .tokens
        .issue(claims.id, &claims.username, claims.team, &claims.role)?;
    let body = TokenResponse {
        token,
        user: TokenUser {
            id: claims.id,
            username: claims.username,
        },
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Reset another user's password; only within the caller's team
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ResetPasswordRequest = parse_body(&body)?;
    check_password(&request.password)?;
    let user = db::users::credentials(&state.pool, &request.username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if user.team_id != claims.team {
        tracing::warn!(
            "{} tried to reset {} outside team {}",
            claims.username,
            user.username,
            claims.team
        );
        return Err(ApiError::Forbidden);
    }

    let hash = hash_password(request.password).await?;
    db::users::set_password(&state.pool, user.id, &hash).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User Password Updated" })),
    )
        .into_response())
}
