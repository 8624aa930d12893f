use crate::auth::AuthError;
use crate::parser::ParseError;
use crate::service::GenerateError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request")]
    Validation(Value),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid User")]
    InvalidCredentials,

    #[error("Unauthorized Operation")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("Could not read CSV: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Auth(AuthError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 400 with a list of field problems
    pub fn invalid<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let errors: Vec<String> = errors.into_iter().map(Into::into).collect();
        ApiError::Validation(json!(errors))
    }

    pub fn missing_id() -> Self {
        ApiError::Validation(json!("Missing Id"))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return ApiError::Conflict("Record already exists".to_string());
            }
            if db.is_foreign_key_violation() {
                return ApiError::BadRequest("Referenced record does not exist".to_string());
            }
        }
        ApiError::Database(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => ApiError::Unauthorized("No token provided".to_string()),
            AuthError::Expired | AuthError::InvalidToken(_) => {
                ApiError::Unauthorized("Invalid token".to_string())
            }
            other => ApiError::Auth(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Validation(errors) => {
                let body = Json(json!({
                    "error": "InvalidRequest",
                    "message": self.to_string(),
                    "errors": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "InvalidCredentials"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            Self::Parse(_) => (StatusCode::BAD_REQUEST, "InvalidCsv"),
            Self::Generate(e) => match e {
                GenerateError::EmptyBatch => (StatusCode::BAD_REQUEST, "EmptyBatch"),
                GenerateError::UnknownTemplate(_) => (StatusCode::BAD_REQUEST, "TemplateNotFound"),
                GenerateError::Cancelled => (StatusCode::CONFLICT, "Cancelled"),
                GenerateError::Render { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "GenerationFailed"),
                GenerateError::Pdf(_) => {
                    tracing::error!("PDF assembly failed: {}", self);
                    (StatusCode::INTERNAL_SERVER_ERROR, "GenerationFailed")
                }
            },
            Self::Auth(_) | Self::Database(_) | Self::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                let body = Json(json!({
                    "error": "InternalError",
                    "message": "An internal error occurred",
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
        };

        let body = Json(json!({
            "error": code,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
