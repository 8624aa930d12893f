pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::require_auth;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Password task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
