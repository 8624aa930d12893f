pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod parser;
pub mod pdf;
pub mod render;
pub mod service;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use db::create_pool;
pub use error::ApiError;
pub use service::{InvoiceGenerator, JobRegistry};
