use crate::auth::TokenKeys;
use crate::config::AppConfig;
use crate::render::FontSet;
use crate::service::{InvoiceGenerator, JobRegistry};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,

    /// Signs and verifies bearer tokens
    pub tokens: Arc<TokenKeys>,

    /// Synchronous generation shares its batch limit with the job registry
    pub generator: Arc<InvoiceGenerator>,

    pub jobs: JobRegistry,

    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, fonts: Arc<FontSet>) -> Self {
        let tokens = Arc::new(TokenKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_hours));
        let generator = Arc::new(InvoiceGenerator::new(
            fonts,
            config.render.jpeg_quality,
            config.render.max_concurrent_batches,
        ));
        let jobs = JobRegistry::new(Arc::clone(&generator));
        Self {
            pool,
            tokens,
            generator,
            jobs,
            config: Arc::new(config),
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.config.server.max_body_mb * 1024 * 1024
    }
}
