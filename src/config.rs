use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for CSV uploads and JSON bodies
    pub max_body_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// First admin, created with its own team when the users table is empty
    #[serde(default)]
    pub bootstrap_admin: Option<String>,
    #[serde(default)]
    pub bootstrap_password: Option<String>,
}

// Keep the secret out of startup logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .field(
                "bootstrap_password",
                &self.bootstrap_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// TrueType font used for invoice text. Falls back to a few common system
    /// locations when unset.
    pub font_path: Option<PathBuf>,
    /// Face for serif templates; the sans face is used when none loads
    pub serif_font_path: Option<PathBuf>,
    pub jpeg_quality: u8,
    pub max_concurrent_batches: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_body_mb: 16,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/invoicegen".to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                token_ttl_hours: 12,
                bootstrap_admin: None,
                bootstrap_password: None,
            },
            render: RenderConfig {
                font_path: None,
                serif_font_path: None,
                jpeg_quality: 95,
                max_concurrent_batches: 2,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("auth.jwt_secret must be set (INVOICEGEN__AUTH__JWT_SECRET or JWT_SECRET)")]
    MissingSecret,
}

impl AppConfig {
    /// Load configuration: defaults, then `config/default.toml`, then the file
    /// named by `INVOICEGEN_CONFIG`, then `INVOICEGEN__*` environment
    /// variables. `DATABASE_URL` and `JWT_SECRET` override everything.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let mut builder = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("server.max_body_mb", defaults.server.max_body_mb as i64)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default(
                "database.acquire_timeout_secs",
                defaults.database.acquire_timeout_secs as i64,
            )?
            .set_default("auth.jwt_secret", defaults.auth.jwt_secret)?
            .set_default("auth.token_ttl_hours", defaults.auth.token_ttl_hours)?
            .set_default("render.jpeg_quality", defaults.render.jpeg_quality as i64)?
            .set_default(
                "render.max_concurrent_batches",
                defaults.render.max_concurrent_batches as i64,
            )?
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(path) = std::env::var("INVOICEGEN_CONFIG") {
            if !path.is_empty() {
                builder = builder.add_source(config::File::with_name(&path));
            }
        }

        builder = builder
            .add_source(config::Environment::with_prefix("INVOICEGEN").separator("__"))
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(())
    }

    /// Username and password for the first admin, when both are configured
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        match (&self.auth.bootstrap_admin, &self.auth.bootstrap_password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user.as_str(), password.as_str()))
            }
            _ => None,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
