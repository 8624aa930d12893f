use anyhow::Context;
use invoicegen::{auth, build_router, create_pool, db, render::FontSet, AppConfig, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    info!("Starting server with config: {:?}", config);

    let pool = create_pool(&config.database)
        .await
        .context("connecting to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;
    info!("Database pool created, migrations applied");

    if let Some((username, password)) = config.bootstrap_admin() {
        let hash = auth::hash_password(password.to_string()).await?;
        if db::users::bootstrap_admin(&pool, "Default", username, &hash).await?.is_none() {
            info!("Users exist, skipping admin bootstrap");
        }
    }

    let fonts = Arc::new(FontSet::load(
        config.render.font_path.as_ref(),
        config.render.serif_font_path.as_ref(),
    ));
    let addr = config.bind_addr();
    let app = build_router(AppState::new(pool, config, fonts));

    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/auth/login                 - issue a token");
    info!("  POST /api/invoices/generate?template - CSV upload to PDF");
    info!("  POST /api/invoices/jobs?template     - background generation");
    info!("  GET  /api/invoices/jobs/:id          - job progress");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
