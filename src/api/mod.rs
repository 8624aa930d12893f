pub mod auth;
pub mod generate;
pub mod handlers;
pub mod invoices;
pub mod parties;
pub mod reports;
pub mod state;
pub mod templates;
pub mod users;
pub mod validate;

pub use handlers::{bundled_templates, health_check, SKIPPED_ROWS_HEADER};
pub use state::AppState;

use crate::auth::require_auth;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let max_body = state.max_body_bytes();

    // everything below requires a bearer token
    let protected = Router::new()
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/user/reset-password", post(auth::reset_password))
        .route(
            "/api/client",
            post(parties::create)
                .get(parties::list)
                .put(parties::update)
                .delete(parties::delete),
        )
        .route("/api/client/import", post(parties::import))
        .route(
            "/api/invoice",
            post(invoices::create)
                .get(invoices::list)
                .put(invoices::update)
                .delete(invoices::delete),
        )
        .route(
            "/api/template",
            post(templates::create)
                .get(templates::list)
                .put(templates::update)
                .delete(templates::delete),
        )
        .route(
            "/api/user",
            post(users::create)
                .get(users::list)
                .put(users::update)
                .delete(users::delete),
        )
        .route("/api/reports", post(reports::counts))
        .route("/api/templates/bundled", get(handlers::bundled_templates))
        .route("/api/invoices/parse", post(generate::parse))
        .route("/api/invoices/generate", post(generate::generate))
        .route("/api/invoices/jobs", post(generate::submit_job))
        .route(
            "/api/invoices/jobs/:id",
            get(generate::job_status).delete(generate::cancel_job),
        )
        .route("/api/invoices/jobs/:id/download", get(generate::download_job))
        .route("/api/invoices/share", post(generate::share))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}
