//! `api` crate — HTTP REST API layer
//!
//! Exposes:
//!   GET    /api/v1/workflows
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows/:id
//!   PUT    /api/v1/workflows/:id
//!   DELETE /api/v1/workflows/:id
//!   GET    /api/v1/workflows/:id/versions
//!   POST   /api/v1/workflows/:id/versions/:version/restore
//!   POST   /api/v1/workflows/:id/execute
//!   GET    /api/v1/executions
//!   GET    /api/v1/executions/:id
//!   POST   /api/v1/executions/:id/cancel
//!   POST   /api/v1/approvals/:id/resolve
//!   GET    /api/v1/audit
//!   POST   /webhook/:path
//!
//! Auth/rate-limiting/CSRF are out of scope (spec Non-goal) — callers are
//! treated as external collaborators already holding a tenant identity via
//! the `X-Tenant-Id` header (see `tenant`).

pub mod handlers;
pub mod tenant;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use db::DbPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub engine: Arc<engine::Engine>,
}

pub async fn serve(bind: &str, pool: DbPool) -> Result<(), std::io::Error> {
    let eng = engine::build_engine(pool.clone(), engine::EngineConfig::default());
    let state = AppState { pool, engine: eng };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .route("/workflows", get(handlers::workflows::list).post(handlers::workflows::create))
        .route(
            "/workflows/:id",
            get(handlers::workflows::get).put(handlers::workflows::update).delete(handlers::workflows::delete),
        )
        .route("/workflows/:id/versions", get(handlers::workflows::list_versions))
        .route("/workflows/:id/versions/:version/restore", post(handlers::workflows::restore_version))
        .route("/workflows/:id/execute", post(handlers::executions::execute))
        .route("/executions", get(handlers::executions::list))
        .route("/executions/:id", get(handlers::executions::get))
        .route("/executions/:id/cancel", post(handlers::executions::cancel))
        .route("/approvals/:id/resolve", post(handlers::approvals::resolve))
        .route("/audit", get(handlers::audit::list));

    let app = Router::new()
        .nest("/api/v1", api_router)
        .route("/webhook/:path", post(handlers::webhooks::handle_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
