//! REST surface over the location and property services.
//!
//! # Responsibility
//! - Map HTTP routes onto service calls.
//! - Run every store call on the blocking pool with its own connection.
//! - Log one line per request.
//!
//! # Invariants
//! - Handlers respond only after the store call has committed or failed.
//! - Errors always use the `ApiError` envelope.

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use estate_core::{check_integrity, core_version, ping, Database, IntegrityReport, RepoResult};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub mod error;
mod locations;
mod properties;

pub use error::ApiError;

/// Shared state injected into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }
}

/// Acknowledgement returned by update and delete routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub id: Uuid,
    pub message: String,
}

impl ActionResponse {
    pub(crate) fn success(id: Uuid, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PingResponse {
    ping: &'static str,
    version: &'static str,
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ping", get(ping_handler))
        .route("/integrity", get(integrity_handler))
        .nest("/location", locations::router())
        .nest("/properties", properties::router());

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs `op` on the blocking pool against a fresh connection.
pub(crate) async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
{
    let db = Arc::clone(&state.db);
    let result = tokio::task::spawn_blocking(move || -> RepoResult<T> {
        let conn = db.connect()?;
        op(&conn)
    })
    .await?;
    Ok(result?)
}

async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        ping: ping(),
        version: core_version(),
    })
}

async fn integrity_handler(
    State(state): State<AppState>,
) -> Result<Json<IntegrityReport>, ApiError> {
    let report = run_blocking(&state, check_integrity).await?;
    Ok(Json(report))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;
    info!(
        "event=http_request module=api status=ok method={} path={} http_status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );
    response
}
