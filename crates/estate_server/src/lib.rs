//! HTTP server for estate listings.
//!
//! Wires configuration, the process-wide [`Database`] handle and the axum
//! router together.

pub mod api;
pub mod config;

pub use api::{build_router, ActionResponse, ApiError, AppState};
pub use config::{ConfigError, ServerConfig};

use estate_core::{Database, DbError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::net::TcpListener;

/// Startup or serve-loop failure.
#[derive(Debug)]
pub enum ServeError {
    /// Database could not be opened or migrated.
    Db(DbError),
    /// Listener bind or accept loop failed.
    Io(std::io::Error),
    /// Startup task was cancelled or panicked.
    Task(tokio::task::JoinError),
}

impl Display for ServeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database init failed: {err}"),
            Self::Io(err) => write!(f, "server io failed: {err}"),
            Self::Task(err) => write!(f, "startup task failed: {err}"),
        }
    }
}

impl Error for ServeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

impl From<DbError> for ServeError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<std::io::Error> for ServeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<tokio::task::JoinError> for ServeError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task(value)
    }
}

/// Migrates the database, binds the listener and serves until ctrl-c.
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    let db_path = config.db_path.clone();
    let db = tokio::task::spawn_blocking(move || Database::init(db_path)).await??;

    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!(
        "event=server_start module=server status=ok addr={} db_path={}",
        listener.local_addr()?,
        db.path().display()
    );

    axum::serve(listener, build_router(AppState::new(db)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            "event=server_signal module=server status=error error={}",
            err
        );
    }
}
