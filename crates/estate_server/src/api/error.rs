//! HTTP error envelope.
//!
//! Every failure leaves the server as
//! `{"ok": false, "error": {"kind": "<Kind>", "message": "..."}}`
//! with the status code fixed by its kind.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use estate_core::{ErrorKind, RepoError, ValidationError};
use log::{error, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::task::JoinError;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// Store, validation or storage bootstrap failure.
    Repo(RepoError),
    /// The blocking store task panicked or was cancelled.
    Task(JoinError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repo(err) => err.kind(),
            Self::Task(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind())
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateKey | ErrorKind::ConcurrentModification => StatusCode::CONFLICT,
        ErrorKind::DanglingReference => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "store task failed: {err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<JoinError> for ApiError {
    fn from(value: JoinError) -> Self {
        Self::Task(value)
    }
}

fn malformed(message: String) -> ApiError {
    ApiError::Repo(RepoError::Validation(ValidationError::Malformed(message)))
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        malformed(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        malformed(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        malformed(value.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: ErrorKind,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(
                "event=http_error module=api status=error kind={} error={}",
                kind.as_str(),
                self
            );
        } else {
            warn!(
                "event=http_error module=api status=error kind={} error={}",
                kind.as_str(),
                self
            );
        }

        let body = ErrorBody {
            ok: false,
            error: ErrorDetail {
                kind,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
