//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Normalize client input before it reaches validation.
//! - Retry a mutation once when a concurrent writer got in first.
//!
//! # Invariants
//! - Only `ConcurrentModification` is retried, and at most once.
//! - Every retry re-runs the whole store call, so it re-reads current state.

use crate::repo::RepoResult;
use log::warn;

pub mod location_service;
pub mod property_service;

/// Runs `op`, retrying once when it fails with a retryable error.
pub(crate) fn with_retry<T>(
    operation: &'static str,
    mut op: impl FnMut() -> RepoResult<T>,
) -> RepoResult<T> {
    match op() {
        Err(err) if err.is_retryable() => {
            warn!(
                "event=store_retry module=service status=start operation={} error_code={}",
                operation,
                err.kind().as_str()
            );
            op()
        }
        other => other,
    }
}
