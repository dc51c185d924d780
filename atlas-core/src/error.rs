use thiserror::Error;

/// Errors surfaced by the ATLAS coordination core.
///
/// Mirrors the error kinds enumerated in the design's error-handling
/// section: validation failures never reach a worker, routing and
/// worker failures are surfaced to the caller, notifier failures are
/// swallowed at the call site and never constructed here, and
/// `Internal` never leaks more than a generic message.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    /// Malformed task input; returned to the caller, never reaches workers.
    #[error("validation error: {0}")]
    Validation(String),
    /// No worker matched an action that required dispatch.
    #[error("routing error: {0}")]
    Routing(String),
    /// A worker reported `success=false` or failed to run.
    #[error("worker failure: {0}")]
    WorkerFailure(String),
    /// Unexpected internal condition; never leaks implementation detail.
    #[error("internal error")]
    Internal,
}

impl CoreError {
    /// Builds an `Internal` error while logging the real cause at the call site.
    #[must_use]
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(%cause, "internal error");
        Self::Internal
    }
}
