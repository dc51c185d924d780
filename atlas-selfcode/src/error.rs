/// Errors raised by the self-coding pipeline and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SelfCodeError {
    /// A stage received input it cannot act on.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The analyze stage could not make sense of the seed source.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// The generate stage could not produce a candidate.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The safe executor refused to run the given source.
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// The safe executor's subprocess could not be spawned or reaped.
    #[error("execution failed: {0}")]
    Execution(String),

    /// An unexpected internal failure; the cause is logged, not surfaced.
    #[error("internal self-coding error")]
    Internal,
}

impl SelfCodeError {
    /// Logs `cause` at error level and returns the generic [`Self::Internal`]
    /// variant, mirroring `atlas_core::CoreError::internal`.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(%cause, "internal self-coding error");
        Self::Internal
    }
}
