use starlake_planner::PlanError;
use std::error::Error;
use std::io;

/// An opaque failure surfaced by an execution backend (missing file,
/// connection error, ...).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Msg(String),
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl BackendError {
    /// Builds an error from a printable message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Msg(msg.into())
    }

    /// Builds an error from an arbitrary source error.
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Other(error.into())
    }
}

/// A query evaluation error.
///
/// Every failure is fatal to the query that produced it; the orchestrator
/// never returns an empty success to signal an error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error while compiling the query into a plan.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// An error from the execution backend.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
