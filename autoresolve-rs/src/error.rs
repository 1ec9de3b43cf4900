// autoresolve-rs/src/error.rs
// Crate-level error type.
//
// Each component keeps its own error enum; this one only aggregates them
// for callers that want a single `Result`.

use crate::collaborators::CollaboratorError;
use crate::events::EventSourceError;
use crate::executor::ExecutorError;
use crate::history::HistoryError;
use crate::learning::LearningStoreError;
use crate::logging::LoggingError;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    EventSource(#[from] EventSourceError),

    #[error(transparent)]
    LearningStore(#[from] LearningStoreError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Logging(#[from] LoggingError),
}

pub type Result<T> = std::result::Result<T, ResolverError>;
