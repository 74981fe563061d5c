//! Error types for the reconciliation engine.

use thiserror::Error;

use crate::fiber::FiberId;
use crate::host::HostError;

/// Errors that abort a reconciliation pass.
///
/// A failed pass is abandoned: the committed tree stays current and the
/// engine accepts new renders as usual.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The host could not create or initialise the node for a fiber.
    #[error("failed to create host node for fiber {fiber:?}: {source}")]
    CreateNode {
        fiber: FiberId,
        #[source]
        source: HostError,
    },

    /// A host call failed during commit. Mutations applied before the
    /// failure are not rolled back.
    #[error("commit aborted at fiber {fiber:?} after {applied} host mutations: {source}")]
    Commit {
        fiber: FiberId,
        applied: usize,
        #[source]
        source: HostError,
    },
}

impl EngineError {
    /// The host error behind this failure.
    pub fn host_error(&self) -> &HostError {
        match self {
            EngineError::CreateNode { source, .. } | EngineError::Commit { source, .. } => source,
        }
    }

    /// The fiber being processed when the failure happened.
    pub fn fiber(&self) -> FiberId {
        match self {
            EngineError::CreateNode { fiber, .. } | EngineError::Commit { fiber, .. } => *fiber,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
