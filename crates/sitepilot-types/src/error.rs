use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in sitepilot-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors raised by a mutation tool invocation.
///
/// Nothing is written when a tool returns an error: validation and
/// precondition checks happen before the single atomic commit.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("schema violation: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors surfaced from a message turn to the transport layer.
///
/// Gate failures and schema violations never appear here: the orchestrator
/// turns those into clarifying or "couldn't comply" assistant messages.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("generative service error: {0}")]
    Generative(#[from] LlmError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ToolError> for TurnError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Precondition(msg) => TurnError::Precondition(msg),
            ToolError::NotFound { entity, id } => TurnError::NotFound(format!("{entity} {id}")),
            ToolError::Unauthorized(msg) => TurnError::Unauthorized(msg),
            ToolError::Schema(violations) => TurnError::Precondition(format!(
                "arguments no longer valid: {}",
                violations.join("; ")
            )),
            ToolError::Repository(e) => TurnError::Storage(e),
        }
    }
}
