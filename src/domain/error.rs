//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent model and interaction rule violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot parse XML: {message}")]
    Parse { message: String },

    #[error("edit conflict on <{node}>: field '{field}' no longer exists")]
    EditConflict { node: String, field: String },

    #[error("invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("node not found in tree")]
    NodeNotFound,

    #[error("the root node cannot be dragged")]
    RootNotDraggable,

    #[error("invalid drop target: {0}")]
    InvalidDropTarget(String),

    #[error("no drag in progress")]
    NoActiveDrag,
}

impl DomainError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
