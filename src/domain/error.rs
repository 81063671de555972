//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent decision-tree rule violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("No 'root' node found, cannot export")]
    MissingRoot,

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("ID already exists: {0}")]
    NodeExists(String),

    #[error("cannot delete root")]
    CannotDeleteRoot,

    #[error("cannot rename root")]
    CannotRenameRoot,

    #[error("invalid node id {id:?}: {reason}")]
    InvalidNodeId { id: String, reason: String },

    #[error("field '{field}' does not apply to {node_type} node {id}")]
    FieldNotApplicable {
        id: String,
        field: &'static str,
        node_type: &'static str,
    },

    #[error("node {id} has no option {index}")]
    OptionOutOfRange { id: String, index: usize },

    #[error("cycle detected at node: {0}")]
    CycleDetected(String),

    #[error("tree cannot be walked, it contains a cycle through: {}", .0.join(", "))]
    CyclicTree(Vec<String>),

    #[error("invalid position code {code:?}: {reason}")]
    InvalidPosition { code: String, reason: String },

    #[error("invalid export: {message}")]
    InvalidExport { message: String },

    #[error("node key {key} does not match embedded id {id}")]
    IdMismatch { key: String, id: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
