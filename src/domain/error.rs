//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeKey;

/// Domain errors represent violations of the tree's structural rules.
/// These are independent of contributors and I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("node {key} is outside the subtree mounted at {mount}")]
    OutsideSubtree { mount: NodeKey, key: NodeKey },

    #[error("invalid node spec: {0}")]
    InvalidNodeSpec(String),
}

/// Result type for arena operations.
pub type DomainResult<T> = Result<T, DomainError>;
