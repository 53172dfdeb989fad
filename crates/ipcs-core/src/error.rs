//! Error types for node assembly.

use crate::host::HostError;
use crate::routing::RoutingError;
use ipcs_repo::RepoError;
use thiserror::Error;

/// Error type for building and running a node.
#[derive(Error, Debug)]
pub enum NodeError {
    /// `build` was called on a builder that has already been consumed.
    #[error("node builder has already been built")]
    AlreadyBuilt,

    /// The caller's context was cancelled during construction.
    #[error("node construction cancelled")]
    Cancelled,

    #[error("repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
