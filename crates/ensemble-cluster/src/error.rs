//! Cluster client error types

use ensemble_core::Interrupted;
use ensemble_meta::MetaError;
use ensemble_node::NodeError;
use thiserror::Error;

/// Cluster client errors
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Client not initialized: call connect first")]
    Uninitialized,

    #[error("No data nodes available")]
    EmptyPool,

    #[error("None of the {discovered} discovered data nodes could be connected")]
    NoAvailableNodes { discovered: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;
