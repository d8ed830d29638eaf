//! Data node client error types

use ensemble_core::{CoreError, Interrupted};
use thiserror::Error;

/// Data node errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node client is not connected")]
    NotConnected,

    #[error("Invalid node URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Node server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Node at {url} is unhealthy: {status}")]
    Unhealthy { url: String, status: u16 },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// Result type for data node operations
pub type Result<T> = std::result::Result<T, NodeError>;
