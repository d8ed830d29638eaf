//! Meta client error types

use ensemble_core::{CoreError, Interrupted};
use thiserror::Error;

/// Meta client errors
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("Invalid meta URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Meta server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Invalid redirect: {0}")]
    Redirect(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl MetaError {
    /// HTTP status reported by the meta node, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            MetaError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for meta operations
pub type Result<T> = std::result::Result<T, MetaError>;
