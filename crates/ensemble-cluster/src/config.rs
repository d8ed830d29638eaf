//! Cluster client configuration
//!
//! Settings can be loaded from a TOML file or built in code. `validate` checks
//! the meta URL up front so a bad address is reported before any network I/O.

use crate::error::{ClusterError, Result};
use ensemble_core::Source;
use ensemble_meta::parse_meta_url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound for `request_timeout_secs`, one day
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Connection settings for a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Display name of the source
    pub name: String,
    /// Meta endpoint, `host:port` or `scheme://host:port`
    pub meta_url: String,
    /// Force HTTPS towards the meta endpoint
    pub tls: bool,
    /// Accept any TLS certificate from meta and data nodes
    pub insecure_skip_verify: bool,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Leader redirects to follow on meta requests
    pub max_redirects: usize,
    pub username: String,
    pub password: String,
    /// Shared secret for signed bearer tokens; takes precedence over basic auth
    pub shared_secret: String,
    /// Database used when a query or point names none
    pub default_database: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "ensemble".to_string(),
            meta_url: "http://localhost:8091".to_string(),
            tls: false,
            insecure_skip_verify: false,
            request_timeout_secs: 30,
            max_redirects: 5,
            username: String::new(),
            password: String::new(),
            shared_secret: String::new(),
            default_database: String::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ClusterError::Configuration(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ClusterError::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connection template handed to `ClusterClient::connect`
    pub fn source(&self) -> Source {
        Source {
            name: self.name.clone(),
            url: self.meta_url.clone(),
            meta_url: self.meta_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            shared_secret: self.shared_secret.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
            default_database: self.default_database.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.meta_url.trim().is_empty() {
            return Err(ClusterError::Configuration("meta_url must be set".to_string()));
        }
        parse_meta_url(&self.meta_url, self.tls)
            .map_err(|e| ClusterError::Configuration(e.to_string()))?;

        if self.request_timeout_secs == 0 {
            return Err(ClusterError::Configuration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ClusterError::Configuration(format!(
                "request_timeout_secs must be at most {}",
                MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        if !self.password.is_empty() && self.username.is_empty() {
            return Err(ClusterError::Configuration(
                "password is set without a username".to_string(),
            ));
        }

        Ok(())
    }
}
