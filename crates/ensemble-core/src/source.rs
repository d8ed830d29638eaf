//! Connection template for a cluster and its data nodes

use serde::{Deserialize, Serialize};

/// Describes how to reach and authenticate against a time-series source.
///
/// For a cluster, `meta_url` names the administrative endpoint and `url` is
/// overwritten per data node during discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    pub name: String,
    /// Data node address, `host:port` or `scheme://host:port`
    pub url: String,
    pub meta_url: String,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Shared secret used to sign bearer tokens; preferred over basic auth
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shared_secret: String,
    pub insecure_skip_verify: bool,
    pub default_database: String,
}

impl Source {
    /// Copy this source, targeting `url` instead
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}
