//! JSON records exchanged with meta nodes

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Permissions keyed by database name. The empty key means "all databases".
pub type MetaPermissions = BTreeMap<String, Vec<String>>;

/// Cluster topology snapshot returned by `/show-cluster`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub data: Vec<DataNode>,
    #[serde(default)]
    pub meta: Vec<MetaNode>,
}

/// A data node as described by the meta endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataNode {
    pub id: u64,
    #[serde(default)]
    pub tcp_addr: String,
    pub http_addr: String,
    #[serde(default)]
    pub http_scheme: String,
    #[serde(default)]
    pub status: String,
}

impl DataNode {
    /// Address of the node's HTTP endpoint, with scheme
    pub fn url(&self) -> String {
        if self.http_addr.contains("://") {
            return self.http_addr.clone();
        }
        let scheme = if self.http_scheme.is_empty() {
            "http"
        } else {
            self.http_scheme.as_str()
        };
        format!("{}://{}", scheme, self.http_addr)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaNode {
    pub id: u64,
    pub addr: String,
    #[serde(default)]
    pub http_scheme: String,
    #[serde(default)]
    pub tcp_addr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: MetaPermissions,
}

impl MetaUser {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Users {
    #[serde(default)]
    pub users: Vec<MetaUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRole {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: MetaPermissions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

impl MetaRole {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    #[serde(default)]
    pub roles: Vec<MetaRole>,
}

/// Entries of `to` that `from` does not grant
pub fn permissions_missing(from: &MetaPermissions, to: &MetaPermissions) -> MetaPermissions {
    let mut missing = MetaPermissions::new();
    for (db, actions) in to {
        let held: BTreeSet<&String> = from.get(db).map(|a| a.iter().collect()).unwrap_or_default();
        let needed: Vec<String> = actions
            .iter()
            .filter(|a| !held.contains(a))
            .cloned()
            .collect();
        if !needed.is_empty() {
            missing.insert(db.clone(), needed);
        }
    }
    missing
}

/// Names in `to` that are absent from `from`, in `to` order
pub fn names_missing(from: &[String], to: &[String]) -> Vec<String> {
    let held: BTreeSet<&String> = from.iter().collect();
    let mut seen = BTreeSet::new();
    to.iter()
        .filter(|n| !held.contains(n) && seen.insert(*n))
        .cloned()
        .collect()
}
