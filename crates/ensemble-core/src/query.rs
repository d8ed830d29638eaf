//! Query requests and responses exchanged with data nodes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A query to execute against a single data node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Query text, e.g. `SHOW DATABASES`
    pub command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub retention_policy: String,
    /// Timestamp precision for returned times (`ns`, `ms`, `s`, ...)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub epoch: String,
}

impl Query {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    pub fn retention_policy(mut self, rp: impl Into<String>) -> Self {
        self.retention_policy = rp.into();
        self
    }

    pub fn epoch(mut self, epoch: impl Into<String>) -> Self {
        self.epoch = epoch.into();
        self
    }
}

/// Raw JSON body returned by a data node's query endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryResponse(Value);

impl QueryResponse {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    /// Statement results, if the body carries any
    pub fn results(&self) -> &[Value] {
        self.0
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Top-level or first statement-level error message
    pub fn error(&self) -> Option<&str> {
        if let Some(err) = self.0.get("error").and_then(Value::as_str) {
            return Some(err);
        }
        self.results()
            .iter()
            .find_map(|r| r.get("error").and_then(Value::as_str))
    }

    pub fn body(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}
