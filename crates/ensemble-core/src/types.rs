//! Data point types written to data nodes

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanosecond-precision Unix epoch timestamp
pub type Timestamp = i64;

/// A tag is an indexed key-value pair attached to a point
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(CoreError::EmptyTagKey);
        }
        if self.value.is_empty() {
            return Err(CoreError::EmptyTagValue(self.key.clone()));
        }
        reject_line_break(&self.key, "tag key")?;
        reject_line_break(&self.value, "tag value")
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.value.cmp(&other.value))
    }
}

/// Field value types accepted by the write endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    UnsignedInteger(u64),
    String(String),
    Boolean(bool),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::UnsignedInteger(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

/// A named, unindexed value in a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(CoreError::EmptyFieldKey);
        }
        reject_line_break(&self.key, "field key")
    }
}

/// A single measurement destined for a database on the cluster.
///
/// `database` and `retention_policy` select the write target; an empty
/// database defers to the node's configured default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub retention_policy: String,
    pub measurement: String,
    /// Nanoseconds since Unix epoch
    pub timestamp: Timestamp,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub fields: Vec<Field>,
}

impl Point {
    pub fn builder(measurement: impl Into<String>) -> PointBuilder {
        PointBuilder::new(measurement)
    }

    pub fn validate(&self) -> Result<()> {
        if self.measurement.is_empty() {
            return Err(CoreError::EmptyMeasurement);
        }
        reject_line_break(&self.measurement, "measurement")?;
        if self.fields.is_empty() {
            return Err(CoreError::NoFields);
        }
        for tag in &self.tags {
            tag.validate()?;
        }
        for field in &self.fields {
            field.validate()?;
        }
        Ok(())
    }

    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }
}

/// Builder for constructing Points
pub struct PointBuilder {
    database: String,
    retention_policy: String,
    measurement: String,
    timestamp: Option<Timestamp>,
    tags: Vec<Tag>,
    fields: Vec<Field>,
}

impl PointBuilder {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            database: String::new(),
            retention_policy: String::new(),
            measurement: measurement.into(),
            timestamp: None,
            tags: Vec::new(),
            fields: Vec::new(),
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

    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = Some(ts);
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push(Field::new(key, value));
        self
    }

    /// Build the point. Tags are sorted, which is the order data nodes
    /// expect in line protocol.
    pub fn build(mut self) -> Result<Point> {
        self.tags.sort();

        let point = Point {
            database: self.database,
            retention_policy: self.retention_policy,
            measurement: self.measurement,
            timestamp: self.timestamp.unwrap_or_else(now_nanos),
            tags: self.tags,
            fields: self.fields,
        };

        point.validate()?;
        Ok(point)
    }
}

/// Line protocol has no escape for line breaks in names and tag values
fn reject_line_break(s: &str, what: &'static str) -> Result<()> {
    if s.contains(['\n', '\r']) {
        return Err(CoreError::LineBreak(what));
    }
    Ok(())
}

fn now_nanos() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_ordering() {
        let tag1 = Tag::new("a", "1");
        let tag2 = Tag::new("b", "1");
        let tag3 = Tag::new("a", "2");

        assert!(tag1 < tag2);
        assert!(tag1 < tag3);
        assert!(tag3 < tag2);
    }

    #[test]
    fn test_point_builder() {
        let point = Point::builder("cpu")
            .database("telegraf")
            .retention_policy("autogen")
            .timestamp(1609459200000000000)
            .tag("region", "us-west")
            .tag("host", "server01")
            .field("usage", 64.5_f64)
            .build()
            .unwrap();

        assert_eq!(point.database, "telegraf");
        assert_eq!(point.retention_policy, "autogen");
        assert_eq!(point.timestamp, 1609459200000000000);
        assert_eq!(point.tags[0].key, "host");
        assert_eq!(point.tags[1].key, "region");
        assert_eq!(point.get_tag("host"), Some("server01"));
        assert_eq!(point.get_field("usage"), Some(&FieldValue::Float(64.5)));
    }

    #[test]
    fn test_point_validation() {
        assert!(Point::builder("cpu").field("value", 1_i64).build().is_ok());
        assert!(matches!(
            Point::builder("").field("value", 1_i64).build(),
            Err(CoreError::EmptyMeasurement)
        ));
        assert!(matches!(Point::builder("cpu").build(), Err(CoreError::NoFields)));
        assert!(matches!(
            Point::builder("cpu").tag("", "x").field("v", 1_i64).build(),
            Err(CoreError::EmptyTagKey)
        ));
    }

    #[test]
    fn test_tag_value_required() {
        assert!(matches!(
            Point::builder("cpu").tag("host", "").field("v", 1_i64).build(),
            Err(CoreError::EmptyTagValue(key)) if key == "host"
        ));
    }

    #[test]
    fn test_line_breaks_rejected() {
        assert!(matches!(
            Point::builder("cpu")
                .tag("host", "a\nevil usage=999i 1")
                .field("usage", 1.0_f64)
                .timestamp(5)
                .build(),
            Err(CoreError::LineBreak("tag value"))
        ));
        assert!(matches!(
            Point::builder("cpu").tag("ho\rst", "a").field("v", 1_i64).build(),
            Err(CoreError::LineBreak("tag key"))
        ));
        assert!(matches!(
            Point::builder("cpu").field("us\nage", 1_i64).build(),
            Err(CoreError::LineBreak("field key"))
        ));
        assert!(matches!(
            Point::builder("cpu\nmem").field("v", 1_i64).build(),
            Err(CoreError::LineBreak("measurement"))
        ));
    }

    #[test]
    fn test_default_timestamp_is_now() {
        let point = Point::builder("cpu").field("v", true).build().unwrap();
        assert!(point.timestamp > 1_600_000_000_000_000_000);
    }
}
