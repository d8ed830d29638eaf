//! Line protocol encoding for write requests
//!
//! One point per line: `measurement[,tag=value...] field=value[,...] timestamp`.
//! Timestamps are written in nanoseconds.

use ensemble_core::{FieldValue, Point};
use std::collections::BTreeMap;

/// Encode points as newline-separated line protocol
pub fn encode<'a>(points: impl IntoIterator<Item = &'a Point>) -> String {
    let mut lines = Vec::new();

    for point in points {
        let mut line = escape_measurement(&point.measurement);

        for tag in &point.tags {
            line.push(',');
            line.push_str(&escape_key(&tag.key));
            line.push('=');
            line.push_str(&escape_key(&tag.value));
        }

        line.push(' ');
        let fields: Vec<String> = point
            .fields
            .iter()
            .map(|f| format!("{}={}", escape_key(&f.key), encode_value(&f.value)))
            .collect();
        line.push_str(&fields.join(","));

        line.push(' ');
        line.push_str(&point.timestamp.to_string());

        lines.push(line);
    }

    lines.join("\n")
}

/// Split points by write target, keeping the input order within each batch
pub fn group_by_target(points: &[Point]) -> BTreeMap<(&str, &str), Vec<&Point>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&Point>> = BTreeMap::new();
    for point in points {
        groups
            .entry((point.database.as_str(), point.retention_policy.as_str()))
            .or_default()
            .push(point);
    }
    groups
}

fn encode_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Float(v) => format!("{}", v),
        FieldValue::Integer(v) => format!("{}i", v),
        FieldValue::UnsignedInteger(v) => format!("{}u", v),
        FieldValue::String(v) => format!("\"{}\"", escape_string_value(v)),
        FieldValue::Boolean(v) => format!("{}", v),
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys share the same escaping
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_string_value(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
