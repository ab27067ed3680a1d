//! Measurement points and their InfluxDB v2 line-protocol encoding.
//!
//! Line protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ns
//! ```
//!
//! See: <https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/>

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// A value that can be stored in a point field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit floating point.
    Float(f64),
    /// 64-bit signed integer.
    Integer(i64),
    /// UTF-8 string.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl FieldValue {
    /// Format this value for line protocol.
    ///
    /// - Float: written as-is (e.g., `3.14`)
    /// - Integer: suffixed with `i` (e.g., `42i`)
    /// - String: quoted with double quotes, inner quotes escaped (e.g., `"hello"`)
    /// - Boolean: `true` or `false`
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{v}"),
            FieldValue::Integer(v) => format!("{v}i"),
            FieldValue::String(v) => {
                let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\"")
            }
            FieldValue::Boolean(v) => v.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line_protocol())
    }
}

/// A single timestamped, tagged record destined for the store.
///
/// Points are built transiently by the write path and handed to the store
/// client; nothing retains them afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: Vec<(String, FieldValue)>,
    timestamp: DateTime<Utc>,
}

impl Point {
    /// Start a point for `measurement` at `timestamp`.
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: Vec::new(),
            timestamp,
        }
    }

    /// Add (or replace) a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Append a field. Fields keep insertion order.
    pub fn field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn field_value(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Encode this point as one line of line protocol.
    ///
    /// Tags are emitted sorted by key. Tags with an empty value are left
    /// out since the store rejects them. Names or tag values containing a
    /// line break or ending in a backslash are rejected: line protocol has
    /// no escape for the former, and the latter would escape the delimiter
    /// that follows it.
    pub fn to_line_protocol(&self) -> Result<String> {
        if self.fields.is_empty() {
            return Err(Error::EmptyPoint(self.measurement.clone()));
        }

        let timestamp_ns = self
            .timestamp
            .timestamp_nanos_opt()
            .ok_or_else(|| Error::InvalidField {
                field: "timestamp",
                reason: format!("{} is out of nanosecond range", self.timestamp),
            })?;

        let mut line = escape_measurement(checked("measurement", &self.measurement)?);

        for (key, value) in self.tags.iter().filter(|(_, v)| !v.is_empty()) {
            line.push(',');
            line.push_str(&escape_key(checked("tag key", key)?));
            line.push('=');
            line.push_str(&escape_key(checked("tag value", value)?));
        }

        line.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_key(checked("field key", key)?));
            line.push('=');
            line.push_str(&value.to_line_protocol());
        }

        line.push(' ');
        line.push_str(&timestamp_ns.to_string());

        Ok(line)
    }
}

fn checked<'a>(part: &'static str, s: &'a str) -> Result<&'a str> {
    if s.contains(['\n', '\r']) {
        return Err(Error::InvalidField {
            field: part,
            reason: format!("{s:?} contains a line break"),
        });
    }
    if s.ends_with('\\') {
        return Err(Error::InvalidField {
            field: part,
            reason: format!("{s:?} ends with a backslash"),
        });
    }
    Ok(s)
}

/// Spaces and commas must be escaped in measurement names.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys share the same escaping rules:
/// commas, equals signs and spaces.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}
