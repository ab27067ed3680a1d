//! Ingest payloads and consumer metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::point::{FieldValue, Point};
use crate::{Error, MEASUREMENT, Result, TAG_CONS, TAG_CONSUMER_ID, TAG_MEMBER_ID, TAG_TOPIC};

/// Raw `insert_tau_delta` body as received over HTTP.
///
/// Every field is optional here so that a missing field is reported as a
/// validation failure rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsertRequest {
    pub consumer_id: Option<String>,
    pub member_id: Option<String>,
    pub tau: Option<f64>,
    pub delta: Option<f64>,
}

/// A validated tau/delta submission for one (member, consumer) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TauDelta {
    pub member_id: String,
    pub consumer_id: String,
    pub tau: f64,
    pub delta: f64,
}

impl TryFrom<InsertRequest> for TauDelta {
    type Error = Error;

    fn try_from(request: InsertRequest) -> Result<Self> {
        let member_id = required_id("member_id", request.member_id)?;
        let consumer_id = required_id("consumer_id", request.consumer_id)?;
        let tau = required_number("tau", request.tau)?;
        let delta = required_number("delta", request.delta)?;

        Ok(Self {
            member_id,
            consumer_id,
            tau,
            delta,
        })
    }
}

fn required_id(field: &'static str, value: Option<String>) -> Result<String> {
    let value = value.ok_or(Error::MissingField(field))?;
    if value.trim().is_empty() {
        return Err(Error::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(Error::InvalidField {
            field,
            reason: "must not contain control characters".to_string(),
        });
    }
    if value.ends_with('\\') {
        return Err(Error::InvalidField {
            field,
            reason: "must not end with a backslash".to_string(),
        });
    }
    Ok(value)
}

fn required_number(field: &'static str, value: Option<f64>) -> Result<f64> {
    let value = value.ok_or(Error::MissingField(field))?;
    if !value.is_finite() {
        return Err(Error::InvalidField {
            field,
            reason: format!("must be a finite number, got {value}"),
        });
    }
    Ok(value)
}

impl TauDelta {
    /// Build the measurement point persisted for this submission.
    ///
    /// Missing metadata (consumer not yet discovered) yields empty `topic`
    /// and `cons` tags. `active` is always written as `false`.
    pub fn to_point(&self, meta: Option<&ConsumerMeta>, at: DateTime<Utc>) -> Point {
        let (topic, status) = meta
            .map(|m| (m.topic.as_str(), m.status.as_str()))
            .unwrap_or(("", ""));

        Point::new(MEASUREMENT, at)
            .tag(TAG_CONSUMER_ID, &self.consumer_id)
            .tag(TAG_MEMBER_ID, &self.member_id)
            .tag(TAG_CONS, status)
            .tag(TAG_TOPIC, topic)
            .field("active", FieldValue::Boolean(false))
            .field("tau", FieldValue::Float(self.tau))
            .field("delta", FieldValue::Float(self.delta))
    }
}

/// Metadata cached per discovered consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerMeta {
    /// Full topic path the consumer was discovered under.
    pub topic: String,
    /// Last observed `cons` value; empty when nothing was seen recently.
    pub status: String,
}

/// A consumer found by a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: String,
    #[serde(flatten)]
    pub meta: ConsumerMeta,
}
