//! Core types and shared utilities for the tau/delta gateway.
//!
//! This crate provides:
//! - Ingest payload validation ([`InsertRequest`] into [`TauDelta`])
//! - Consumer metadata carried by the membership index ([`ConsumerMeta`])
//! - The consumer topic grammar (`consumer/taudelta/{member}/{consumer}`)
//! - InfluxDB line-protocol encoding for measurement points
//! - Prometheus metrics helpers
//! - Shared error types

mod error;
mod model;
pub mod metrics;
pub mod point;
pub mod topic;

// ═══════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════

/// Measurement holding tau/delta points.
pub const MEASUREMENT: &str = "tau_delta";

/// Tag carrying the member identifier.
pub const TAG_MEMBER_ID: &str = "member_id";

/// Tag carrying the consumer identifier.
pub const TAG_CONSUMER_ID: &str = "consumer_id";

/// Tag carrying the full consumer topic path.
pub const TAG_TOPIC: &str = "topic";

/// Tag (and column) carrying the consumer status.
pub const TAG_CONS: &str = "cons";

/// How far back discovery looks for a consumer's latest status.
pub const STATUS_WINDOW: std::time::Duration = std::time::Duration::from_secs(30);

pub use error::{Error, Result};
pub use model::{Consumer, ConsumerMeta, InsertRequest, TauDelta};
pub use point::{FieldValue, Point};
