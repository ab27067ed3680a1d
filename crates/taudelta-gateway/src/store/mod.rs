//! Time-series store access.
//!
//! The gateway talks to its store through the [`Store`] trait so discovery
//! and ingest can run against InfluxDB in production and an in-memory fake
//! in tests.
//!
//! # Available Stores
//!
//! - [`InfluxClient`] - InfluxDB v2 over HTTP (Flux queries, line-protocol writes)
//!
//! Queries take structured filters ([`TagFilter`], [`LatestFieldQuery`]);
//! rendering them into a query language is the store's job, never the
//! caller's.

mod csv;
mod flux;
mod influx;

pub use influx::{InfluxClient, InfluxConfig};

use std::time::Duration;

use async_trait::async_trait;
use taudelta_core::Point;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors returned by a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never got a response (connect, timeout, body read).
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the store.
        message: String,
    },

    /// The query was accepted but failed while executing.
    #[error("query failed: {0}")]
    Query(String),

    /// The response body could not be decoded.
    #[error("undecodable store response: {0}")]
    Decode(String),

    /// The point could not be encoded for writing.
    #[error("point encoding failed: {0}")]
    Encode(#[from] taudelta_core::Error),
}

/// Filter applied to tag values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    /// Values starting with this path prefix (which ends in `/`), with or
    /// without one leading `/` on the value.
    PathPrefix(String),
}

impl TagFilter {
    /// Whether `value` passes this filter.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            TagFilter::PathPrefix(prefix) => taudelta_core::topic::has_path_prefix(value, prefix),
        }
    }
}

/// Lookup of the most recent value of one column within a time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestFieldQuery {
    /// Measurement to search.
    pub measurement: String,
    /// Exact tag equalities every record must satisfy.
    pub tags: Vec<(String, String)>,
    /// How far back from now to search.
    pub window: Duration,
    /// Field or tag column to read from the latest record.
    pub field: String,
}

/// A time-series store holding tagged, timestamped records.
#[async_trait]
pub trait Store: Send + Sync {
    /// Distinct values of `tag` across the bucket, optionally filtered.
    async fn tag_values(&self, tag: &str, filter: Option<&TagFilter>) -> StoreResult<Vec<String>>;

    /// Value of `query.field` on the latest matching record.
    ///
    /// `None` when nothing matched; empty when the latest record lacks the field.
    async fn latest_field(&self, query: &LatestFieldQuery) -> StoreResult<Option<String>>;

    /// Persist a single point.
    async fn write_point(&self, point: &Point) -> StoreResult<()>;
}
