//! Tau/delta gateway - discovery and ingest in front of InfluxDB.
//!
//! The store has no notion of a member/consumer hierarchy. This crate
//! rebuilds one from tag indexes on demand, caches it, and uses the cache to
//! tag incoming tau/delta points before writing them back.
//!
//! # Architecture
//!
//! - **Store**: [`Store`] trait plus the InfluxDB v2 HTTP implementation
//! - **Discovery**: three-stage walk that rebuilds the [`MembershipIndex`]
//! - **Ingest**: validation, enrichment, persistence, then notification
//! - **Notify**: fire-and-forget forwarding to the sensors API
//! - **Routes**: the axum HTTP surface

mod config;
pub mod discovery;
mod error;
pub mod index;
pub mod ingest;
pub mod notify;
mod routes;
mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use self::config::Config;
pub use self::discovery::{Discovery, Membership};
pub use self::error::ApiError;
pub use self::index::MembershipIndex;
pub use self::ingest::{IngestError, Ingestor};
pub use self::notify::{HttpNotifier, Notifier};
pub use self::routes::router;
pub use self::state::AppState;
pub use self::store::{InfluxClient, InfluxConfig, Store, StoreError};
