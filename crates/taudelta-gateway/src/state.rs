//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::discovery::Discovery;
use crate::index::MembershipIndex;
use crate::ingest::Ingestor;
use crate::notify::{HttpNotifier, Notifier};
use crate::store::{InfluxClient, Store};

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Member/consumer cache shared by discovery and ingest.
    pub index: MembershipIndex,

    /// Rebuilds `index` on `GET /members`.
    pub discovery: Discovery,

    /// Write path for `POST /insert_tau_delta`.
    pub ingestor: Ingestor,
}

impl AppState {
    /// Create application state backed by InfluxDB and the sensors API.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let store = InfluxClient::new(config.influx())?;
        let notifier = HttpNotifier::new(config.sensors_api.as_deref(), config.notify_timeout)?;

        match notifier.endpoint() {
            Some(endpoint) => tracing::info!(endpoint, "forwarding tau/delta notifications"),
            None => tracing::warn!("SENSORS_API not set, notifications disabled"),
        }

        Ok(Self::with_parts(
            Arc::new(store),
            Arc::new(notifier),
            config.discovery_concurrency,
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn with_parts(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        discovery_concurrency: usize,
    ) -> Self {
        let index = MembershipIndex::new();
        Self {
            discovery: Discovery::new(store.clone(), index.clone(), discovery_concurrency),
            ingestor: Ingestor::new(store, index.clone(), notifier),
            index,
        }
    }
}
