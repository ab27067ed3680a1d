//! Write enrichment and ingest.
//!
//! A submission is validated, tagged with the metadata discovery cached for
//! its (member, consumer) pair, written synchronously, and then handed to
//! the notifier. Consumers not yet discovered are written with empty
//! `topic`/`cons` tags rather than rejected.

use std::sync::Arc;

use chrono::Utc;
use taudelta_core::metrics::increment;
use taudelta_core::{InsertRequest, TauDelta};
use thiserror::Error;

use crate::index::MembershipIndex;
use crate::notify::Notifier;
use crate::store::{Store, StoreError};

/// Errors returned by [`Ingestor::ingest`].
#[derive(Error, Debug)]
pub enum IngestError {
    /// The submission failed validation; the store was not contacted.
    #[error("invalid request: {0}")]
    Invalid(#[from] taudelta_core::Error),

    /// The store rejected or never acknowledged the write.
    #[error("write failed: {0}")]
    Store(#[from] StoreError),
}

/// Enriches and persists tau/delta submissions.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn Store>,
    index: MembershipIndex,
    notifier: Arc<dyn Notifier>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn Store>, index: MembershipIndex, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            index,
            notifier,
        }
    }

    /// Validate, enrich, persist, then forward a submission.
    ///
    /// Returns the accepted values. The forward is not awaited.
    pub async fn ingest(&self, request: InsertRequest) -> Result<TauDelta, IngestError> {
        let tau_delta = TauDelta::try_from(request).inspect_err(|e| {
            increment("ingest_rejected_total", 1);
            tracing::debug!(error = %e, "rejecting tau/delta submission");
        })?;

        let meta = self
            .index
            .get(&tau_delta.member_id, &tau_delta.consumer_id);
        if meta.is_none() {
            increment("ingest_unindexed_total", 1);
            tracing::debug!(
                member_id = %tau_delta.member_id,
                consumer_id = %tau_delta.consumer_id,
                "consumer not in membership index, writing without topic/cons"
            );
        }

        let point = tau_delta.to_point(meta.as_ref(), Utc::now());
        tracing::debug!(?point, "persisting point");

        if let Err(e) = self.store.write_point(&point).await {
            increment("ingest_write_failures_total", 1);
            tracing::error!(
                member_id = %tau_delta.member_id,
                consumer_id = %tau_delta.consumer_id,
                error = %e,
                "error writing point to store"
            );
            return Err(e.into());
        }
        increment("ingest_points_total", 1);

        self.notifier.submit(tau_delta.clone());

        Ok(tau_delta)
    }
}
