//! In-memory store used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use taudelta_core::{Point, TAG_CONSUMER_ID, TAG_MEMBER_ID};

use crate::store::{LatestFieldQuery, Store, StoreError, StoreResult, TagFilter};

#[derive(Default)]
pub(crate) struct MemoryStore {
    tag_values: Mutex<HashMap<String, Vec<String>>>,
    statuses: Mutex<HashMap<(String, String), String>>,
    writes: Mutex<Vec<Point>>,
    failing_tag: Mutex<Option<String>>,
    fail_latest: AtomicBool,
    fail_writes: AtomicBool,
    ignore_filters: AtomicBool,
    queries: AtomicUsize,
}

fn injected(what: &str) -> StoreError {
    StoreError::Status {
        status: 500,
        message: format!("injected {what} failure"),
    }
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_tag_values(self, tag: &str, values: &[&str]) -> Self {
        self.tag_values.lock().insert(
            tag.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    pub(crate) fn with_status(self, member_id: &str, consumer_id: &str, status: &str) -> Self {
        self.set_status(member_id, consumer_id, status);
        self
    }

    pub(crate) fn set_status(&self, member_id: &str, consumer_id: &str, status: &str) {
        self.statuses.lock().insert(
            (member_id.to_string(), consumer_id.to_string()),
            status.to_string(),
        );
    }

    /// Return every stored value regardless of the filter passed in.
    pub(crate) fn ignoring_filters(self) -> Self {
        self.ignore_filters.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn fail_tag_values(&self, tag: &str) {
        *self.failing_tag.lock() = Some(tag.to_string());
    }

    pub(crate) fn fail_latest(&self) {
        self.fail_latest.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn heal(&self) {
        *self.failing_tag.lock() = None;
        self.fail_latest.store(false, Ordering::SeqCst);
        self.fail_writes.store(false, Ordering::SeqCst);
    }

    pub(crate) fn writes(&self) -> Vec<Point> {
        self.writes.lock().clone()
    }

    pub(crate) fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn tag_values(&self, tag: &str, filter: Option<&TagFilter>) -> StoreResult<Vec<String>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing_tag.lock().as_deref() == Some(tag) {
            return Err(injected("tag values"));
        }

        let ignore = self.ignore_filters.load(Ordering::SeqCst);
        let values = self.tag_values.lock().get(tag).cloned().unwrap_or_default();
        Ok(values
            .into_iter()
            .filter(|v| ignore || filter.is_none_or(|f| f.matches(v)))
            .collect())
    }

    async fn latest_field(&self, query: &LatestFieldQuery) -> StoreResult<Option<String>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_latest.load(Ordering::SeqCst) {
            return Err(injected("latest field"));
        }

        let tag = |name: &str| {
            query
                .tags
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let key = (tag(TAG_MEMBER_ID), tag(TAG_CONSUMER_ID));
        Ok(self.statuses.lock().get(&key).cloned())
    }

    async fn write_point(&self, point: &Point) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        self.writes.lock().push(point.clone());
        Ok(())
    }
}

/// Notifier that records every submission.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    submitted: Mutex<Vec<taudelta_core::TauDelta>>,
}

impl RecordingNotifier {
    pub(crate) fn submitted(&self) -> Vec<taudelta_core::TauDelta> {
        self.submitted.lock().clone()
    }
}

impl crate::notify::Notifier for RecordingNotifier {
    fn submit(&self, notification: taudelta_core::TauDelta) {
        self.submitted.lock().push(notification);
    }
}
