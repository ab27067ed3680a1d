//! Membership index: member → consumer → cached metadata.
//!
//! Discovery is the only writer; the ingest path reads it to tag points.
//! Entries are only as fresh as the last discovery pass and are never
//! updated by writes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use taudelta_core::{Consumer, ConsumerMeta};

/// Consumers of one member, keyed by consumer id.
pub type ConsumerMap = HashMap<String, ConsumerMeta>;

/// Shared two-level cache built by discovery.
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Clone, Default)]
pub struct MembershipIndex {
    inner: Arc<RwLock<HashMap<String, ConsumerMap>>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for a (member, consumer) pair, if discovered.
    pub fn get(&self, member_id: &str, consumer_id: &str) -> Option<ConsumerMeta> {
        self.inner
            .read()
            .get(member_id)
            .and_then(|consumers| consumers.get(consumer_id))
            .cloned()
    }

    /// Fold a discovery result into the index.
    ///
    /// Each discovered member's consumer map is replaced wholesale. Members
    /// missing from `discovered` keep their previous entries. The merge
    /// happens under a single write lock.
    pub fn merge(&self, discovered: &BTreeMap<String, Vec<Consumer>>) {
        let mut inner = self.inner.write();
        for (member_id, consumers) in discovered {
            let map: ConsumerMap = consumers
                .iter()
                .map(|c| (c.id.clone(), c.meta.clone()))
                .collect();
            inner.insert(member_id.clone(), map);
        }
    }

    /// Copy of the full mapping.
    pub fn snapshot(&self) -> HashMap<String, ConsumerMap> {
        self.inner.read().clone()
    }

    /// Number of members held.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
