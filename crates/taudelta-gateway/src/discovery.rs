//! Discovery of members and their consumers from store tag indexes.
//!
//! A pass runs three dependent stages:
//!
//! ```text
//! member_id tag values ──► topic tag values per member ──► latest `cons` per consumer
//! ```
//!
//! Members are processed concurrently (bounded); within a member, status
//! lookups follow topic order. Any store error aborts the pass and the
//! membership index is left untouched.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};
use taudelta_core::metrics::{increment, record_seconds, set_gauge};
use taudelta_core::{
    Consumer, ConsumerMeta, MEASUREMENT, STATUS_WINDOW, TAG_CONS, TAG_CONSUMER_ID, TAG_MEMBER_ID,
    TAG_TOPIC, topic,
};

use crate::index::MembershipIndex;
use crate::store::{LatestFieldQuery, Store, StoreError, StoreResult, TagFilter};

/// Result of a discovery pass: member → consumers in store order.
pub type Membership = BTreeMap<String, Vec<Consumer>>;

/// Rebuilds the membership index from the store.
#[derive(Clone)]
pub struct Discovery {
    store: Arc<dyn Store>,
    index: MembershipIndex,
    concurrency: usize,
}

impl Discovery {
    pub fn new(store: Arc<dyn Store>, index: MembershipIndex, concurrency: usize) -> Self {
        Self {
            store,
            index,
            concurrency: concurrency.max(1),
        }
    }

    /// Run a full pass and merge the result into the index.
    pub async fn discover(&self) -> StoreResult<Membership> {
        increment("discovery_runs_total", 1);
        let started = Instant::now();

        let membership = match self.collect().await {
            Ok(membership) => membership,
            Err(e) => {
                increment("discovery_failures_total", 1);
                tracing::error!(error = %e, "discovery aborted");
                return Err(e);
            }
        };

        self.index.merge(&membership);

        let consumers: usize = membership.values().map(Vec::len).sum();
        record_seconds("discovery_duration_seconds", started.elapsed());
        set_gauge("discovery_members", membership.len() as f64);
        set_gauge("discovery_consumers", consumers as f64);
        set_gauge("index_members", self.index.len() as f64);

        tracing::info!(
            members = membership.len(),
            consumers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "discovery complete"
        );

        Ok(membership)
    }

    async fn collect(&self) -> StoreResult<Membership> {
        let member_ids = self.store.tag_values(TAG_MEMBER_ID, None).await?;
        tracing::debug!(count = member_ids.len(), "members found");

        let members: Vec<(String, Vec<Consumer>)> = stream::iter(member_ids)
            .map(|member_id| async move {
                let consumers = self.consumers_of(&member_id).await?;
                Ok::<_, StoreError>((member_id, consumers))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        Ok(members.into_iter().collect())
    }

    /// Stage 2 and 3 for one member.
    async fn consumers_of(&self, member_id: &str) -> StoreResult<Vec<Consumer>> {
        let filter = TagFilter::PathPrefix(topic::member_prefix(member_id));
        let topics = self.store.tag_values(TAG_TOPIC, Some(&filter)).await?;

        let mut consumers: Vec<Consumer> = Vec::with_capacity(topics.len());
        for topic_path in topics {
            let Some(consumer_id) = topic::consumer_id(member_id, &topic_path) else {
                tracing::debug!(member_id, topic = %topic_path, "skipping foreign topic");
                continue;
            };
            let consumer_id = consumer_id.to_string();
            if consumers.iter().any(|c| c.id == consumer_id) {
                continue;
            }

            let status = self
                .store
                .latest_field(&status_query(member_id, &consumer_id))
                .await?
                .unwrap_or_default();

            consumers.push(Consumer {
                id: consumer_id,
                meta: ConsumerMeta {
                    topic: topic_path,
                    status,
                },
            });
        }

        Ok(consumers)
    }
}

fn status_query(member_id: &str, consumer_id: &str) -> LatestFieldQuery {
    LatestFieldQuery {
        measurement: MEASUREMENT.to_string(),
        tags: vec![
            (TAG_MEMBER_ID.to_string(), member_id.to_string()),
            (TAG_CONSUMER_ID.to_string(), consumer_id.to_string()),
        ],
        window: STATUS_WINDOW,
        field: TAG_CONS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn engine(store: Arc<MemoryStore>) -> (Discovery, MembershipIndex) {
        let index = MembershipIndex::new();
        (Discovery::new(store, index.clone(), 4), index)
    }

    #[tokio::test]
    async fn discovers_members_consumers_and_status() {
        let store = Arc::new(
            MemoryStore::new()
                .with_tag_values("member_id", &["m1", "m2"])
                .with_tag_values(
                    "topic",
                    &[
                        "consumer/taudelta/m1/c1",
                        "/consumer/taudelta/m1/c2",
                        "consumer/taudelta/m2/c3",
                        "producer/m1/p1",
                    ],
                )
                .with_status("m1", "c1", "active"),
        );
        let (discovery, index) = engine(store);

        let membership = discovery.discover().await.unwrap();

        let ids = |m: &str| -> Vec<String> { membership[m].iter().map(|c| c.id.clone()).collect() };
        assert_eq!(ids("m1"), vec!["c1", "c2"]);
        assert_eq!(ids("m2"), vec!["c3"]);

        let c1 = index.get("m1", "c1").unwrap();
        assert_eq!(c1.topic, "consumer/taudelta/m1/c1");
        assert_eq!(c1.status, "active");
        // no recent record: empty status, not an error
        assert_eq!(index.get("m1", "c2").unwrap().status, "");
        assert_eq!(index.get("m1", "c2").unwrap().topic, "/consumer/taudelta/m1/c2");
    }

    #[tokio::test]
    async fn member_without_topics_has_no_consumers() {
        let store = Arc::new(MemoryStore::new().with_tag_values("member_id", &["lonely"]));
        let (discovery, index) = engine(store);

        let membership = discovery.discover().await.unwrap();
        assert_eq!(membership["lonely"], Vec::<Consumer>::new());
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn substring_members_do_not_share_topics() {
        // The store ignores the filter; the segment check still applies.
        let store = Arc::new(
            MemoryStore::new()
                .with_tag_values("member_id", &["member1", "member11"])
                .with_tag_values(
                    "topic",
                    &[
                        "consumer/taudelta/member1/a",
                        "consumer/taudelta/member11/b",
                    ],
                )
                .ignoring_filters(),
        );
        let (discovery, index) = engine(store);

        let membership = discovery.discover().await.unwrap();
        assert_eq!(membership["member1"].len(), 1);
        assert_eq!(membership["member1"][0].id, "a");
        assert_eq!(membership["member11"].len(), 1);
        assert_eq!(membership["member11"][0].id, "b");
        assert!(index.get("member1", "b").is_none());
    }

    #[tokio::test]
    async fn duplicate_topic_forms_collapse() {
        let store = Arc::new(
            MemoryStore::new()
                .with_tag_values("member_id", &["m1"])
                .with_tag_values(
                    "topic",
                    &["consumer/taudelta/m1/c1", "/consumer/taudelta/m1/c1"],
                ),
        );
        let (discovery, _) = engine(store);

        let membership = discovery.discover().await.unwrap();
        assert_eq!(membership["m1"].len(), 1);
        assert_eq!(membership["m1"][0].meta.topic, "consumer/taudelta/m1/c1");
    }

    #[tokio::test]
    async fn discovery_is_idempotent() {
        let store = Arc::new(
            MemoryStore::new()
                .with_tag_values("member_id", &["m1", "m2"])
                .with_tag_values(
                    "topic",
                    &["consumer/taudelta/m1/c1", "consumer/taudelta/m2/c2"],
                )
                .with_status("m2", "c2", "idle"),
        );
        let (discovery, index) = engine(store);

        let first = discovery.discover().await.unwrap();
        let snapshot = index.snapshot();
        let second = discovery.discover().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(snapshot, index.snapshot());
    }

    #[tokio::test]
    async fn failure_leaves_index_unchanged() {
        let store = Arc::new(
            MemoryStore::new()
                .with_tag_values("member_id", &["m1"])
                .with_tag_values("topic", &["consumer/taudelta/m1/c1"])
                .with_status("m1", "c1", "active"),
        );
        let (discovery, index) = engine(store.clone());
        discovery.discover().await.unwrap();
        let before = index.snapshot();

        // stage 3 fails after the store changed: nothing is committed
        store.set_status("m1", "c1", "idle");
        store.fail_latest();
        assert!(discovery.discover().await.is_err());
        assert_eq!(index.snapshot(), before);

        // stage 2 failure
        store.heal();
        store.fail_tag_values("topic");
        assert!(discovery.discover().await.is_err());
        assert_eq!(index.snapshot(), before);

        // stage 1 failure
        store.heal();
        store.fail_tag_values("member_id");
        assert!(discovery.discover().await.is_err());
        assert_eq!(index.get("m1", "c1").unwrap().status, "active");
    }

    #[tokio::test]
    async fn vanished_members_stay_indexed() {
        let store = Arc::new(
            MemoryStore::new()
                .with_tag_values("member_id", &["m1"])
                .with_tag_values("topic", &["consumer/taudelta/m1/c1"]),
        );
        let (discovery, index) = engine(store);
        discovery.discover().await.unwrap();

        let empty = Arc::new(MemoryStore::new());
        let rerun = Discovery::new(empty, index.clone(), 1);
        let membership = rerun.discover().await.unwrap();

        assert!(membership.is_empty());
        assert!(index.get("m1", "c1").is_some());
    }
}
