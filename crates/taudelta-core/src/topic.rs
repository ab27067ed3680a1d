//! Consumer topic paths.
//!
//! Consumers publish under `consumer/taudelta/{member_id}/{consumer_id}`,
//! optionally with a leading `/`. Matching is anchored on path segments, so
//! the topics of `member11` never match `member1`.

/// Fixed prefix of every consumer topic.
pub const CONSUMER_TOPIC_PREFIX: &str = "consumer/taudelta/";

/// Topic prefix owned by `member_id`, always ending in `/`.
pub fn member_prefix(member_id: &str) -> String {
    format!("{CONSUMER_TOPIC_PREFIX}{member_id}/")
}

/// Canonical topic for a (member, consumer) pair.
pub fn consumer_topic(member_id: &str, consumer_id: &str) -> String {
    format!("{CONSUMER_TOPIC_PREFIX}{member_id}/{consumer_id}")
}

/// Whether `topic` starts with `prefix`, tolerating one leading `/` on the topic.
pub fn has_path_prefix(topic: &str, prefix: &str) -> bool {
    let topic = topic.strip_prefix('/').unwrap_or(topic);
    topic.starts_with(prefix)
}

/// Derive the consumer identifier from a topic belonging to `member_id`.
///
/// The consumer is the last `/`-delimited segment. Returns `None` when the
/// topic is not under the member's prefix or has no consumer segment.
pub fn consumer_id<'a>(member_id: &str, topic: &'a str) -> Option<&'a str> {
    let path = topic.strip_prefix('/').unwrap_or(topic);
    let rest = path
        .strip_prefix(CONSUMER_TOPIC_PREFIX)?
        .strip_prefix(member_id)?
        .strip_prefix('/')?;

    match rest.rsplit('/').next() {
        Some(id) if !id.is_empty() => Some(id),
        _ => None,
    }
}
