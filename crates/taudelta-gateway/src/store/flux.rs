//! Flux query rendering.
//!
//! Every caller-supplied string goes through [`string_literal`], which is
//! the only place values are spliced into query text.

use std::fmt::Write;
use std::time::Duration;

use super::{LatestFieldQuery, TagFilter};

/// Render `s` as a quoted Flux string literal.
pub(crate) fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // `${` opens string interpolation
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a window as a negative Flux duration (`-30s`, `-1500ms`).
fn negative_duration(window: Duration) -> String {
    let ms = window.as_millis().max(1);
    if ms % 1000 == 0 {
        format!("-{}s", ms / 1000)
    } else {
        format!("-{ms}ms")
    }
}

/// Distinct values of `tag` in `bucket`.
pub(crate) fn tag_values(bucket: &str, tag: &str, filter: Option<&TagFilter>) -> String {
    let mut query = String::from("import \"influxdata/influxdb/schema\"\n");
    if filter.is_some() {
        query.push_str("import \"strings\"\n");
    }
    let _ = write!(
        query,
        "\nschema.tagValues(bucket: {}, tag: {})",
        string_literal(bucket),
        string_literal(tag)
    );

    if let Some(TagFilter::PathPrefix(prefix)) = filter {
        let _ = write!(
            query,
            "\n  |> filter(fn: (r) => strings.hasPrefix(v: r._value, prefix: {}) or strings.hasPrefix(v: r._value, prefix: {}))",
            string_literal(prefix),
            string_literal(&format!("/{prefix}"))
        );
    }

    query
}

/// Latest records of `query.measurement` matching every tag, per series.
///
/// `last()` yields one row per series; the caller picks the newest.
pub(crate) fn latest_field(bucket: &str, query: &LatestFieldQuery) -> String {
    let mut predicate = format!("r._measurement == {}", string_literal(&query.measurement));
    for (key, value) in &query.tags {
        let _ = write!(
            predicate,
            " and r[{}] == {}",
            string_literal(key),
            string_literal(value)
        );
    }

    format!(
        "from(bucket: {})\n  |> range(start: {})\n  |> filter(fn: (r) => {})\n  |> last()",
        string_literal(bucket),
        negative_duration(query.window),
        predicate
    )
}
