//! InfluxDB v2 store over HTTP.
//!
//! Reads go through `/api/v2/query` as Flux with CSV responses; writes go
//! through `/api/v2/write` as line protocol with nanosecond precision.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use taudelta_core::Point;

use super::csv::{self, Record};
use super::{LatestFieldQuery, Store, StoreError, StoreResult, TagFilter, flux};

/// Connection settings for InfluxDB.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Server URL (e.g., "http://localhost:8086").
    pub url: String,
    /// API token.
    pub token: String,
    /// Organization name.
    pub org: String,
    /// Bucket every query and write targets.
    pub bucket: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// InfluxDB v2 client bound to one organization and bucket.
#[derive(Clone)]
pub struct InfluxClient {
    http: reqwest::Client,
    config: InfluxConfig,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    dialect: Dialect,
}

#[derive(Serialize)]
struct Dialect {
    header: bool,
    annotations: [&'static str; 0],
    delimiter: &'static str,
}

/// JSON error body returned by the InfluxDB API.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl InfluxClient {
    /// Create a client from connection settings.
    pub fn new(config: InfluxConfig) -> StoreResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        tracing::info!(
            url = %config.url,
            org = %config.org,
            bucket = %config.bucket,
            "InfluxDB client initialized"
        );

        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.token)
    }

    /// Run a Flux query and decode its CSV response.
    async fn query(&self, flux: &str) -> StoreResult<Vec<Record>> {
        tracing::debug!(query = %flux, "running flux query");

        let body = QueryBody {
            query: flux,
            kind: "flux",
            dialect: Dialect {
                header: true,
                annotations: [],
                delimiter: ",",
            },
        };

        let response = self
            .http
            .post(self.endpoint("/api/v2/query"))
            .query(&[("org", self.config.org.as_str())])
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, "application/csv")
            .json(&body)
            .send()
            .await?;

        let text = check_status(response).await?.text().await?;
        csv::decode(&text)
    }
}

/// Turn a non-success response into [`StoreError::Status`].
async fn check_status(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(text);

    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Value of `field` on a record, whether it is a column (tag) or the
/// `_value` of a row whose `_field` is `field`.
fn field_of<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    if let Some(value) = record.get(field) {
        return Some(value.as_str());
    }
    match record.get("_field") {
        Some(name) if name == field => record.get("_value").map(String::as_str),
        _ => None,
    }
}

fn time_of(record: &Record) -> Option<DateTime<Utc>> {
    record
        .get("_time")
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl Store for InfluxClient {
    async fn tag_values(&self, tag: &str, filter: Option<&TagFilter>) -> StoreResult<Vec<String>> {
        let records = self
            .query(&flux::tag_values(&self.config.bucket, tag, filter))
            .await?;

        let mut values: Vec<String> = Vec::with_capacity(records.len());
        for mut record in records {
            let Some(value) = record.remove("_value") else {
                return Err(StoreError::Decode(
                    "tag values response has no _value column".to_string(),
                ));
            };
            if filter.is_some_and(|f| !f.matches(&value)) {
                tracing::debug!(tag, value = %value, "dropping tag value outside filter");
                continue;
            }
            if !values.contains(&value) {
                values.push(value);
            }
        }

        Ok(values)
    }

    async fn latest_field(&self, query: &LatestFieldQuery) -> StoreResult<Option<String>> {
        let records = self
            .query(&flux::latest_field(&self.config.bucket, query))
            .await?;

        // The newest record decides, even when it lacks the field. On a time
        // tie the record carrying the field wins, so field-row output is read
        // from its own row.
        let latest = records
            .iter()
            .max_by_key(|record| (time_of(record), field_of(record, &query.field).is_some()))
            .map(|record| {
                field_of(record, &query.field)
                    .unwrap_or_default()
                    .to_string()
            });

        Ok(latest)
    }

    async fn write_point(&self, point: &Point) -> StoreResult<()> {
        let line = point.to_line_protocol()?;
        tracing::debug!(line = %line, "writing point");

        let response = self
            .http
            .post(self.endpoint("/api/v2/write"))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
