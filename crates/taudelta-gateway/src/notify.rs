//! Best-effort forwarding of accepted tau/delta values.
//!
//! Each accepted write is relayed to `{SENSORS_API}/update_tau_delta` on a
//! detached task. Failures are logged and counted, never retried and never
//! reported to the ingest caller. Notifications still in flight when the
//! process exits are lost.

use std::time::Duration;

use reqwest::StatusCode;
use taudelta_core::TauDelta;
use taudelta_core::metrics::increment;

/// Path appended to the notification base URL.
pub const UPDATE_PATH: &str = "/update_tau_delta";

/// Sink for accepted writes. `submit` must return without waiting.
pub trait Notifier: Send + Sync {
    fn submit(&self, notification: TauDelta);
}

/// Forwards notifications over HTTP on detached tokio tasks.
#[derive(Clone)]
pub struct HttpNotifier {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpNotifier {
    /// Create a notifier posting to `{base_url}/update_tau_delta`.
    ///
    /// With no base URL every submission is skipped.
    pub fn new(base_url: Option<&str>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = base_url.map(|base| format!("{}{UPDATE_PATH}", base.trim_end_matches('/')));
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

/// POST one notification and report the response status.
async fn deliver(
    http: &reqwest::Client,
    url: &str,
    notification: &TauDelta,
) -> reqwest::Result<StatusCode> {
    let response = http.post(url).json(notification).send().await?;
    Ok(response.status())
}

impl Notifier for HttpNotifier {
    fn submit(&self, notification: TauDelta) {
        let Some(url) = self.endpoint.clone() else {
            increment("notify_skipped_total", 1);
            tracing::debug!(
                member_id = %notification.member_id,
                consumer_id = %notification.consumer_id,
                "no notification endpoint configured, skipping"
            );
            return;
        };

        let http = self.http.clone();
        tokio::spawn(async move {
            match deliver(&http, &url, &notification).await {
                Ok(status) if status.is_success() => {
                    increment("notify_sent_total", 1);
                    tracing::debug!(
                        member_id = %notification.member_id,
                        consumer_id = %notification.consumer_id,
                        "notification delivered"
                    );
                }
                Ok(status) => {
                    increment("notify_failures_total", 1);
                    tracing::warn!(
                        url = %url,
                        status = status.as_u16(),
                        "notification endpoint returned non-success status"
                    );
                }
                Err(e) => {
                    increment("notify_failures_total", 1);
                    tracing::warn!(url = %url, error = %e, "failed to call notification endpoint");
                }
            }
        });
    }
}
