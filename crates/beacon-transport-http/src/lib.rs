// # HTTP Report Transport
//
// This crate delivers reports to the collector over HTTP.
//
// ## Wire Contract
//
// One POST per delivery attempt to `http://<host>:<port>/report` with a
// JSON body:
//
// ```json
// {
//   "hostname": "web-1",
//   "ip": "10.0.0.4",
//   "timestamp": "2025-01-09T12:00:00Z"
// }
// ```
//
// The timestamp is the reporter's clock at send time. It is informational
// only: the collector stamps `last_seen` from its own clock, so clock
// skew on the fleet cannot corrupt the stored ordering.
//
// ## Outcome Mapping
//
// - 2xx response       → Delivered
// - any other response → Rejected (status + response body)
// - request error      → Unreachable (connect failure, timeout, DNS)
//
// This transport is single-shot: one attempt per call with full outcome
// propagation. Retry and backoff policy is owned by the reporting engine.

use async_trait::async_trait;
use beacon_core::traits::{DeliveryOutcome, ObservedIdentity, ReportTransport};
use serde::Serialize;
use std::time::Duration;

/// Default HTTP timeout for delivery attempts
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body of one report
#[derive(Debug, Serialize)]
struct ReportPayload<'a> {
    hostname: &'a str,
    ip: String,
    timestamp: String,
}

/// HTTP transport posting reports to the collector's report endpoint
pub struct HttpReportTransport {
    /// Full URL of the collector's report endpoint
    endpoint: String,

    /// HTTP client (timeout configured at construction)
    client: reqwest::Client,
}

impl HttpReportTransport {
    /// Create a transport targeting the given collector
    pub fn new(collector_host: impl AsRef<str>, collector_port: u16) -> Self {
        Self::with_timeout(collector_host, collector_port, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a transport with a custom request timeout
    pub fn with_timeout(
        collector_host: impl AsRef<str>,
        collector_port: u16,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            endpoint: format!(
                "http://{}:{}/report",
                collector_host.as_ref(),
                collector_port
            ),
            client,
        }
    }

    /// The report endpoint URL this transport posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReportTransport for HttpReportTransport {
    async fn deliver(&self, identity: &ObservedIdentity) -> DeliveryOutcome {
        let payload = ReportPayload {
            hostname: &identity.hostname,
            ip: identity.ip.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        tracing::debug!("posting report for {} to {}", identity, self.endpoint);

        let response = match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                return DeliveryOutcome::Unreachable(format!(
                    "request to {} failed: {}",
                    self.endpoint, e
                ));
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::debug!("collector accepted report for {}", identity);
            return DeliveryOutcome::Delivered;
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error response".to_string());

        DeliveryOutcome::Rejected(format!("{} - {}", status, body))
    }
}
