//! HTTP surface of the collector
//!
//! Three routes:
//!
//! - `POST /report`: inbound report `{hostname, ip, timestamp?}`;
//!   `201` on acceptance, `400` on validation failure, `500` on storage
//!   failure. The optional client timestamp is accepted and ignored:
//!   `last_seen` always comes from the store's clock at receipt.
//! - `GET /clients`: JSON snapshot, ordered by `last_seen` descending
//! - `GET /`: the same snapshot rendered as an HTML table
//!
//! Handlers hold no state of their own; all concurrency control lives in
//! the store behind the shared handle.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use beacon_core::Error;
use beacon_core::traits::{ClientRecord, ClientStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to the client store
pub type AppState = Arc<dyn ClientStore>;

/// Inbound report body
///
/// Missing fields deserialize as empty strings so that "field absent"
/// and "field empty" take the same validation path to a 400.
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ip: String,
    /// Reporter's clock at send time; informational only
    #[serde(default)]
    #[allow(dead_code)]
    pub timestamp: Option<String>,
}

/// Outcome body for the report endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReportResponse {
    fn accepted() -> Self {
        Self {
            status: "accepted".to_string(),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

/// Build the collector router
pub fn router(store: AppState) -> Router {
    Router::new()
        .route("/report", post(report))
        .route("/clients", get(clients))
        .route("/", get(index))
        .with_state(store)
}

/// `POST /report`
async fn report(
    State(store): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> (StatusCode, Json<ReportResponse>) {
    match store.report(&request.hostname, &request.ip).await {
        Ok(()) => {
            tracing::info!("received report: {} -> {}", request.hostname, request.ip);
            (StatusCode::CREATED, Json(ReportResponse::accepted()))
        }
        Err(Error::Validation(message)) => {
            tracing::debug!("rejected malformed report: {}", message);
            (StatusCode::BAD_REQUEST, Json(ReportResponse::error(message)))
        }
        Err(e) => {
            tracing::error!("failed to store report for {}: {}", request.hostname, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReportResponse::error(e.to_string())),
            )
        }
    }
}

/// `GET /clients`
async fn clients(
    State(store): State<AppState>,
) -> Result<Json<Vec<ClientRecord>>, (StatusCode, Json<ReportResponse>)> {
    match store.snapshot().await {
        Ok(records) => Ok(Json(records)),
        Err(e) => {
            tracing::error!("failed to read snapshot: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReportResponse::error(e.to_string())),
            ))
        }
    }
}

/// `GET /`, a read-only HTML rendering of the snapshot
async fn index(State(store): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    let records = store.snapshot().await.map_err(|e| {
        tracing::error!("failed to read snapshot for index page: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "error fetching client data".to_string(),
        )
    })?;

    Ok(Html(render_index(&records)))
}

fn render_index(records: &[ClientRecord]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n\
         <html>\n<head>\n<title>beacon - known hosts</title>\n\
         <style>\n\
         body { font-family: sans-serif; margin: 20px; }\n\
         table { border-collapse: collapse; margin-top: 20px; }\n\
         th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
         th { background-color: #f2f2f2; }\n\
         </style>\n</head>\n<body>\n<h1>Known hosts</h1>\n",
    );

    if records.is_empty() {
        page.push_str("<p>No hosts have reported yet.</p>\n");
    } else {
        page.push_str(
            "<table>\n<thead><tr><th>Hostname</th><th>IP Address</th>\
             <th>Last Seen (UTC)</th></tr></thead>\n<tbody>\n",
        );
        for record in records {
            page.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&record.hostname),
                escape_html(&record.ip),
                record.last_seen.format("%Y-%m-%d %H:%M:%S"),
            ));
        }
        page.push_str("</tbody>\n</table>\n");
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// Minimal escaping for values rendered into the HTML table
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::store::MemoryClientStore;

    fn test_state() -> AppState {
        Arc::new(MemoryClientStore::new())
    }

    fn request(hostname: &str, ip: &str) -> ReportRequest {
        ReportRequest {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn valid_report_is_accepted_with_201() {
        let store = test_state();

        let (status, Json(body)) = report(State(store.clone()), Json(request("h1", "1.2.3.4"))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.status, "accepted");

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].ip, "1.2.3.4");
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_with_400() {
        let store = test_state();

        let (status, Json(body)) = report(State(store.clone()), Json(request("", "1.2.3.4"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.status, "error");

        let (status, _) = report(State(store.clone()), Json(request("h1", ""))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(store.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_deserialize_to_rejected_report() {
        // A body without hostname/ip takes the same 400 path
        let parsed: ReportRequest = serde_json::from_str(r#"{"timestamp": "ignored"}"#).unwrap();
        assert!(parsed.hostname.is_empty());
        assert!(parsed.ip.is_empty());
    }

    #[tokio::test]
    async fn clients_returns_snapshot_newest_first() {
        let store = test_state();

        store.report("h1", "1.2.3.4").await.unwrap();
        store.report("h2", "5.6.7.8").await.unwrap();

        let Json(records) = clients(State(store)).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].last_seen >= records[1].last_seen);
    }

    #[tokio::test]
    async fn index_renders_reported_hosts() {
        let store = test_state();
        store.report("web-1", "10.0.0.4").await.unwrap();

        let Html(page) = index(State(store)).await.unwrap();
        assert!(page.contains("web-1"));
        assert!(page.contains("10.0.0.4"));
    }

    #[tokio::test]
    async fn index_handles_empty_store() {
        let Html(page) = index(State(test_state())).await.unwrap();
        assert!(page.contains("No hosts have reported yet"));
    }

    #[test]
    fn html_escaping_neutralizes_markup() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a&b"), "a&amp;b");
    }
}
