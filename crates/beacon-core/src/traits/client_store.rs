// # Client Store Trait
//
// Defines the interface for the collector's per-host record storage.
//
// ## Purpose
//
// The store keeps the latest known address per hostname:
// - one record per hostname, overwritten in place on every report
// - `last_seen` stamped from the store's own clock at receipt time
// - no history, no deletion
//
// Repeated identical reports are safe: the upsert is idempotent and
// last-write-wins.
//
// ## Implementations
//
// - In-memory: tests and ephemeral deployments
// - File-based: durable JSON with atomic writes and crash recovery
//
// ## Usage
//
// ```rust,ignore
// use beacon_core::ClientStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* ClientStore implementation */;
//
//     store.report("db-host-3", "10.0.0.7").await?;
//
//     for record in store.snapshot().await? {
//         println!("{} {} {}", record.hostname, record.ip, record.last_seen);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Latest known state for one reporting host
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClientRecord {
    /// The reporting host's hostname (unique key)
    pub hostname: String,
    /// The last reported IP address
    pub ip: String,
    /// When the collector last received a report for this hostname
    pub last_seen: chrono::DateTime<chrono::Utc>,
}

/// Validate an inbound report's fields
///
/// Missing or empty hostname/ip is a caller error, rejected before any
/// storage work happens.
pub fn validate_report(hostname: &str, ip: &str) -> Result<(), crate::Error> {
    if hostname.is_empty() {
        return Err(crate::Error::validation("hostname must not be empty"));
    }
    if ip.is_empty() {
        return Err(crate::Error::validation("ip must not be empty"));
    }
    Ok(())
}

/// Trait for client store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks: the
/// collector serves one request per reporting host in parallel. The upsert
/// for a given hostname must be atomic with respect to concurrent upserts
/// for the same hostname (last write by arrival order wins); upserts for
/// different hostnames are independent. `snapshot` may run concurrently
/// with reports and must never observe a half-written record.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Record a report for `hostname`, overwriting any existing record
    ///
    /// `last_seen` is assigned from the store's clock at receipt time;
    /// client-supplied timestamps are informational only and never stored.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: report accepted and persisted
    /// - `Err(Error::Validation)`: hostname or ip missing/empty
    /// - `Err(Error::Storage)`: persistence failed; no partial record is
    ///   left behind and the report is not considered delivered
    async fn report(&self, hostname: &str, ip: &str) -> Result<(), crate::Error>;

    /// Current set of known hosts, ordered by `last_seen` descending
    ///
    /// Read-only; no side effects.
    async fn snapshot(&self) -> Result<Vec<ClientRecord>, crate::Error>;

    /// Persist any pending changes
    ///
    /// Write-through implementations treat this as a no-op; it exists so
    /// the collector can force durability on shutdown.
    async fn flush(&self) -> Result<(), crate::Error>;
}
