// # Memory Client Store
//
// In-memory implementation of ClientStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing, containerized deployments with restarts, or
// scenarios where hosts re-report within one interval anyway.
//
// ## Crash Behavior
//
// - All records are lost on restart/crash
// - Hosts repopulate the store on their next reporting cycle
//
// ## When to Use
//
// - Testing environments
// - Deployments where an empty table after restart is acceptable

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::Error;
use crate::clock::{Clock, SystemClock};
use crate::traits::client_store::{ClientRecord, ClientStore, validate_report};

/// In-memory client store implementation
///
/// All records live in a HashMap protected by a RwLock: the per-hostname
/// upsert is atomic under the write lock, and snapshots read whole
/// records under the read lock.
///
/// # Example
///
/// ```rust,no_run
/// use beacon_core::store::MemoryClientStore;
/// use beacon_core::traits::ClientStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryClientStore::new();
///
///     store.report("web-1", "10.0.0.4").await?;
///
///     let snapshot = store.snapshot().await?;
///     assert_eq!(snapshot[0].ip, "10.0.0.4");
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MemoryClientStore {
    inner: Arc<RwLock<HashMap<String, ClientRecord>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryClientStore {
    /// Create a new empty store stamping records with the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new empty store with an injected clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MemoryClientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn report(&self, hostname: &str, ip: &str) -> Result<(), Error> {
        validate_report(hostname, ip)?;

        let record = ClientRecord {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            last_seen: self.clock.now(),
        };

        let mut guard = self.inner.write().await;
        guard.insert(hostname.to_string(), record);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<ClientRecord>, Error> {
        let guard = self.inner.read().await;
        let mut records: Vec<ClientRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(records)
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}
