// # File Client Store
//
// File-based implementation of ClientStore with crash recovery.
//
// ## Purpose
//
// Provides persistent storage across collector restarts: the fleet's
// latest known addresses survive a redeploy without waiting for every
// host's next reporting cycle.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename, so the file on disk is always a
//   complete snapshot
// - Corruption detection: JSON is validated on load
// - Automatic backup: keeps a .backup of the last known good state
// - Recovery: falls back to the backup if corruption is detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "web-1": {
//       "hostname": "web-1",
//       "ip": "10.0.0.4",
//       "last_seen": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::clock::{Clock, SystemClock};
use crate::traits::client_store::{ClientRecord, ClientStore, validate_report};

/// Store file format version, for future migration if the format changes
const STORE_FILE_VERSION: &str = "1.0";

/// File-based client store with crash recovery
///
/// Every accepted report is written through to disk before the call
/// returns, so a storage failure is surfaced to the reporting host (which
/// will retry) instead of being discovered after a crash.
///
/// # Atomicity
///
/// The write lock is held across both the in-memory upsert and the file
/// write; if persisting fails, the in-memory entry is rolled back to its
/// previous value, so a failed report never leaves a record behind.
pub struct FileClientStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
    clock: Arc<dyn Clock>,
}

/// Internal state for the file-based store
struct FileState {
    records: HashMap<String, ClientRecord>,
    dirty: bool,
}

/// Serializable store file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    records: HashMap<String, ClientRecord>,
}

impl FileClientStore {
    /// Create or load a file client store stamping records with the
    /// system clock
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::with_clock(path, Arc::new(SystemClock)).await
    }

    /// Create or load a file client store with an injected clock
    ///
    /// This will:
    /// 1. Try to load an existing store file
    /// 2. If corruption is detected, try to load from the backup
    /// 3. If both fail, start with empty state
    /// 4. Create parent directories if needed
    pub async fn with_clock<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let records = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                records,
                dirty: false,
            })),
            clock,
        })
    }

    /// Load records from file, recovering from corruption via the backup
    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, ClientRecord>, Error> {
        match Self::load(path).await {
            Ok(records) => {
                tracing::debug!("loaded {} client records from {}", records.len(), path.display());
                Ok(records)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "store file {} appears corrupted: {}; attempting recovery from backup",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("no backup file found, starting with empty state");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(records) => {
                        tracing::info!("recovered {} client records from backup", records.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "failed to restore store file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(records)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "backup also unreadable: {}; starting with empty state",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load records from a single file
    async fn load(path: &Path) -> Result<HashMap<String, ClientRecord>, Error> {
        if !path.exists() {
            tracing::debug!("store file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::storage(format!("failed to read store file {}: {}", path.display(), e))
        })?;

        let store_file: StoreFileFormat = serde_json::from_str(&content)?;

        if store_file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "store file version mismatch: expected {}, got {}; loading anyway",
                STORE_FILE_VERSION,
                store_file.version
            );
        }

        Ok(store_file.records)
    }

    /// Write the given records to disk atomically
    ///
    /// Writes to a temporary file, backs up the current file, then
    /// renames the temporary file into place.
    async fn persist(path: &Path, records: &HashMap<String, ClientRecord>) -> Result<(), Error> {
        let store_file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            records: records.clone(),
        };

        let json = serde_json::to_string_pretty(&store_file)?;

        let temp_path = Self::temp_path(path);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::storage(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::storage(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if path.exists() {
            let backup_path = Self::backup_path(path);
            if let Err(e) = fs::copy(path, &backup_path).await {
                tracing::warn!("failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::storage(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("client records written to {}", path.display());
        Ok(())
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.to_path_buf();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl ClientStore for FileClientStore {
    async fn report(&self, hostname: &str, ip: &str) -> Result<(), Error> {
        validate_report(hostname, ip)?;

        let record = ClientRecord {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            last_seen: self.clock.now(),
        };

        let mut guard = self.state.write().await;
        let previous = guard.records.insert(hostname.to_string(), record);
        guard.dirty = true;

        if let Err(e) = Self::persist(&self.path, &guard.records).await {
            // Roll the upsert back so a failed persist leaves no record
            // that was never on disk; memory then matches the last
            // persisted state again.
            match previous {
                Some(prev) => {
                    guard.records.insert(hostname.to_string(), prev);
                }
                None => {
                    guard.records.remove(hostname);
                }
            }
            guard.dirty = false;
            return Err(e);
        }

        guard.dirty = false;
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<ClientRecord>, Error> {
        let guard = self.state.read().await;
        let mut records: Vec<ClientRecord> = guard.records.values().cloned().collect();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(records)
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut guard = self.state.write().await;
        if guard.dirty {
            Self::persist(&self.path, &guard.records).await?;
            guard.dirty = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clients.json");

        let store = FileClientStore::new(&path).await.unwrap();

        assert!(store.snapshot().await.unwrap().is_empty());

        store.report("web-1", "10.0.0.4").await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].ip, "10.0.0.4");

        // Verify the file was written
        assert!(path.exists());

        // Load a new instance and verify persistence
        let store2 = FileClientStore::new(&path).await.unwrap();
        let snapshot2 = store2.snapshot().await.unwrap();
        assert_eq!(snapshot2.len(), 1);
        assert_eq!(snapshot2[0].hostname, "web-1");
        assert_eq!(snapshot2[0].ip, "10.0.0.4");
    }

    #[tokio::test]
    async fn test_file_store_upsert_overwrites_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clients.json");

        let store = FileClientStore::new(&path).await.unwrap();
        store.report("web-1", "10.0.0.4").await.unwrap();
        store.report("web-1", "10.0.0.5").await.unwrap();

        let store2 = FileClientStore::new(&path).await.unwrap();
        let snapshot = store2.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].ip, "10.0.0.5");
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clients.json");

        let store = FileClientStore::new(&path).await.unwrap();
        store.report("web-1", "10.0.0.4").await.unwrap();

        // Write again so the backup holds the first state
        store.report("web-1", "10.0.0.5").await.unwrap();

        let backup_path = FileClientStore::backup_path(&path);
        assert!(backup_path.exists(), "backup file should exist after write");

        // Corrupt the store file
        fs::write(&path, b"corrupted json data").await.unwrap();

        // Load should recover from the backup
        let store2 = FileClientStore::new(&path).await.unwrap();
        let snapshot = store2.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        // The backup holds the state before the last write
        assert_eq!(snapshot[0].ip, "10.0.0.4");
    }

    #[tokio::test]
    async fn test_file_store_rejects_empty_fields_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clients.json");

        let store = FileClientStore::new(&path).await.unwrap();
        assert!(matches!(
            store.report("", "10.0.0.4").await,
            Err(Error::Validation(_))
        ));

        assert!(store.snapshot().await.unwrap().is_empty());
        assert!(!path.exists());
    }
}
