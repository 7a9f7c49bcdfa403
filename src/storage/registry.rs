//! Dataset registry (spec §4.5): the append-only log of what has been
//! published where, keyed by `(dataset_id, dataset_version)`. Registering
//! the same key twice with a different content hash is a conflict, not a
//! silent overwrite — `CanonicalZone::publish` already refuses to
//! overwrite a snapshot with different content, and this is the registry
//! side of that same write-once guarantee.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub dataset_id: String,
    pub dataset_version: String,
    pub schema_version: u32,
    pub content_hash: String,
    pub record_count: usize,
    pub published_at: DateTime<Utc>,
    /// Ingestion run that produced this snapshot (spec §3 "registry
    /// entries"). Groups this publish with its raw-zone payloads.
    pub ingest_run_id: String,
    /// Content hash of the seed universe in effect for this run, supplied
    /// by the caller (the universe itself is an external-collaborator
    /// input, spec §1).
    pub universe_hash: Option<String>,
    pub calendar_version: Option<String>,
    pub sessionrules_version: Option<String>,
    /// Distinct `(provider, endpoint)` pairs that contributed records to
    /// this snapshot, sorted for deterministic serialization.
    pub source_set: Vec<String>,
}

/// Append-only registry backed by a single JSONL log file, one entry per
/// line, plus an in-memory index rebuilt from that log at construction.
pub struct DatasetRegistry {
    log_path: PathBuf,
    entries: Mutex<Vec<RegistryEntry>>,
}

impl DatasetRegistry {
    pub fn open(log_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let log_path = log_path.into();
        let entries = if log_path.exists() {
            let text = std::fs::read_to_string(&log_path).map_err(|e| StorageError::Io(e.to_string()))?;
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| serde_json::from_str(l).map_err(|e| StorageError::Io(e.to_string())))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        Ok(Self {
            log_path,
            entries: Mutex::new(entries),
        })
    }

    fn find(&self, dataset_id: &str, dataset_version: &str) -> Option<RegistryEntry> {
        self.entries
            .lock()
            .expect("registry lock poisoned")
            .iter()
            .find(|e| e.dataset_id == dataset_id && e.dataset_version == dataset_version)
            .cloned()
    }

    /// Registers a new publish. If `(dataset_id, dataset_version)` is
    /// already registered with a *different* content hash, this is a
    /// conflict: two publishes of the same version must be identical.
    #[tracing::instrument(skip(self))]
    pub fn register(&self, entry: RegistryEntry) -> Result<(), StorageError> {
        if let Some(existing) = self.find(&entry.dataset_id, &entry.dataset_version) {
            if existing.content_hash != entry.content_hash {
                return Err(StorageError::RegistryConflict {
                    dataset_id: entry.dataset_id,
                    dataset_version: entry.dataset_version,
                });
            }
            return Ok(());
        }

        let line = serde_json::to_string(&entry).map_err(|e| StorageError::Io(e.to_string()))?;
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| StorageError::Io(e.to_string()))?;

        self.entries.lock().expect("registry lock poisoned").push(entry);
        Ok(())
    }

    pub fn get(&self, dataset_id: &str, dataset_version: &str) -> Result<RegistryEntry, StorageError> {
        self.find(dataset_id, dataset_version)
            .ok_or_else(|| StorageError::RegistryEntryNotFound {
                dataset_id: dataset_id.to_string(),
                dataset_version: dataset_version.to_string(),
            })
    }

    /// Recomputes the content hash of `published` and compares it to the
    /// registered value, catching a canonical-zone file mutated after
    /// publish.
    pub fn verify_entry<T: Serialize>(
        &self,
        dataset_id: &str,
        dataset_version: &str,
        published: &[T],
    ) -> Result<(), StorageError> {
        let entry = self.get(dataset_id, dataset_version)?;
        let actual = crate::canonical::content_hash(published).map_err(|e| StorageError::Io(e.to_string()))?;
        if actual != entry.content_hash {
            return Err(StorageError::IntegrityMismatch {
                dataset_id: dataset_id.to_string(),
                dataset_version: dataset_version.to_string(),
                expected: entry.content_hash,
                actual,
            });
        }
        Ok(())
    }
}
