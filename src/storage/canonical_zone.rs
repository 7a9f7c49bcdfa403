//! Canonical zone (spec §4.5): the published, versioned snapshot of
//! canonical records for a `(dataset_id, dataset_version)` pair. Publish
//! is stage-then-rename so a reader never observes a partially written
//! snapshot — grounded in the teacher's `StorageLocation` local-write
//! path, generalized from a single streamed writer to an atomic publish.

use std::path::PathBuf;

use serde::Serialize;

use crate::canonical::content_hash;
use crate::error::StorageError;

pub struct CanonicalZone {
    root: PathBuf,
}

pub struct PublishedSnapshot {
    pub path: PathBuf,
    pub content_hash: String,
    pub record_count: usize,
}

impl CanonicalZone {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn final_path(&self, dataset_id: &str, dataset_version: &str) -> PathBuf {
        self.root.join(dataset_id).join(format!("{dataset_version}.jsonl"))
    }

    fn hash_sidecar_path(&self, dataset_id: &str, dataset_version: &str) -> PathBuf {
        self.final_path(dataset_id, dataset_version).with_extension("jsonl.hash")
    }

    /// Serializes `records` as newline-delimited canonical JSON to a
    /// `.tmp` file in the same directory, then renames it into place.
    /// `std::fs::rename` is atomic within one filesystem, so a reader
    /// polling `final_path` never sees a half-written snapshot.
    ///
    /// A snapshot that already exists at `(dataset_id, dataset_version)`
    /// is never overwritten in place: a republish with identical content
    /// is a no-op (idempotent retry), and a republish with different
    /// content is a hard error — snapshots are write-once once published
    /// (spec §4.5, §3 "Lifecycle").
    #[tracing::instrument(skip(self, records))]
    pub async fn publish<T: Serialize>(
        &self,
        dataset_id: &str,
        dataset_version: &str,
        records: &[T],
    ) -> Result<PublishedSnapshot, StorageError> {
        let final_path = self.final_path(dataset_id, dataset_version);
        let hash_path = self.hash_sidecar_path(dataset_id, dataset_version);
        let tmp_path = final_path.with_extension("jsonl.tmp");

        let to_storage_err = |e: crate::error::HashError| StorageError::CanonicalPublish {
            dataset_id: dataset_id.to_string(),
            dataset_version: dataset_version.to_string(),
            detail: e.to_string(),
        };
        let hash = content_hash(&records).map_err(to_storage_err)?;

        if let Ok(existing_hash) = std::fs::read_to_string(&hash_path) {
            if existing_hash.trim() == hash {
                return Ok(PublishedSnapshot {
                    path: final_path,
                    content_hash: hash,
                    record_count: records.len(),
                });
            }
            return Err(StorageError::SnapshotOverwrite {
                dataset_id: dataset_id.to_string(),
                dataset_version: dataset_version.to_string(),
            });
        }
        if final_path.exists() {
            // Snapshot predates the hash sidecar; treat any existing file
            // without a sidecar as foreign content rather than guess.
            return Err(StorageError::SnapshotOverwrite {
                dataset_id: dataset_id.to_string(),
                dataset_version: dataset_version.to_string(),
            });
        }

        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::CanonicalPublish {
                dataset_id: dataset_id.to_string(),
                dataset_version: dataset_version.to_string(),
                detail: e.to_string(),
            })?;
        }

        let mut body = String::new();
        for record in records {
            let line = crate::canonical::canonical_json(record).map_err(to_storage_err)?;
            body.push_str(&line);
            body.push('\n');
        }

        std::fs::write(&tmp_path, &body).map_err(|e| StorageError::CanonicalPublish {
            dataset_id: dataset_id.to_string(),
            dataset_version: dataset_version.to_string(),
            detail: e.to_string(),
        })?;
        std::fs::rename(&tmp_path, &final_path).map_err(|e| StorageError::CanonicalPublish {
            dataset_id: dataset_id.to_string(),
            dataset_version: dataset_version.to_string(),
            detail: e.to_string(),
        })?;
        std::fs::write(&hash_path, &hash).map_err(|e| StorageError::CanonicalPublish {
            dataset_id: dataset_id.to_string(),
            dataset_version: dataset_version.to_string(),
            detail: e.to_string(),
        })?;

        tracing::info!(
            path = %final_path.display(),
            record_count = records.len(),
            "published canonical snapshot"
        );

        Ok(PublishedSnapshot {
            path: final_path,
            content_hash: hash,
            record_count: records.len(),
        })
    }

    pub fn read_path(&self, dataset_id: &str, dataset_version: &str) -> PathBuf {
        self.final_path(dataset_id, dataset_version)
    }
}
