//! Raw zone (spec §4.5): the untransformed provider payload, staged
//! before normalization. Keyed by `(dataset_id, request_fingerprint,
//! ingest_run_id)` so two runs for the same request never collide and a
//! cancelled run leaves nothing behind once `discard` runs.

use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::ingestion::provider::RawResponse;

/// Local-filesystem raw zone. Cloud-backed zones would swap the writer
/// the way `StorageLocation::Cloud` does for canonical snapshots; the MVP
/// raw zone only needs a local staging area.
pub struct RawZone {
    root: PathBuf,
}

impl RawZone {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, dataset_id: &str, request_fingerprint: &str, ingest_run_id: &str) -> PathBuf {
        self.root
            .join(dataset_id)
            .join(request_fingerprint)
            .join(format!("{ingest_run_id}.raw"))
    }

    /// Writes `response.payload` verbatim. Not atomic — a crash mid-write
    /// leaves a partial file, which is fine: raw-zone entries are never
    /// read until the registry confirms a matching canonical publish.
    #[tracing::instrument(skip(self, response))]
    pub async fn stage(
        &self,
        request_fingerprint: &str,
        ingest_run_id: &str,
        response: &RawResponse,
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_for(&response.dataset_id, request_fingerprint, ingest_run_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::RawWrite {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        }
        std::fs::write(&path, &response.payload).map_err(|e| StorageError::RawWrite {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "staged raw payload");
        Ok(path)
    }

    /// Removes a staged payload, e.g. after a fetch is cancelled before
    /// normalization completes.
    pub async fn discard(&self, path: &Path) -> Result<(), StorageError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RawWrite {
                path: path.display().to_string(),
                detail: e.to_string(),
            }),
        }
    }
}
