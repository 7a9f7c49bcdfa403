//! Local NDJSON fixture adapter (SPEC_FULL.md supplement B): a
//! `ProviderAdapter` that reads pre-recorded newline-delimited JSON from
//! disk instead of calling a network provider. Used for deterministic
//! tests and local development.

use std::path::PathBuf;

use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::error::IngestionError;
use crate::ingestion::provider::{FetchRequest, ProviderAdapter, RawResponse};

/// Reads `{fixture_dir}/{dataset_id}.ndjson` verbatim as the raw payload.
/// Symbol/date filtering is left to the normalizer; the fixture file is
/// expected to already cover the requested range.
pub struct FixtureProviderAdapter {
    fixture_dir: PathBuf,
}

impl FixtureProviderAdapter {
    pub fn new(fixture_dir: impl Into<PathBuf>) -> Self {
        Self {
            fixture_dir: fixture_dir.into(),
        }
    }

    fn path_for(&self, dataset_id: &str) -> PathBuf {
        self.fixture_dir.join(format!("{dataset_id}.ndjson"))
    }
}

impl ProviderAdapter for FixtureProviderAdapter {
    fn provider_id(&self) -> &str {
        "fixture"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, IngestionError> {
        let path = self.path_for(&request.dataset_id);
        let mut file = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(IngestionError::FixtureRead {
                    path: path.display().to_string(),
                    detail: "cancelled before read started".to_string(),
                });
            }
            opened = tokio::fs::File::open(&path) => opened.map_err(|e| IngestionError::FixtureRead {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?,
        };

        let mut payload = Vec::new();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(IngestionError::FixtureRead {
                    path: path.display().to_string(),
                    detail: "cancelled mid-read".to_string(),
                });
            }
            result = file.read_to_end(&mut payload) => {
                result.map_err(|e| IngestionError::FixtureRead {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })?;
            }
        }

        Ok(RawResponse {
            dataset_id: request.dataset_id.clone(),
            payload,
            content_type: "application/x-ndjson".to_string(),
            provider_meta: Default::default(),
        })
    }
}
