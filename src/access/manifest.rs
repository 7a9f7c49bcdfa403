//! Bundle manifest (spec §4.6 step 7 / §6): the provenance record written
//! alongside a cached bundle so a later request against the same
//! `request_hash` can be replayed without ever calling the provider
//! again, and so downstream reports can cite exactly where a number
//! came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bundle::QualitySummary;

/// Lineage facts attached to every bundle, independent of its contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageMeta {
    pub provider: String,
    pub ingestion_ts_utc: DateTime<Utc>,
    pub as_of_utc: Option<DateTime<Utc>>,
    pub dataset_version: Option<String>,
    pub code_version: Option<String>,
}

/// Persisted alongside the cached parquet files at
/// `cache/manifests/<request_hash>.json`. Re-serving a manifest hit skips
/// the provider entirely — the whole point of keying on `request_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub request_json: serde_json::Value,
    pub request_hash: String,
    pub provider: String,
    pub ingestion_ts_utc: DateTime<Utc>,
    pub as_of_utc: Option<DateTime<Utc>>,
    pub dataset_version: Option<String>,
    pub code_version: Option<String>,
    pub storage_paths: Vec<String>,
    pub quality_summary: QualitySummary,
}
