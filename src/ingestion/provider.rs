//! Provider boundary (spec §4.4): `ProviderAdapter` is the one trait
//! every external market-data source implements. Everything downstream
//! of `fetch` — normalization, validation, staging — is provider-agnostic.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::IngestionError;

/// What is being asked for, independent of how the provider fetches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub dataset_id: String,
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub fields: Vec<String>,
}

impl FetchRequest {
    /// Deterministic identity for this request, used as the raw-zone
    /// lookup key (spec §4.5 "keyed by ... request_fingerprint").
    pub fn request_fingerprint(&self) -> Result<String, crate::error::HashError> {
        crate::canonical::content_hash(self)
    }
}

/// The provider's unparsed reply: bytes plus whatever the provider
/// itself considers metadata. `normalizer.rs` is the only consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub dataset_id: String,
    pub payload: Vec<u8>,
    pub content_type: String,
    pub provider_meta: BTreeMap<String, String>,
}

/// A market-data source. Implementations own their own transport,
/// auth, and retry policy; `fetch` must be cancellation-safe — on
/// cancellation, any staged raw payload must be discarded before a
/// registry entry is written (spec §7 "Cancellation & timeouts").
pub trait ProviderAdapter: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<RawResponse, IngestionError>;
}
