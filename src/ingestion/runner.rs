//! `IngestionRunner` (spec §4.4): the full
//! fetch -> stage raw -> normalize -> validate -> publish canonical ->
//! register pipeline for one dataset, over one provider adapter.

use chrono::Utc;

use crate::canonical::record::BarRecord;
use crate::error::{IngestionError, QuantLabError};
use crate::ingestion::normalizer::Normalizer;
use crate::ingestion::provider::{FetchRequest, ProviderAdapter};
use crate::ingestion::validator::{ValidationReport, Validator};
use crate::storage::{CanonicalZone, DatasetRegistry, RawZone, RegistryEntry};

pub struct IngestionOutcome {
    pub records: Vec<BarRecord>,
    pub validation: ValidationReport,
    pub snapshot: crate::storage::PublishedSnapshot,
}

pub struct IngestionRunner<'a> {
    pub provider: &'a dyn ProviderAdapter,
    pub normalizer: Normalizer<'a>,
    pub validator: Validator,
    pub raw_zone: &'a RawZone,
    pub canonical_zone: &'a CanonicalZone,
    pub registry: &'a DatasetRegistry,
    pub dataset_version: &'a str,
    pub schema_version: u32,
    /// Content hash of the seed universe in effect for this run. The
    /// universe itself is loaded by an external collaborator (spec §1);
    /// the runner only threads its hash into the registry entry.
    pub universe_hash: Option<&'a str>,
    pub calendar_version: Option<&'a str>,
    pub sessionrules_version: Option<&'a str>,
}

impl IngestionRunner<'_> {
    /// Runs one dataset through the full pipeline. On cancellation the
    /// staged raw payload (if any) is discarded before returning, so a
    /// cancelled run never leaves a dangling raw-zone entry with no
    /// registry record to justify it.
    #[tracing::instrument(skip(self, request, cancel))]
    pub async fn run(
        &self,
        request: &FetchRequest,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<IngestionOutcome, QuantLabError> {
        let fingerprint = request.request_fingerprint().map_err(QuantLabError::from)?;
        let ingest_run_id = uuid::Uuid::new_v4().to_string();

        let response = self.provider.fetch(request, cancel).await.map_err(QuantLabError::from)?;

        let staged_path = self
            .raw_zone
            .stage(&fingerprint, &ingest_run_id, &response)
            .await
            .map_err(QuantLabError::from)?;

        if cancel.is_cancelled() {
            self.raw_zone.discard(&staged_path).await.map_err(QuantLabError::from)?;
            return Err(IngestionError::ProviderFetch {
                dataset_id: request.dataset_id.clone(),
                detail: "cancelled after staging raw payload".to_string(),
            }
            .into());
        }

        let mut records = self
            .normalizer
            .normalize(&response, &ingest_run_id)
            .map_err(QuantLabError::from)?;
        let validation = self.validator.validate(&mut records).map_err(QuantLabError::from)?;

        let snapshot = self
            .canonical_zone
            .publish(&request.dataset_id, self.dataset_version, &records)
            .await
            .map_err(QuantLabError::from)?;

        let mut source_set: Vec<String> = records
            .iter()
            .map(|r| format!("{}.{}", r.meta.source.provider, r.meta.source.endpoint))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        source_set.sort();

        self.registry
            .register(RegistryEntry {
                dataset_id: request.dataset_id.clone(),
                dataset_version: self.dataset_version.to_string(),
                schema_version: self.schema_version,
                content_hash: snapshot.content_hash.clone(),
                record_count: snapshot.record_count,
                published_at: Utc::now(),
                ingest_run_id: ingest_run_id.clone(),
                universe_hash: self.universe_hash.map(String::from),
                calendar_version: self.calendar_version.map(String::from),
                sessionrules_version: self.sessionrules_version.map(String::from),
                source_set,
            })
            .map_err(QuantLabError::from)?;

        tracing::info!(
            dataset_id = %request.dataset_id,
            dataset_version = %self.dataset_version,
            record_count = records.len(),
            soft_flags = validation.soft_flag_count,
            "ingestion run completed"
        );

        Ok(IngestionOutcome {
            records,
            validation,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::calendar::{SessionRule, SessionRulesTable};
    use crate::canonical::record::Source;
    use crate::ingestion::fixture::FixtureProviderAdapter;
    use chrono::{NaiveDate, NaiveTime};

    fn rules() -> SessionRulesTable {
        SessionRulesTable {
            rules: vec![SessionRule {
                mic: "XNYS".to_string(),
                regular_close_local: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
                timezone: "America/New_York".to_string(),
                valid_from: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                valid_to: None,
            }],
        }
    }

    #[tokio::test]
    async fn full_pipeline_publishes_and_registers_one_snapshot() {
        let fixture_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            fixture_dir.path().join("eod.equity.ndjson"),
            "{\"symbol\":\"AAPL\",\"date\":\"2026-01-06\",\"open\":198.0,\"high\":201.0,\"low\":197.0,\"close\":200.0,\"volume\":1000.0,\"adj_close\":null,\"currency\":\"USD\",\"provider_ts\":null}\n",
        )
        .unwrap();

        let provider = FixtureProviderAdapter::new(fixture_dir.path());
        let session_rules = rules();
        let normalizer = Normalizer {
            mic: "XNYS",
            instrument_prefix: "EQ",
            session_rules: &session_rules,
            baseline_calendar: None,
            dataset_id: "eod.equity",
            schema_version: 1,
            dataset_version: "2026-01-06T00",
            source: Source {
                provider: "fixture".to_string(),
                endpoint: "bars".to_string(),
                provider_dataset: None,
            },
        };

        let storage_dir = tempfile::tempdir().unwrap();
        let raw_zone = RawZone::new(storage_dir.path().join("raw"));
        let canonical_zone = CanonicalZone::new(storage_dir.path().join("canonical"));
        let registry = DatasetRegistry::open(storage_dir.path().join("registry.jsonl")).unwrap();

        let runner = IngestionRunner {
            provider: &provider,
            normalizer,
            validator: Validator::default(),
            raw_zone: &raw_zone,
            canonical_zone: &canonical_zone,
            registry: &registry,
            dataset_version: "2026-01-06T00",
            schema_version: 1,
            universe_hash: None,
            calendar_version: None,
            sessionrules_version: None,
        };

        let request = FetchRequest {
            dataset_id: "eod.equity".to_string(),
            symbols: vec!["AAPL".to_string()],
            start: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            fields: vec!["close".to_string()],
        };
        let cancel = tokio_util::sync::CancellationToken::new();
        let outcome = runner.run(&request, &cancel).await.unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.validation.accepted, 1);
        assert!(outcome.snapshot.path.exists());
        assert!(!outcome.records[0].meta.ingest_run_id.is_empty());

        let entry = registry.get("eod.equity", "2026-01-06T00").unwrap();
        assert_eq!(entry.content_hash, outcome.snapshot.content_hash);
    }

    #[tokio::test]
    async fn cancelling_before_fetch_discards_no_registry_entry() {
        let fixture_dir = tempfile::tempdir().unwrap();
        let provider = FixtureProviderAdapter::new(fixture_dir.path());
        let session_rules = rules();
        let normalizer = Normalizer {
            mic: "XNYS",
            instrument_prefix: "EQ",
            session_rules: &session_rules,
            baseline_calendar: None,
            dataset_id: "eod.equity",
            schema_version: 1,
            dataset_version: "2026-01-06T00",
            source: Source {
                provider: "fixture".to_string(),
                endpoint: "bars".to_string(),
                provider_dataset: None,
            },
        };

        let storage_dir = tempfile::tempdir().unwrap();
        let raw_zone = RawZone::new(storage_dir.path().join("raw"));
        let canonical_zone = CanonicalZone::new(storage_dir.path().join("canonical"));
        let registry = DatasetRegistry::open(storage_dir.path().join("registry.jsonl")).unwrap();

        let runner = IngestionRunner {
            provider: &provider,
            normalizer,
            validator: Validator::default(),
            raw_zone: &raw_zone,
            canonical_zone: &canonical_zone,
            registry: &registry,
            dataset_version: "2026-01-06T00",
            schema_version: 1,
            universe_hash: None,
            calendar_version: None,
            sessionrules_version: None,
        };

        let request = FetchRequest {
            dataset_id: "eod.equity".to_string(),
            symbols: vec!["AAPL".to_string()],
            start: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            fields: vec!["close".to_string()],
        };
        let cancel = tokio_util::sync::CancellationToken::new();
        cancel.cancel();
        let result = runner.run(&request, &cancel).await;
        assert!(result.is_err());
        assert!(registry.get("eod.equity", "2026-01-06T00").is_err());
    }
}
