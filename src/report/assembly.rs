//! Assembles whichever of the pricing/risk/stress outputs a caller ran
//! into one canonical-JSON artifact (spec §4.11), and persists it with
//! the same stage-then-rename discipline as the canonical zone so a
//! reader never observes a half-written report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_json;
use crate::error::ReportError;
use crate::pricing::PortfolioValuation;
use crate::risk::RiskReport;
use crate::stress::StressReport;

use super::lineage::ReportLineage;

/// A report is valid with any non-empty subset of its three sections —
/// a caller who only ran pricing, or only risk, still gets one coherent
/// artifact rather than three disconnected files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub report_version: u32,
    pub lineage: ReportLineage,
    pub pricing: Option<PortfolioValuation>,
    pub risk: Option<RiskReport>,
    pub stress: Option<StressReport>,
}

const REPORT_VERSION: u32 = 1;

impl AnalyticsReport {
    pub fn new(
        lineage: ReportLineage,
        pricing: Option<PortfolioValuation>,
        risk: Option<RiskReport>,
        stress: Option<StressReport>,
    ) -> Result<Self, ReportError> {
        if pricing.is_none() && risk.is_none() && stress.is_none() {
            return Err(ReportError::EmptyReport);
        }
        Ok(Self {
            report_version: REPORT_VERSION,
            lineage,
            pricing,
            risk,
            stress,
        })
    }

    /// Deterministic canonical-JSON rendering: sorted keys, compact
    /// separators, same rules every other content hash in this crate
    /// goes through.
    pub fn to_canonical_json(&self) -> Result<String, ReportError> {
        canonical_json(self).map_err(|e| ReportError::Io {
            path: "<memory>".to_string(),
            detail: e.to_string(),
        })
    }

    /// Writes the canonical JSON to `path` via a `.tmp` file plus
    /// rename, so a concurrent reader never sees a partial report.
    #[tracing::instrument(skip(self))]
    pub fn write_atomic(&self, path: &Path) -> Result<PathBuf, ReportError> {
        let body = self.to_canonical_json()?;
        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ReportError::Io {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        }
        std::fs::write(&tmp_path, &body).map_err(|e| ReportError::Io {
            path: tmp_path.display().to_string(),
            detail: e.to_string(),
        })?;
        std::fs::rename(&tmp_path, path).map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), "wrote analytics report");
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::collections::BTreeMap;

    fn lineage() -> ReportLineage {
        ReportLineage {
            portfolio_snapshot_hash: "abc".to_string(),
            market_data_bundle_hash: Some("def".to_string()),
            pricing_request_hash: None,
            risk_request_hash: None,
            scenario_set_hash: None,
            generated_at: Utc::now(),
        }
    }

    fn pricing() -> PortfolioValuation {
        PortfolioValuation {
            as_of: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            base_currency: "USD".to_string(),
            nav_base: 1_000.0,
            breakdown_by_currency: BTreeMap::new(),
            positions: vec![],
        }
    }

    #[test]
    fn new_rejects_an_entirely_empty_report() {
        assert!(matches!(
            AnalyticsReport::new(lineage(), None, None, None),
            Err(ReportError::EmptyReport)
        ));
    }

    #[test]
    fn new_accepts_pricing_only() {
        assert!(AnalyticsReport::new(lineage(), Some(pricing()), None, None).is_ok());
    }

    #[test]
    fn canonical_json_is_stable_across_equal_reports() {
        let a = AnalyticsReport::new(lineage(), Some(pricing()), None, None).unwrap();
        let mut b = a.clone();
        b.lineage.generated_at = a.lineage.generated_at;
        assert_eq!(a.to_canonical_json().unwrap(), b.to_canonical_json().unwrap());
    }

    #[test]
    fn write_atomic_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let report = AnalyticsReport::new(lineage(), Some(pricing()), None, None).unwrap();
        let path = dir.path().join("report.json");
        let written = report.write_atomic(&path).unwrap();
        assert!(written.exists());
        assert!(!written.with_extension("json.tmp").exists());
    }
}
