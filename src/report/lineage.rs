//! Cross-subsystem lineage (spec §4.11): the identifiers that let a
//! reader confirm a pricing run, a risk run, and a stress run all priced
//! the *same* portfolio snapshot against the *same* market-data bundle,
//! without re-deriving any of the subsystems' own numbers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLineage {
    pub portfolio_snapshot_hash: String,
    pub market_data_bundle_hash: Option<String>,
    pub pricing_request_hash: Option<String>,
    pub risk_request_hash: Option<String>,
    pub scenario_set_hash: Option<String>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
