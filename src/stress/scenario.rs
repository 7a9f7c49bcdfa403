//! Scenario model (spec §4.10): a tagged shock vector plus the
//! convention it should be applied under.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::{content_hash, HashError};
use crate::error::StressError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShockConvention {
    /// `P' = P * (1 + shock)`.
    MultReturn,
    /// `P' = P * shock` (shock is itself a multiplicative factor).
    MultFactor,
}

/// Tagged scenario variants. `HistoricalShock` carries a pre-materialized
/// vector; this module never fetches historical data itself (spec §4.10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioKind {
    ParametricShock,
    CustomShockVector,
    HistoricalShock { period_tag: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub scenario_id: String,
    pub name: String,
    pub kind: ScenarioKind,
    /// `MarketDataId` canonical key -> shock value.
    pub shock_vector: BTreeMap<String, f64>,
    pub convention: ShockConvention,
    pub tags: Vec<String>,
}

impl Scenario {
    pub fn validate(&self) -> Result<(), StressError> {
        if self.scenario_id.trim().is_empty() {
            return Err(StressError::InvalidScenario {
                scenario_id: self.scenario_id.clone(),
                detail: "scenario_id must not be empty".to_string(),
            });
        }
        for (asset, shock) in &self.shock_vector {
            if !shock.is_finite() {
                return Err(StressError::InvalidScenario {
                    scenario_id: self.scenario_id.clone(),
                    detail: format!("shock for '{asset}' is not finite"),
                });
            }
        }
        Ok(())
    }
}

/// A collection of scenarios, canonically ordered by `scenario_id`
/// regardless of insertion order (spec §4.10 "ScenarioSet hash").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, StressError> {
        let mut seen = std::collections::BTreeSet::new();
        for s in &scenarios {
            s.validate()?;
            if !seen.insert(s.scenario_id.clone()) {
                return Err(StressError::DuplicateScenarioId(s.scenario_id.clone()));
            }
        }
        let mut sorted = scenarios;
        sorted.sort_by(|a, b| a.scenario_id.cmp(&b.scenario_id));
        Ok(Self { scenarios: sorted })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn set_hash(&self) -> Result<String, HashError> {
        content_hash(&self.scenarios)
    }
}
