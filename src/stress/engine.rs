//! `StressEngine::run` (spec §4.10): linear revaluation of a portfolio
//! across a scenario set, with position/asset/currency breakdowns and
//! summary metrics that are explicitly not probabilistic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::ids::MarketDataId;
use crate::canonical::{content_hash, HashError};
use crate::error::StressError;
use crate::stress::scenario::{Scenario, ScenarioSet};
use crate::stress::shock::apply_shock;

const RECONCILIATION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingShockPolicy {
    ZeroWithWarning,
    Error,
}

/// One position's current market state as of the stress `as_of`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMarketState {
    pub instrument_id: String,
    /// `None` for cash: cash P&L is always zero in its own currency.
    pub asset: Option<MarketDataId>,
    pub quantity: f64,
    /// `1.0` for everything except futures, which carry their contract
    /// multiplier.
    pub multiplier: f64,
    /// `None` when the current market state has no price for an asset
    /// held in the portfolio — always a hard error (spec §4.10), distinct
    /// from a missing *shock* for an otherwise-priced asset.
    pub base_price: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StressInput {
    pub positions: Vec<PositionMarketState>,
    pub nav: f64,
    pub missing_shock_policy: MissingShockPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub total_pnl: f64,
    pub by_position: BTreeMap<String, f64>,
    pub by_asset: BTreeMap<String, f64>,
    pub by_currency: BTreeMap<String, f64>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSummary {
    pub max_loss: f64,
    pub max_loss_return: f64,
    pub top_k_losses: Vec<(String, f64)>,
    pub top_drivers: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub report_version: u32,
    pub scenario_set_hash: String,
    pub results: Vec<ScenarioResult>,
    pub summary: StressSummary,
    pub disclaimer: &'static str,
}

const REPORT_VERSION: u32 = 1;
const TOP_K: usize = 5;
const DISCLAIMER: &str = "scenario-set metrics are not probabilities and are not VaR";

pub struct StressEngine;

impl StressEngine {
    #[tracing::instrument(skip(scenario_set, input))]
    pub fn run(scenario_set: &ScenarioSet, input: &StressInput) -> Result<StressReport, StressError> {
        let mut results = Vec::with_capacity(scenario_set.scenarios().len());
        for scenario in scenario_set.scenarios() {
            results.push(run_scenario(scenario, input)?);
        }

        let max_loss = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.total_pnl).fold(f64::INFINITY, f64::min)
        };
        let max_loss_return = if input.nav != 0.0 { max_loss / input.nav } else { 0.0 };

        let mut by_loss = results.clone();
        by_loss.sort_by(|a, b| a.total_pnl.partial_cmp(&b.total_pnl).unwrap());
        let top_k_losses = by_loss
            .iter()
            .take(TOP_K)
            .map(|r| (r.scenario_id.clone(), r.total_pnl))
            .collect();

        let mut driver_totals: BTreeMap<String, f64> = BTreeMap::new();
        for result in &results {
            for (asset, pnl) in &result.by_asset {
                *driver_totals.entry(asset.clone()).or_insert(0.0) += pnl.abs();
            }
        }
        let mut top_drivers: Vec<(String, f64)> = driver_totals.into_iter().collect();
        top_drivers.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        top_drivers.truncate(TOP_K);

        let scenario_set_hash = content_hash(scenario_set).map_err(hash_to_stress_error)?;

        Ok(StressReport {
            report_version: REPORT_VERSION,
            scenario_set_hash,
            results,
            summary: StressSummary {
                max_loss,
                max_loss_return,
                top_k_losses,
                top_drivers,
            },
            disclaimer: DISCLAIMER,
        })
    }
}

fn run_scenario(scenario: &Scenario, input: &StressInput) -> Result<ScenarioResult, StressError> {
    let mut by_position = BTreeMap::new();
    let mut by_asset: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_currency: BTreeMap<String, f64> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut total_pnl = 0.0;

    for position in &input.positions {
        let Some(asset) = &position.asset else {
            by_position.insert(position.instrument_id.clone(), 0.0);
            continue;
        };
        let base_price = position.base_price.ok_or_else(|| {
            StressError::MissingMarketState(position.instrument_id.clone())
        })?;
        let key = asset.as_canonical_key();
        let shock = match scenario.shock_vector.get(&key) {
            Some(s) => *s,
            None => match input.missing_shock_policy {
                MissingShockPolicy::Error => {
                    return Err(StressError::InvalidScenario {
                        scenario_id: scenario.scenario_id.clone(),
                        detail: format!("missing shock for asset '{key}'"),
                    });
                }
                MissingShockPolicy::ZeroWithWarning => {
                    warnings.push(format!(
                        "missing shock for '{key}' in scenario '{}', treated as zero",
                        scenario.scenario_id
                    ));
                    0.0
                }
            },
        };

        let shocked = apply_shock(&key, base_price, shock, scenario.convention)?;
        let pnl = position.quantity * position.multiplier * (shocked - base_price);

        by_position.insert(position.instrument_id.clone(), pnl);
        *by_asset.entry(key).or_insert(0.0) += pnl;
        *by_currency.entry(position.currency.clone()).or_insert(0.0) += pnl;
        total_pnl += pnl;
    }

    let reconciled_sum: f64 = by_position.values().sum();
    if (reconciled_sum - total_pnl).abs() > RECONCILIATION_TOLERANCE {
        warnings.push(format!(
            "position P&L sum {reconciled_sum} does not reconcile with total {total_pnl}"
        ));
    }

    Ok(ScenarioResult {
        scenario_id: scenario.scenario_id.clone(),
        total_pnl,
        by_position,
        by_asset,
        by_currency,
        warnings,
    })
}

fn hash_to_stress_error(_e: HashError) -> StressError {
    StressError::InvalidScenario {
        scenario_id: "scenario_set".to_string(),
        detail: "failed to hash scenario set for lineage".to_string(),
    }
}
