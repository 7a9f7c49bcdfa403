//! Risk request shape (spec §4.9): everything a `RiskEngine::run` call
//! needs besides the portfolio snapshot and market-data bundle themselves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `r_t = P_t/P_{t-1} - 1` vs `ln(P_t/P_{t-1})`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnDefinition {
    Simple,
    Log,
}

/// How a return series is built when a daily observation is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingDataPolicy {
    Error,
    Drop,
    /// Forward-fill the last observed price; always emits a warning.
    Ffill,
    /// Keep the series but mark a gap; always emits a warning.
    Partial,
}

/// Whether portfolio returns are taken directly, or built from static
/// per-asset weights applied to asset return series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputMode {
    PortfolioReturns,
    StaticWeightsXAssetReturns,
}

/// Lookback window for the analysis: either a day count ending at `as_of`,
/// or an explicit `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskWindow {
    LookbackDays(u32),
    Range { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRequest {
    pub as_of: NaiveDate,
    pub window: RiskWindow,
    pub return_definition: ReturnDefinition,
    pub annualization_factor: f64,
    pub confidence_levels: Vec<f64>,
    pub input_mode: InputMode,
    pub missing_data_policy: MissingDataPolicy,
    /// Only `SAMPLE` is implemented; field kept for lineage/forward
    /// compatibility (spec §4.9 request shape).
    pub covariance_estimator: CovarianceEstimator,
    /// Minimum historical sample size required for the requested
    /// confidence levels before VaR/ES is considered thin.
    pub var_es_min_sample_size: usize,
    /// What happens once a confidence level's sample size falls below
    /// `var_es_min_sample_size`: attach a warning and keep going, or
    /// fail the whole request.
    pub insufficient_sample_policy: InsufficientSamplePolicy,
    pub lineage: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CovarianceEstimator {
    Sample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsufficientSamplePolicy {
    Warn,
    Error,
}
