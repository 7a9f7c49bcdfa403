//! `RiskEngine::run` (spec §4.9): the full pipeline from aligned market
//! data to a typed, deterministic `RiskReport` with input lineage.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::canonical::ids::MarketDataId;
use crate::canonical::{content_hash, HashError};
use crate::error::RiskError;
use crate::instruments::Portfolio;
use crate::risk::attribution::{variance_attribution, AttributionResult};
use crate::risk::covariance::{correlation_from_covariance, sample_covariance, CorrelationMatrix, CovarianceDiagnostics};
use crate::risk::drawdown::{compute_drawdown, DrawdownSeries};
use crate::risk::exposure::{compute_exposures, ExposureReport};
use crate::risk::request::{InputMode, InsufficientSamplePolicy, MissingDataPolicy, RiskRequest, RiskWindow};
use crate::risk::returns::build_return_series;
use crate::risk::var_es::{historical_var_es, VarEsResult};

/// One asset's date-aligned price series plus its weight in the
/// portfolio, as produced by the valuation/exposure step upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSeries {
    /// The portfolio position this series backs.
    pub instrument_id: String,
    pub asset: MarketDataId,
    pub currency: String,
    pub prices: Vec<(NaiveDate, Option<f64>)>,
    pub weight: f64,
    pub notional_base: f64,
}

/// Everything `RiskEngine::run` needs beyond the request: the portfolio
/// snapshot, its aligned constituent price series, and an optional
/// benchmark series for tracking error.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInput {
    pub portfolio: Portfolio,
    pub assets: Vec<AssetSeries>,
    pub benchmark: Option<Vec<(NaiveDate, Option<f64>)>>,
    pub market_data_bundle_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub volatility_annualized: f64,
    pub tracking_error_annualized: Option<f64>,
    pub drawdown: DrawdownSeries,
    pub var_es: Vec<VarEsResult>,
    pub covariance_diagnostics: CovarianceDiagnostics,
    pub correlation: CorrelationMatrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLineage {
    pub portfolio_snapshot_hash: String,
    pub market_data_bundle_hash: String,
    pub request_hash: String,
    pub benchmark_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub report_version: u32,
    pub as_of: NaiveDate,
    pub input_lineage: InputLineage,
    pub metrics: RiskMetrics,
    pub exposures: ExposureReport,
    pub attribution: AttributionResult,
    pub warnings: Vec<String>,
}

const REPORT_VERSION: u32 = 1;
const MIN_SAMPLE_SIZE: usize = 2;

pub struct RiskEngine;

impl RiskEngine {
    #[tracing::instrument(skip(request, input))]
    pub fn run(request: &RiskRequest, input: &RiskInput) -> Result<RiskReport, RiskError> {
        let window_end = match request.window {
            RiskWindow::LookbackDays(_) => request.as_of,
            RiskWindow::Range { end, .. } => end,
        };
        if request.as_of > window_end {
            return Err(RiskError::AsOfAfterWindowEnd {
                as_of: request.as_of.to_string(),
                window_end: window_end.to_string(),
            });
        }

        let mut warnings = Vec::new();

        let known_positions: std::collections::BTreeSet<&str> =
            input.assets.iter().map(|a| a.instrument_id.as_str()).collect();
        for position in input.portfolio.positions() {
            if !known_positions.contains(position.instrument_id.as_str()) {
                return Err(RiskError::AssetNotInBundle(
                    position.instrument_id.to_string(),
                ));
            }
        }

        let mut return_series = Vec::with_capacity(input.assets.len());
        for asset in &input.assets {
            let clipped: Vec<(NaiveDate, Option<f64>)> = asset
                .prices
                .iter()
                .filter(|(date, _)| *date <= request.as_of)
                .copied()
                .collect();
            let series = build_return_series(
                &asset.asset.as_canonical_key(),
                &clipped,
                request.return_definition,
                request.missing_data_policy,
            )?;
            warnings.extend(series.warnings.clone());
            return_series.push(series);
        }

        let n_obs = return_series
            .iter()
            .map(|s| s.returns.len())
            .min()
            .unwrap_or(0);
        if n_obs < MIN_SAMPLE_SIZE {
            return Err(RiskError::InsufficientSampleSize {
                required: MIN_SAMPLE_SIZE,
                actual: n_obs,
            });
        }

        let assets_names: Vec<String> = input.assets.iter().map(|a| a.asset.as_canonical_key()).collect();
        let returns_matrix: Vec<Vec<f64>> = return_series
            .iter()
            .map(|s| s.returns[s.returns.len() - n_obs..].to_vec())
            .collect();
        let weights: Vec<f64> = input.assets.iter().map(|a| a.weight).collect();

        if matches!(request.input_mode, InputMode::StaticWeightsXAssetReturns) {
            warnings.push(
                "STATIC_WEIGHTS_X_ASSET_RETURNS approximation ignores intra-window rebalancing"
                    .to_string(),
            );
        }

        let portfolio_returns: Vec<f64> = (0..n_obs)
            .map(|t| {
                (0..assets_names.len())
                    .map(|i| weights[i] * returns_matrix[i][t])
                    .sum()
            })
            .collect();
        let portfolio_dates: Vec<NaiveDate> = return_series
            .first()
            .map(|s| s.dates[s.dates.len() - n_obs..].to_vec())
            .unwrap_or_default();

        let mean = portfolio_returns.iter().sum::<f64>() / n_obs as f64;
        let variance = portfolio_returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (n_obs as f64 - 1.0);
        let volatility_annualized = variance.sqrt() * request.annualization_factor.sqrt();

        let tracking_error_annualized = match &input.benchmark {
            Some(benchmark_prices) => {
                let clipped: Vec<(NaiveDate, Option<f64>)> = benchmark_prices
                    .iter()
                    .filter(|(date, _)| *date <= request.as_of)
                    .copied()
                    .collect();
                let benchmark_series = build_return_series(
                    "benchmark",
                    &clipped,
                    request.return_definition,
                    request.missing_data_policy,
                )?;
                warnings.extend(benchmark_series.warnings.clone());
                let m = portfolio_returns.len().min(benchmark_series.returns.len());
                let diffs: Vec<f64> = (0..m)
                    .map(|t| {
                        portfolio_returns[portfolio_returns.len() - m + t]
                            - benchmark_series.returns[benchmark_series.returns.len() - m + t]
                    })
                    .collect();
                let mean_d = diffs.iter().sum::<f64>() / m as f64;
                let var_d = diffs.iter().map(|d| (d - mean_d).powi(2)).sum::<f64>() / (m as f64 - 1.0);
                Some(var_d.sqrt() * request.annualization_factor.sqrt())
            }
            None => None,
        };

        let covariance_result = sample_covariance(&assets_names, &returns_matrix, 0, MIN_SAMPLE_SIZE)?;
        let correlation = CorrelationMatrix::from_array(
            &assets_names,
            &correlation_from_covariance(&covariance_result.covariance),
        );

        let drawdown = compute_drawdown(&portfolio_dates, &portfolio_returns);

        let mut var_es = Vec::with_capacity(request.confidence_levels.len());
        for &level in &request.confidence_levels {
            let (result, warning) =
                historical_var_es(&portfolio_returns, level, request.var_es_min_sample_size)?;
            if result.es < result.var - 1e-9 {
                tracing::warn!(level, "ES below VaR beyond tolerance");
            }
            if let Some(w) = warning {
                match request.insufficient_sample_policy {
                    InsufficientSamplePolicy::Warn => warnings.push(w),
                    InsufficientSamplePolicy::Error => {
                        return Err(RiskError::InsufficientSampleSize {
                            required: request.var_es_min_sample_size,
                            actual: result.sample_size,
                        });
                    }
                }
            }
            var_es.push(result);
        }

        let notionals_base: BTreeMap<String, f64> = input
            .assets
            .iter()
            .map(|a| (a.asset.as_canonical_key(), a.notional_base))
            .collect();
        let currency_of: BTreeMap<String, String> = input
            .assets
            .iter()
            .map(|a| (a.asset.as_canonical_key(), a.currency.clone()))
            .collect();
        let exposures = compute_exposures(&notionals_base, &currency_of);

        let attribution = variance_attribution(&assets_names, &weights, &covariance_result.covariance);
        if !attribution.reconciles {
            warnings.push("variance attribution contributions did not reconcile within tolerance".to_string());
        }

        let request_hash = content_hash(request).map_err(hash_to_risk_error)?;
        let portfolio_snapshot_hash = input.portfolio.snapshot_hash().map_err(hash_to_risk_error)?;

        Ok(RiskReport {
            report_version: REPORT_VERSION,
            as_of: request.as_of,
            input_lineage: InputLineage {
                portfolio_snapshot_hash,
                market_data_bundle_hash: input.market_data_bundle_hash.clone(),
                request_hash,
                benchmark_id: input.benchmark.as_ref().map(|_| "benchmark".to_string()),
            },
            metrics: RiskMetrics {
                volatility_annualized,
                tracking_error_annualized,
                drawdown,
                var_es,
                covariance_diagnostics: covariance_result.diagnostics,
                correlation,
            },
            exposures,
            attribution,
            warnings,
        })
    }
}

fn hash_to_risk_error(_e: HashError) -> RiskError {
    RiskError::NonFiniteReturn {
        asset: "portfolio".to_string(),
        date: "lineage hashing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::ids::InstrumentId;
    use crate::instruments::Position;
    use crate::risk::request::{CovarianceEstimator, InsufficientSamplePolicy, ReturnDefinition};
    use chrono::{FixedOffset, TimeZone};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily_prices(start: f64, steps: &[f64]) -> Vec<(NaiveDate, Option<f64>)> {
        let mut price = start;
        let mut out = vec![(d(2026, 1, 1), Some(price))];
        for (i, step) in steps.iter().enumerate() {
            price *= 1.0 + step;
            out.push((d(2026, 1, 2 + i as u32), Some(price)));
        }
        out
    }

    fn sample_request(as_of: NaiveDate) -> RiskRequest {
        RiskRequest {
            as_of,
            window: RiskWindow::LookbackDays(30),
            return_definition: ReturnDefinition::Simple,
            annualization_factor: 252.0,
            confidence_levels: vec![0.95],
            input_mode: InputMode::StaticWeightsXAssetReturns,
            missing_data_policy: MissingDataPolicy::Error,
            covariance_estimator: CovarianceEstimator::Sample,
            var_es_min_sample_size: 30,
            insufficient_sample_policy: InsufficientSamplePolicy::Warn,
            lineage: None,
        }
    }

    fn sample_portfolio() -> Portfolio {
        let as_of = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 10, 0, 0, 0)
            .unwrap();
        Portfolio::new(
            1,
            as_of,
            vec![Position::new(InstrumentId::new("EQ.AAPL").unwrap(), 10.0).unwrap()],
            std::collections::BTreeMap::new(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn run_produces_a_report_with_reconciling_attribution() {
        let as_of = d(2026, 1, 8);
        let prices = daily_prices(100.0, &[0.01, -0.02, 0.015, 0.03, -0.01, 0.02]);
        let asset = AssetSeries {
            instrument_id: "EQ.AAPL".to_string(),
            asset: MarketDataId::bare("AAPL").unwrap(),
            currency: "USD".to_string(),
            prices,
            weight: 1.0,
            notional_base: 1000.0,
        };
        let input = RiskInput {
            portfolio: sample_portfolio(),
            assets: vec![asset],
            benchmark: None,
            market_data_bundle_hash: "deadbeef".to_string(),
        };

        let report = RiskEngine::run(&sample_request(as_of), &input).unwrap();
        assert!(report.attribution.reconciles);
        assert_eq!(report.metrics.var_es.len(), 1);
        assert!(report.metrics.var_es[0].es >= report.metrics.var_es[0].var - 1e-9);
        assert_eq!(report.metrics.correlation.values[0][0], Some(1.0));
    }

    #[test]
    fn thin_var_es_sample_errors_when_policy_demands_it() {
        let as_of = d(2026, 1, 8);
        let prices = daily_prices(100.0, &[0.01, -0.02, 0.015, 0.03, -0.01, 0.02]);
        let asset = AssetSeries {
            instrument_id: "EQ.AAPL".to_string(),
            asset: MarketDataId::bare("AAPL").unwrap(),
            currency: "USD".to_string(),
            prices,
            weight: 1.0,
            notional_base: 1000.0,
        };
        let input = RiskInput {
            portfolio: sample_portfolio(),
            assets: vec![asset],
            benchmark: None,
            market_data_bundle_hash: "deadbeef".to_string(),
        };

        let mut request = sample_request(as_of);
        request.insufficient_sample_policy = InsufficientSamplePolicy::Error;
        let res = RiskEngine::run(&request, &input);
        assert!(matches!(res, Err(RiskError::InsufficientSampleSize { .. })));
    }

    #[test]
    fn as_of_after_window_end_is_rejected() {
        let mut request = sample_request(d(2026, 1, 20));
        request.window = RiskWindow::Range {
            start: d(2026, 1, 1),
            end: d(2026, 1, 10),
        };
        let input = RiskInput {
            portfolio: sample_portfolio(),
            assets: vec![],
            benchmark: None,
            market_data_bundle_hash: "deadbeef".to_string(),
        };
        let res = RiskEngine::run(&request, &input);
        assert!(matches!(res, Err(RiskError::AsOfAfterWindowEnd { .. })));
    }

    #[test]
    fn position_without_matching_asset_series_fails_fast() {
        let as_of = d(2026, 1, 8);
        let input = RiskInput {
            portfolio: sample_portfolio(),
            assets: vec![],
            benchmark: None,
            market_data_bundle_hash: "deadbeef".to_string(),
        };
        let res = RiskEngine::run(&sample_request(as_of), &input);
        assert!(matches!(res, Err(RiskError::AssetNotInBundle(_))));
    }
}
