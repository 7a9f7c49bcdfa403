//! Sample covariance and correlation (spec §4.9 steps 5-6): unbiased
//! (`n-1`) estimator, with symmetry diagnostics recorded rather than
//! silently assumed.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceDiagnostics {
    pub sample_size: usize,
    pub missing_count: usize,
    pub symmetry_max_error: f64,
    pub is_symmetric: bool,
    pub estimator: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceResult {
    pub assets: Vec<String>,
    pub covariance: Array2<f64>,
    pub diagnostics: CovarianceDiagnostics,
}

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// `Σ_ij = mean((r_i - μ_i)(r_j - μ_j))` with Bessel's correction
/// (`n-1`). All return series must already be aligned to the same dates
/// (equal length, same index); `missing_count` is supplied by the caller
/// from the alignment step that produced them.
pub fn sample_covariance(
    assets: &[String],
    returns: &[Vec<f64>],
    missing_count: usize,
    min_sample_size: usize,
) -> Result<CovarianceResult, RiskError> {
    let n_assets = assets.len();
    let n_obs = returns.first().map(|r| r.len()).unwrap_or(0);
    if returns.iter().any(|r| r.len() != n_obs) {
        return Err(RiskError::InsufficientSampleSize {
            required: min_sample_size,
            actual: 0,
        });
    }
    if n_obs < min_sample_size.max(2) {
        return Err(RiskError::InsufficientSampleSize {
            required: min_sample_size.max(2),
            actual: n_obs,
        });
    }

    let means: Vec<f64> = returns
        .iter()
        .map(|series| series.iter().sum::<f64>() / n_obs as f64)
        .collect();

    let mut cov = Array2::<f64>::zeros((n_assets, n_assets));
    for i in 0..n_assets {
        for j in 0..n_assets {
            let mut acc = 0.0;
            for t in 0..n_obs {
                acc += (returns[i][t] - means[i]) * (returns[j][t] - means[j]);
            }
            cov[[i, j]] = acc / (n_obs as f64 - 1.0);
        }
    }

    let mut symmetry_max_error = 0.0_f64;
    for i in 0..n_assets {
        for j in 0..n_assets {
            symmetry_max_error = symmetry_max_error.max((cov[[i, j]] - cov[[j, i]]).abs());
        }
    }

    Ok(CovarianceResult {
        assets: assets.to_vec(),
        covariance: cov,
        diagnostics: CovarianceDiagnostics {
            sample_size: n_obs,
            missing_count,
            symmetry_max_error,
            is_symmetric: symmetry_max_error <= SYMMETRY_TOLERANCE,
            estimator: "SAMPLE",
        },
    })
}

/// Safe correlation from a covariance matrix: diagonal forced to 1,
/// zero-variance rows/columns yield `NaN` off-diagonal rather than a
/// division-by-zero panic.
pub fn correlation_from_covariance(cov: &Array2<f64>) -> Array2<f64> {
    let n = cov.shape()[0];
    let std: Vec<f64> = (0..n).map(|i| cov[[i, i]].max(0.0).sqrt()).collect();
    let mut corr = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                corr[[i, j]] = 1.0;
            } else if std[i] > 0.0 && std[j] > 0.0 {
                corr[[i, j]] = cov[[i, j]] / (std[i] * std[j]);
            } else {
                corr[[i, j]] = f64::NAN;
            }
        }
    }
    corr
}

/// JSON/canonical-hash-safe rendering of a correlation matrix: `Array2`
/// has no `Serialize` impl here and a raw `NaN` would be rejected by
/// canonical hashing, so zero-variance entries become `None` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub assets: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn from_array(assets: &[String], corr: &Array2<f64>) -> Self {
        let n = assets.len();
        let values = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let v = corr[[i, j]];
                        v.is_finite().then_some(v)
                    })
                    .collect()
            })
            .collect();
        Self {
            assets: assets.to_vec(),
            values,
        }
    }
}
