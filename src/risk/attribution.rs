//! Variance attribution (spec §4.9 step 11): `sigma^2 = w^T * Sigma * w`,
//! `CCV_i = w_i * (Sigma*w)_i`, and the contributions must reconcile to
//! `sigma^2` within tolerance.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

const RECONCILIATION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub portfolio_variance: f64,
    /// Asset -> component contribution to variance (`CCV_i`).
    pub contributions: Vec<(String, f64)>,
    pub reconciles: bool,
    pub convention: &'static str,
}

/// `weights` and `assets` must be in the same order as `covariance`'s
/// rows/columns.
pub fn variance_attribution(
    assets: &[String],
    weights: &[f64],
    covariance: &Array2<f64>,
) -> AttributionResult {
    let n = assets.len();
    let sigma_w: Vec<f64> = (0..n)
        .map(|i| (0..n).map(|j| covariance[[i, j]] * weights[j]).sum())
        .collect();

    let portfolio_variance: f64 = (0..n).map(|i| weights[i] * sigma_w[i]).sum();

    let contributions: Vec<(String, f64)> = assets
        .iter()
        .zip(weights)
        .zip(&sigma_w)
        .map(|((asset, w), sw)| (asset.clone(), w * sw))
        .collect();

    let contribution_sum: f64 = contributions.iter().map(|(_, c)| c).sum();
    let reconciles = (contribution_sum - portfolio_variance).abs() <= RECONCILIATION_TOLERANCE
        || (contribution_sum - portfolio_variance).abs()
            <= RECONCILIATION_TOLERANCE * portfolio_variance.abs().max(1.0);

    AttributionResult {
        portfolio_variance,
        contributions,
        reconciles,
        convention: "CCV",
    }
}
