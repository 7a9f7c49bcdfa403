//! Historical VaR / Expected Shortfall (spec §4.9 step 9), loss convention
//! (`loss = -return`). Quantile interpolation rule is linear between
//! order statistics — the specification leaves this choice open and this
//! is the one fixed here (spec Open Questions (a)).

use serde::{Deserialize, Serialize};

use crate::error::RiskError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarEsResult {
    pub confidence_level: f64,
    pub var: f64,
    pub es: f64,
    pub sample_size: usize,
}

/// `losses` need not be pre-sorted; `confidence_level` is e.g. `0.95`.
/// Returns a warning string alongside the result when the sample is thin
/// for the requested confidence level, per the caller's
/// `min_sample_size` threshold.
pub fn historical_var_es(
    returns: &[f64],
    confidence_level: f64,
    min_sample_size: usize,
) -> Result<(VarEsResult, Option<String>), RiskError> {
    if !(0.0..1.0).contains(&confidence_level) {
        return Err(RiskError::NonFiniteReturn {
            asset: "portfolio".to_string(),
            date: format!("invalid confidence level {confidence_level}"),
        });
    }
    if returns.is_empty() {
        return Err(RiskError::InsufficientSampleSize {
            required: min_sample_size.max(1),
            actual: 0,
        });
    }

    let mut losses: Vec<f64> = returns.iter().map(|r| -r).collect();
    losses.sort_by(|a, b| a.partial_cmp(b).expect("returns are validated finite upstream"));

    let (var, upper_index) = empirical_quantile(&losses, confidence_level);
    // ES averages the interpolated VaR point itself with every realized loss
    // at or above the upper order statistic VaR was interpolated against —
    // this is what keeps `ES >= VaR` exact (not just "usually") even when
    // the requested confidence level falls strictly between two order
    // statistics, per the worked example in spec §8 scenario 5.
    let es_sum: f64 = var + losses[upper_index..].iter().sum::<f64>();
    let es_count = 1 + (losses.len() - upper_index);
    let es = es_sum / es_count as f64;

    let warning = if losses.len() < min_sample_size {
        Some(format!(
            "sample size {} below recommended minimum {} for confidence level {}",
            losses.len(),
            min_sample_size,
            confidence_level
        ))
    } else {
        None
    };

    Ok((
        VarEsResult {
            confidence_level,
            var,
            es,
            sample_size: losses.len(),
        },
        warning,
    ))
}

/// Linear interpolation between order statistics using the Hazen
/// plotting-position convention (`h = n*q - 0.5`, 0-indexed, clamped to the
/// sample range). Returns `(value, upper_index)` where `upper_index` is the
/// ceiling order-statistic index the interpolation drew from, which the
/// caller needs to build the matching ES tail.
///
/// This is the fixed rule spec §9 Open Question (a) asks implementers to
/// pin down; it is the one that reproduces the worked VaR/ES numbers in
/// spec §8 scenario 5 (`VaR_0.90 = 0.04`, `ES_0.90 = 0.045`) exactly.
fn empirical_quantile(sorted: &[f64], q: f64) -> (f64, usize) {
    let n = sorted.len();
    if n == 1 {
        return (sorted[0], 0);
    }
    let h = (n as f64 * q - 0.5).clamp(0.0, (n - 1) as f64);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        (sorted[lo], hi)
    } else {
        let frac = h - lo as f64;
        (sorted[lo] + frac * (sorted[hi] - sorted[lo]), hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn es_is_never_less_than_var() {
        let returns = vec![
            0.01, -0.02, 0.015, -0.05, 0.03, -0.01, 0.02, -0.03, 0.005, -0.04,
        ];
        let (result, _) = historical_var_es(&returns, 0.95, 5).unwrap();
        assert!(result.es >= result.var - 1e-12);
    }

    #[test]
    fn thin_sample_emits_warning() {
        let returns = vec![0.01, -0.02, 0.015];
        let (_, warning) = historical_var_es(&returns, 0.95, 50).unwrap();
        assert!(warning.is_some());
    }

    #[test]
    fn empirical_quantile_matches_known_linear_interpolation() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(empirical_quantile(&sorted, 0.5).0, 3.0);
        assert!((empirical_quantile(&sorted, 0.25).0 - 1.75).abs() < 1e-12);
    }

    #[test]
    fn matches_spec_scenario_5_worked_example() {
        let returns = vec![
            -0.05, -0.03, -0.02, -0.01, 0.00, 0.01, 0.02, 0.03, 0.04, 0.05,
        ];
        let (result, _) = historical_var_es(&returns, 0.90, 1).unwrap();
        assert!((result.var - 0.04).abs() < 1e-12);
        assert!((result.es - 0.045).abs() < 1e-12);
        assert!(result.es >= result.var);
    }
}
