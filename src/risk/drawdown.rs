//! Drawdown and time-to-recovery (spec §4.9 step 7).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSeries {
    pub dates: Vec<NaiveDate>,
    /// Cumulative wealth `W_t = prod(1 + r_s)` for `s <= t`, `W_0 = 1`.
    pub wealth: Vec<f64>,
    /// `D_t = W_t / running_max_t - 1`, always `<= 0`.
    pub drawdown: Vec<f64>,
    pub max_drawdown: f64,
    /// Index (into `dates`) of the max-drawdown trough.
    pub max_drawdown_at: Option<usize>,
    /// Trading-day count from the trough back to its prior running peak,
    /// or `None` if wealth never recovers within the window.
    pub time_to_recovery: Option<usize>,
}

/// Builds the drawdown series from a portfolio return series (already
/// ordered ascending by date).
pub fn compute_drawdown(dates: &[NaiveDate], returns: &[f64]) -> DrawdownSeries {
    let mut wealth = Vec::with_capacity(returns.len());
    let mut running_max = Vec::with_capacity(returns.len());
    let mut w = 1.0_f64;
    let mut peak = 1.0_f64;
    for r in returns {
        w *= 1.0 + r;
        peak = peak.max(w);
        wealth.push(w);
        running_max.push(peak);
    }

    let drawdown: Vec<f64> = wealth
        .iter()
        .zip(&running_max)
        .map(|(w, peak)| w / peak - 1.0)
        .collect();

    let max_drawdown_at = drawdown
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i);
    let max_drawdown = max_drawdown_at.map(|i| drawdown[i]).unwrap_or(0.0);

    let time_to_recovery = max_drawdown_at.and_then(|trough| {
        let prior_peak = running_max[trough];
        wealth[trough + 1..]
            .iter()
            .position(|w| *w >= prior_peak)
            .map(|offset| offset + 1)
    });

    DrawdownSeries {
        dates: dates.to_vec(),
        wealth,
        drawdown,
        max_drawdown,
        max_drawdown_at,
        time_to_recovery,
    }
}
