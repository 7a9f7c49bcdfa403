//! Asset and currency exposures (spec §4.9 step 10): weights from a
//! valuation snapshot when available, else notionals; normalized to 1
//! when the notionals are single-signed, otherwise reported as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureReport {
    pub by_asset: BTreeMap<String, f64>,
    pub by_currency: BTreeMap<String, f64>,
    pub normalized: bool,
}

/// `notionals_base` maps instrument id -> notional in the report's base
/// currency; `currency_of` maps instrument id -> native currency code
/// (the spec forbids cross-currency aggregation without an explicit FX
/// policy, so currency exposure here stays in native-notional terms).
pub fn compute_exposures(
    notionals_base: &BTreeMap<String, f64>,
    currency_of: &BTreeMap<String, String>,
) -> ExposureReport {
    let total: f64 = notionals_base.values().sum();
    let all_same_sign = notionals_base.values().all(|v| *v >= 0.0)
        || notionals_base.values().all(|v| *v <= 0.0);
    let normalize = all_same_sign && total.abs() > 0.0;

    let by_asset: BTreeMap<String, f64> = notionals_base
        .iter()
        .map(|(id, notional)| {
            let w = if normalize { notional / total } else { *notional };
            (id.clone(), w)
        })
        .collect();

    let mut by_currency: BTreeMap<String, f64> = BTreeMap::new();
    for (id, notional) in notionals_base {
        if let Some(ccy) = currency_of.get(id) {
            *by_currency.entry(ccy.clone()).or_insert(0.0) += notional;
        }
    }
    if normalize {
        for v in by_currency.values_mut() {
            *v /= total;
        }
    }

    ExposureReport {
        by_asset,
        by_currency,
        normalized: normalize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_only_book_normalizes_to_one() {
        let mut notionals = BTreeMap::new();
        notionals.insert("EQ.AAPL".to_string(), 300.0);
        notionals.insert("EQ.MSFT".to_string(), 700.0);
        let report = compute_exposures(&notionals, &BTreeMap::new());
        assert!(report.normalized);
        let sum: f64 = report.by_asset.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mixed_sign_book_is_reported_unnormalized() {
        let mut notionals = BTreeMap::new();
        notionals.insert("EQ.AAPL".to_string(), 300.0);
        notionals.insert("EQ.SHORT".to_string(), -100.0);
        let report = compute_exposures(&notionals, &BTreeMap::new());
        assert!(!report.normalized);
        assert_eq!(report.by_asset.get("EQ.AAPL"), Some(&300.0));
    }

    #[test]
    fn currency_exposure_aggregates_same_currency_assets() {
        let mut notionals = BTreeMap::new();
        notionals.insert("EQ.AAPL".to_string(), 300.0);
        notionals.insert("EQ.MSFT".to_string(), 700.0);
        let mut ccy = BTreeMap::new();
        ccy.insert("EQ.AAPL".to_string(), "USD".to_string());
        ccy.insert("EQ.MSFT".to_string(), "USD".to_string());
        let report = compute_exposures(&notionals, &ccy);
        assert!((report.by_currency.get("USD").unwrap() - 1.0).abs() < 1e-12);
    }
}
