//! FX conversion policy (Policy B, MVP): a single canonical series
//! `FX.EURUSD` = USD per EUR, with explicit inversion and no triangulation
//! (spec §4.8, glossary "Policy B (FX)").

use chrono::NaiveDate;

use crate::canonical::ids::{Currency, MarketDataId};
use crate::error::PricingError;
use crate::pricing::market_data_view::MarketDataView;

/// The canonical FX series identifier: `FX.EURUSD`, USD per EUR.
pub fn eurusd_asset_id() -> MarketDataId {
    MarketDataId::bare("FX.EURUSD").expect("FX.EURUSD is a valid bare MarketDataId")
}

/// Result of resolving an effective FX rate to convert a native-currency
/// amount into the portfolio's base currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveFxRate {
    pub rate: f64,
    pub fx_asset_id_used: Option<&'static str>,
    pub fx_inverted: bool,
}

/// Resolves the effective FX rate to convert an amount in `native` into
/// `base`, per the MVP guardrail: only EUR and USD are supported
/// currencies, and the only canonical series is `FX.EURUSD` (USD per EUR).
///
/// - `native == base` => rate 1, no asset used.
/// - `native = EUR, base = USD` => `rate = FX.EURUSD(as_of)`.
/// - `native = USD, base = EUR` => `rate = 1 / FX.EURUSD(as_of)`,
///   `fx_inverted = true`.
/// - any other currency => `UnsupportedCurrencyError`.
pub fn resolve_effective_rate(
    native: Currency,
    base: Currency,
    as_of: NaiveDate,
    market: &dyn MarketDataView,
) -> Result<EffectiveFxRate, PricingError> {
    if native == base {
        return Ok(EffectiveFxRate {
            rate: 1.0,
            fx_asset_id_used: None,
            fx_inverted: false,
        });
    }

    for ccy in [native, base] {
        if ccy != Currency::EUR && ccy != Currency::USD {
            return Err(PricingError::UnsupportedCurrency(ccy.to_string()));
        }
    }

    let asset = eurusd_asset_id();
    let eurusd = market
        .get_value(&asset, "close", as_of)
        .map_err(|_| PricingError::MissingFxRate {
            pair: "FX.EURUSD".to_string(),
            as_of: as_of.to_string(),
        })?;

    validate_rate("FX.EURUSD", as_of, eurusd)?;

    if native == Currency::EUR && base == Currency::USD {
        Ok(EffectiveFxRate {
            rate: eurusd,
            fx_asset_id_used: Some("FX.EURUSD"),
            fx_inverted: false,
        })
    } else {
        // native == USD, base == EUR
        let rate = 1.0 / eurusd;
        validate_rate("FX.EURUSD (inverted)", as_of, rate)?;
        Ok(EffectiveFxRate {
            rate,
            fx_asset_id_used: Some("FX.EURUSD"),
            fx_inverted: true,
        })
    }
}

fn validate_rate(pair: &str, as_of: NaiveDate, rate: f64) -> Result<(), PricingError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(PricingError::InvalidFxRate {
            pair: pair.to_string(),
            as_of: as_of.to_string(),
            rate,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct FixedMarket(BTreeMap<(String, String), f64>);

    impl MarketDataView for FixedMarket {
        fn get_value(
            &self,
            asset: &MarketDataId,
            field: &str,
            _as_of: NaiveDate,
        ) -> Result<f64, PricingError> {
            self.0
                .get(&(asset.as_canonical_key(), field.to_string()))
                .copied()
                .ok_or_else(|| PricingError::MissingPrice {
                    asset: asset.as_canonical_key(),
                    field: field.to_string(),
                    as_of: _as_of.to_string(),
                })
        }

        fn has_value(&self, asset: &MarketDataId, field: &str, as_of: NaiveDate) -> bool {
            self.get_value(asset, field, as_of).is_ok()
        }
    }

    fn market_with_eurusd(rate: f64) -> FixedMarket {
        let mut m = BTreeMap::new();
        m.insert(("FX.EURUSD".to_string(), "close".to_string()), rate);
        FixedMarket(m)
    }

    #[test]
    fn same_currency_is_identity() {
        let market = market_with_eurusd(1.1);
        let r = resolve_effective_rate(
            Currency::USD,
            Currency::USD,
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            &market,
        )
        .unwrap();
        assert_eq!(r.rate, 1.0);
        assert!(r.fx_asset_id_used.is_none());
        assert!(!r.fx_inverted);
    }

    #[test]
    fn usd_to_eur_is_inverted() {
        let market = market_with_eurusd(1.10);
        let r = resolve_effective_rate(
            Currency::USD,
            Currency::EUR,
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            &market,
        )
        .unwrap();
        assert!(r.fx_inverted);
        assert!((r.rate - 1.0 / 1.10).abs() < 1e-12);
    }

    #[test]
    fn unsupported_currency_is_rejected() {
        let market = market_with_eurusd(1.10);
        let gbp = Currency::new("GBP").unwrap();
        let r = resolve_effective_rate(
            gbp,
            Currency::USD,
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            &market,
        );
        assert!(matches!(r, Err(PricingError::UnsupportedCurrency(_))));
    }

    #[test]
    fn missing_fx_rate_errors() {
        let market = FixedMarket(BTreeMap::new());
        let r = resolve_effective_rate(
            Currency::EUR,
            Currency::USD,
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            &market,
        );
        assert!(matches!(r, Err(PricingError::MissingFxRate { .. })));
    }

    #[test]
    fn nonpositive_rate_is_rejected() {
        let market = market_with_eurusd(-1.0);
        let r = resolve_effective_rate(
            Currency::EUR,
            Currency::USD,
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            &market,
        );
        assert!(matches!(r, Err(PricingError::InvalidFxRate { .. })));
    }
}
