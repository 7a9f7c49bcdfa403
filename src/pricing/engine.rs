//! Valuation engine (C8): combines per-position native pricing, FX
//! conversion to the portfolio base currency, and aggregation into a
//! `PortfolioValuation` (spec §4.8).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::instruments::{Instrument, Portfolio};
use crate::pricing::fx::resolve_effective_rate;
use crate::pricing::market_data_view::MarketDataView;
use crate::pricing::pricer::PricerRegistry;

/// All inputs used to value one position, recorded for lineage (spec §4.8
/// "all inputs used ... are recorded per position").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionValuation {
    pub instrument_id: String,
    pub quantity: f64,
    pub native_currency: String,
    pub notional_native: f64,
    pub base_currency: String,
    pub notional_base: f64,
    pub fx_rate_used: f64,
    pub fx_asset_id_used: Option<String>,
    pub fx_inverted: bool,
    pub price_input: Option<(String, String, NaiveDate)>,
}

/// Full portfolio valuation as of a single date, in a single base currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub as_of: NaiveDate,
    pub base_currency: String,
    pub nav_base: f64,
    pub breakdown_by_currency: BTreeMap<String, (f64, f64)>,
    pub positions: Vec<PositionValuation>,
}

/// Ties a pricer registry and a market-data view together to produce
/// portfolio valuations. Pure given its inputs; holds no mutable state.
pub struct ValuationEngine<'a> {
    registry: &'a PricerRegistry,
    market: &'a dyn MarketDataView,
}

impl<'a> ValuationEngine<'a> {
    pub fn new(registry: &'a PricerRegistry, market: &'a dyn MarketDataView) -> Self {
        Self { registry, market }
    }

    /// Values every position in `portfolio` plus its cash balances, as of
    /// `as_of`, converting everything into `base_currency`.
    ///
    /// `instruments` must contain an `Instrument` for every
    /// `instrument_id` held in the portfolio; a missing lookup is treated
    /// as a missing pricer for that instrument's kind.
    pub fn value_portfolio(
        &self,
        portfolio: &Portfolio,
        instruments: &BTreeMap<String, Instrument>,
        base_currency: crate::canonical::Currency,
        as_of: NaiveDate,
    ) -> Result<PortfolioValuation, PricingError> {
        let mut position_valuations = Vec::with_capacity(portfolio.positions().len());
        let mut breakdown: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        let mut nav_base = 0.0;

        for position in portfolio.positions() {
            let instrument = instruments
                .get(position.instrument_id.as_str())
                .ok_or_else(|| PricingError::MissingPricer(position.instrument_id.to_string()))?;

            let kind = instrument.spec.kind_str();
            let pricer = self.registry.get(kind)?;
            let native = pricer.price(instrument, position.quantity, as_of, self.market)?;

            let native_ccy = instrument
                .currency
                .unwrap_or(crate::canonical::Currency::USD);
            let fx = resolve_effective_rate(native_ccy, base_currency, as_of, self.market)?;
            let notional_base = native.notional_native * fx.rate;

            let entry = breakdown
                .entry(native_ccy.to_string())
                .or_insert((0.0, 0.0));
            entry.0 += native.notional_native;
            entry.1 += notional_base;
            nav_base += notional_base;

            position_valuations.push(PositionValuation {
                instrument_id: position.instrument_id.to_string(),
                quantity: position.quantity,
                native_currency: native_ccy.to_string(),
                notional_native: native.notional_native,
                base_currency: base_currency.to_string(),
                notional_base,
                fx_rate_used: fx.rate,
                fx_asset_id_used: fx.fx_asset_id_used.map(str::to_string),
                fx_inverted: fx.fx_inverted,
                price_input: native.input_used,
            });
        }

        for (ccy, balance) in portfolio.cash() {
            let cash_ccy = crate::canonical::Currency::new(ccy).map_err(|_| {
                PricingError::UnsupportedCurrency(ccy.clone())
            })?;
            let fx = resolve_effective_rate(cash_ccy, base_currency, as_of, self.market)?;
            let notional_base = balance * fx.rate;
            let entry = breakdown.entry(ccy.clone()).or_insert((0.0, 0.0));
            entry.0 += balance;
            entry.1 += notional_base;
            nav_base += notional_base;
        }

        Ok(PortfolioValuation {
            as_of,
            base_currency: base_currency.to_string(),
            nav_base,
            breakdown_by_currency: breakdown,
            positions: position_valuations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::ids::{Currency, InstrumentId, MarketDataId};
    use crate::instruments::{CashSpec, EquitySpec, InstrumentType, Position};
    use std::collections::BTreeMap as Map;

    struct FixedMarket(Map<(String, String), f64>);
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

    fn as_of() -> chrono::DateTime<chrono::FixedOffset> {
        use chrono::TimeZone;
        chrono::FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 6, 0, 0, 0)
            .unwrap()
    }

    #[test]
    fn nav_aggregates_across_currencies_with_fx_conversion() {
        let aapl = Instrument::new(
            1,
            InstrumentId::new("EQ.AAPL").unwrap(),
            InstrumentType::Equity,
            MarketDataId::bare("AAPL").ok(),
            Some(Currency::USD),
            crate::instruments::InstrumentSpec::Equity(EquitySpec { tradable: true }),
            None,
        )
        .unwrap();
        let cash_eur = Instrument::new(
            1,
            InstrumentId::new("CASH.EUR").unwrap(),
            InstrumentType::Cash,
            None,
            Some(Currency::EUR),
            crate::instruments::InstrumentSpec::Cash(CashSpec),
            None,
        )
        .unwrap();

        let mut instruments = BTreeMap::new();
        instruments.insert("EQ.AAPL".to_string(), aapl);
        instruments.insert("CASH.EUR".to_string(), cash_eur);

        let mut m = Map::new();
        m.insert(("AAPL".to_string(), "close".to_string()), 200.0);
        m.insert(("FX.EURUSD".to_string(), "close".to_string()), 1.1);
        let market = FixedMarket(m);

        let mut cash = Map::new();
        cash.insert("EUR".to_string(), 1000.0);
        let portfolio = Portfolio::new(
            1,
            as_of(),
            vec![Position::new(InstrumentId::new("EQ.AAPL").unwrap(), 10.0).unwrap()],
            cash,
            None,
        )
        .unwrap();

        let registry = PricerRegistry::default_registry();
        let engine = ValuationEngine::new(&registry, &market);
        let valuation = engine
            .value_portfolio(
                &portfolio,
                &instruments,
                Currency::USD,
                NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            )
            .unwrap();

        assert_eq!(valuation.nav_base, 10.0 * 200.0 + 1000.0 * 1.1);
        assert_eq!(
            valuation.breakdown_by_currency.get("EUR").unwrap(),
            &(1000.0, 1100.0)
        );
    }

    #[test]
    fn missing_instrument_lookup_fails_fast() {
        let registry = PricerRegistry::default_registry();
        let market = FixedMarket(Map::new());
        let engine = ValuationEngine::new(&registry, &market);
        let portfolio = Portfolio::new(
            1,
            as_of(),
            vec![Position::new(InstrumentId::new("EQ.MISSING").unwrap(), 1.0).unwrap()],
            Map::new(),
            None,
        )
        .unwrap();
        let res = engine.value_portfolio(
            &portfolio,
            &BTreeMap::new(),
            Currency::USD,
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
        );
        assert!(matches!(res, Err(PricingError::MissingPricer(_))));
    }
}
