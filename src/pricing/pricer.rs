//! Pricer registry (C8): maps an instrument spec kind to the logic that
//! turns `(instrument, quantity, as_of)` into a native-currency notional.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::PricingError;
use crate::instruments::{Instrument, InstrumentSpec};
use crate::pricing::market_data_view::MarketDataView;

/// Per-position pricing result before FX conversion: the native notional
/// plus the market inputs that produced it, for lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeValuation {
    pub notional_native: f64,
    pub unit_price: f64,
    /// `(asset, field, as_of)` actually queried, when a market lookup was
    /// needed (cash needs none).
    pub input_used: Option<(String, String, NaiveDate)>,
}

/// A pricer for one instrument kind. Implementations must be pure
/// functions of their inputs.
pub trait Pricer: Send + Sync {
    fn price(
        &self,
        instrument: &Instrument,
        quantity: f64,
        as_of: NaiveDate,
        market: &dyn MarketDataView,
    ) -> Result<NativeValuation, PricingError>;
}

struct CashPricer;
impl Pricer for CashPricer {
    fn price(
        &self,
        _instrument: &Instrument,
        quantity: f64,
        _as_of: NaiveDate,
        _market: &dyn MarketDataView,
    ) -> Result<NativeValuation, PricingError> {
        Ok(NativeValuation {
            notional_native: quantity,
            unit_price: 1.0,
            input_used: None,
        })
    }
}

struct LinearCashflowPricer;
impl Pricer for LinearCashflowPricer {
    fn price(
        &self,
        instrument: &Instrument,
        quantity: f64,
        as_of: NaiveDate,
        market: &dyn MarketDataView,
    ) -> Result<NativeValuation, PricingError> {
        let asset = instrument.market_data_id.as_ref().ok_or_else(|| {
            PricingError::MissingPrice {
                asset: instrument.instrument_id.to_string(),
                field: "close".to_string(),
                as_of: as_of.to_string(),
            }
        })?;
        let unit_price =
            market
                .get_value(asset, "close", as_of)
                .map_err(|_| PricingError::MissingPrice {
                    asset: asset.as_canonical_key(),
                    field: "close".to_string(),
                    as_of: as_of.to_string(),
                })?;
        if !unit_price.is_finite() {
            return Err(PricingError::NonFiniteInput {
                instrument_id: instrument.instrument_id.to_string(),
                detail: format!("close price {unit_price} is not finite"),
            });
        }
        Ok(NativeValuation {
            notional_native: quantity * unit_price,
            unit_price,
            input_used: Some((asset.as_canonical_key(), "close".to_string(), as_of)),
        })
    }
}

struct FuturePricer;
impl Pricer for FuturePricer {
    fn price(
        &self,
        instrument: &Instrument,
        quantity: f64,
        as_of: NaiveDate,
        market: &dyn MarketDataView,
    ) -> Result<NativeValuation, PricingError> {
        let InstrumentSpec::Future(spec) = &instrument.spec else {
            return Err(PricingError::MissingPricer("future".to_string()));
        };
        let asset = instrument.market_data_id.as_ref().ok_or_else(|| {
            PricingError::MissingPrice {
                asset: instrument.instrument_id.to_string(),
                field: "close".to_string(),
                as_of: as_of.to_string(),
            }
        })?;
        let unit_price =
            market
                .get_value(asset, "close", as_of)
                .map_err(|_| PricingError::MissingPrice {
                    asset: asset.as_canonical_key(),
                    field: "close".to_string(),
                    as_of: as_of.to_string(),
                })?;
        if !unit_price.is_finite() {
            return Err(PricingError::NonFiniteInput {
                instrument_id: instrument.instrument_id.to_string(),
                detail: format!("close price {unit_price} is not finite"),
            });
        }
        Ok(NativeValuation {
            notional_native: quantity * unit_price * spec.multiplier,
            unit_price,
            input_used: Some((asset.as_canonical_key(), "close".to_string(), as_of)),
        })
    }
}

/// Maps `spec.kind()` -> [`Pricer`]. Passed explicitly into the valuation
/// engine rather than held as process-wide state (spec §9 "singletons").
pub struct PricerRegistry {
    pricers: BTreeMap<&'static str, Box<dyn Pricer>>,
}

impl PricerRegistry {
    /// The default registry: cash, equity/tradable-index (linear MTM via
    /// close), and linear-futures MTM. No nonlinear derivative pricers are
    /// registered (spec §1 non-goals).
    pub fn default_registry() -> Self {
        let mut pricers: BTreeMap<&'static str, Box<dyn Pricer>> = BTreeMap::new();
        pricers.insert("cash", Box::new(CashPricer));
        pricers.insert("equity", Box::new(LinearCashflowPricer));
        pricers.insert("index", Box::new(LinearCashflowPricer));
        pricers.insert("future", Box::new(FuturePricer));
        Self { pricers }
    }

    pub fn empty() -> Self {
        Self {
            pricers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, kind: &'static str, pricer: Box<dyn Pricer>) {
        self.pricers.insert(kind, pricer);
    }

    pub fn get(&self, kind: &str) -> Result<&dyn Pricer, PricingError> {
        self.pricers
            .get(kind)
            .map(|b| b.as_ref())
            .ok_or_else(|| PricingError::MissingPricer(kind.to_string()))
    }
}
