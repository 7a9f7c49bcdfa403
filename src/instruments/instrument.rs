use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::canonical::ids::{Currency, InstrumentId, MarketDataId};
use crate::error::InstrumentError;
use crate::instruments::spec::InstrumentSpec;

/// `instrument_type` as it appears on the wire; must match `spec.kind()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InstrumentType {
    Equity,
    Index,
    Cash,
    Future,
    Bond,
}

/// A priced or holdable instrument (spec §3). Construction enforces every
/// cross-field invariant the spec lists; there is no way to obtain an
/// `Instrument` that violates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub schema_version: u32,
    pub instrument_id: InstrumentId,
    pub instrument_type: InstrumentType,
    pub market_data_id: Option<MarketDataId>,
    pub currency: Option<Currency>,
    pub spec: InstrumentSpec,
    pub meta: Option<serde_json::Value>,
}

impl Instrument {
    pub fn new(
        schema_version: u32,
        instrument_id: InstrumentId,
        instrument_type: InstrumentType,
        market_data_id: Option<MarketDataId>,
        currency: Option<Currency>,
        spec: InstrumentSpec,
        meta: Option<serde_json::Value>,
    ) -> Result<Self, InstrumentError> {
        let expected_kind = match instrument_type {
            InstrumentType::Equity => "equity",
            InstrumentType::Index => "index",
            InstrumentType::Cash => "cash",
            InstrumentType::Future => "future",
            InstrumentType::Bond => "bond",
        };
        if spec.kind_str() != expected_kind {
            return Err(InstrumentError::TypeSpecMismatch {
                instrument_type: instrument_type.to_string(),
                spec_kind: spec.kind_str().to_string(),
            });
        }

        match &spec {
            InstrumentSpec::Equity(e) if e.tradable && market_data_id.is_none() => {
                return Err(InstrumentError::MissingMarketDataId(
                    instrument_id.to_string(),
                ));
            }
            InstrumentSpec::Index(i) if i.is_tradable && market_data_id.is_none() => {
                return Err(InstrumentError::MissingMarketDataId(
                    instrument_id.to_string(),
                ));
            }
            InstrumentSpec::Future(f) => {
                f.validate(instrument_id.as_str())?;
                if market_data_id.is_none() {
                    return Err(InstrumentError::MissingMarketDataId(
                        instrument_id.to_string(),
                    ));
                }
            }
            InstrumentSpec::Cash(_) if currency.is_none() => {
                return Err(InstrumentError::MissingCurrency(instrument_id.to_string()));
            }
            _ => {}
        }

        Ok(Self {
            schema_version,
            instrument_id,
            instrument_type,
            market_data_id,
            currency,
            spec,
            meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::spec::{CashSpec, EquitySpec, FutureSpec, IndexSpec};
    use chrono::NaiveDate;

    fn iid(s: &str) -> InstrumentId {
        InstrumentId::new(s).unwrap()
    }

    #[test]
    fn tradable_equity_requires_market_data_id() {
        let res = Instrument::new(
            1,
            iid("EQ.AAPL"),
            InstrumentType::Equity,
            None,
            None,
            InstrumentSpec::Equity(EquitySpec { tradable: true }),
            None,
        );
        assert!(matches!(
            res,
            Err(InstrumentError::MissingMarketDataId(_))
        ));
    }

    #[test]
    fn non_tradable_index_permits_missing_market_data_id() {
        let res = Instrument::new(
            1,
            iid("IDX.CUSTOM"),
            InstrumentType::Index,
            None,
            None,
            InstrumentSpec::Index(IndexSpec { is_tradable: false }),
            None,
        );
        assert!(res.is_ok());
    }

    #[test]
    fn cash_requires_currency() {
        let res = Instrument::new(
            1,
            iid("CASH.USD"),
            InstrumentType::Cash,
            None,
            None,
            InstrumentSpec::Cash(CashSpec),
            None,
        );
        assert!(matches!(res, Err(InstrumentError::MissingCurrency(_))));
    }

    #[test]
    fn future_requires_positive_multiplier_and_market_data_id() {
        let market_data_id = MarketDataId::bare("ES").ok();
        let res = Instrument::new(
            1,
            iid("FUT.ES"),
            InstrumentType::Future,
            market_data_id,
            None,
            InstrumentSpec::Future(FutureSpec {
                multiplier: 50.0,
                expiry: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            }),
            None,
        );
        assert!(res.is_ok());

        let res_bad = Instrument::new(
            1,
            iid("FUT.ES"),
            InstrumentType::Future,
            MarketDataId::bare("ES").ok(),
            None,
            InstrumentSpec::Future(FutureSpec {
                multiplier: 0.0,
                expiry: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            }),
            None,
        );
        assert!(matches!(
            res_bad,
            Err(InstrumentError::InvalidMultiplier { .. })
        ));
    }

    #[test]
    fn type_spec_mismatch_is_rejected() {
        let res = Instrument::new(
            1,
            iid("EQ.AAPL"),
            InstrumentType::Equity,
            MarketDataId::bare("AAPL").ok(),
            None,
            InstrumentSpec::Cash(CashSpec),
            None,
        );
        assert!(matches!(
            res,
            Err(InstrumentError::TypeSpecMismatch { .. })
        ));
    }
}
