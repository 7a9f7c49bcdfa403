//! Typed, tagged-union instrument specs (C7). Each variant's `kind` tag is
//! what `Instrument::instrument_type` must match (spec §3).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::InstrumentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySpec {
    /// Whether the equity trades (vs. a reference-only listing). Tradable
    /// equities require a `market_data_id` on the owning `Instrument`.
    pub tradable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub is_tradable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureSpec {
    pub multiplier: f64,
    pub expiry: NaiveDate,
}

impl FutureSpec {
    pub fn validate(&self, instrument_id: &str) -> Result<(), InstrumentError> {
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(InstrumentError::InvalidMultiplier {
                instrument_id: instrument_id.to_string(),
                multiplier: self.multiplier,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondSpec {
    pub maturity: NaiveDate,
}

/// Discriminated union of instrument specs, tagged by `kind` in
/// serialized form so the tag travels with canonical serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InstrumentSpec {
    Equity(EquitySpec),
    Index(IndexSpec),
    Cash(CashSpec),
    Future(FutureSpec),
    Bond(BondSpec),
}

impl InstrumentSpec {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Equity(_) => "equity",
            Self::Index(_) => "index",
            Self::Cash(_) => "cash",
            Self::Future(_) => "future",
            Self::Bond(_) => "bond",
        }
    }
}
