use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::canonical::ids::InstrumentId;
use crate::canonical::{content_hash, HashError};
use crate::error::InstrumentError;
use crate::instruments::position::Position;

/// An immutable portfolio snapshot: positions plus cash balances, as of an
/// explicit point in time.
///
/// Canonical order (spec §3): positions sorted by `instrument_id`, cash
/// keys uppercased and sorted — both achieved here by storing them in
/// `BTreeMap`/sorted-`Vec` form so canonical serialization never depends on
/// construction order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub schema_version: u32,
    /// Must carry an explicit UTC offset; naive timestamps are rejected.
    pub as_of: DateTime<FixedOffset>,
    positions: Vec<Position>,
    /// Currency code (already uppercased by construction) -> balance.
    cash: BTreeMap<String, f64>,
    pub meta: Option<serde_json::Value>,
}

impl Portfolio {
    pub fn new(
        schema_version: u32,
        as_of: DateTime<FixedOffset>,
        positions: Vec<Position>,
        cash: BTreeMap<String, f64>,
        meta: Option<serde_json::Value>,
    ) -> Result<Self, InstrumentError> {
        // `as_of: DateTime<FixedOffset>` rejects naive timestamps at the
        // type level: there is no way to construct one without an offset,
        // so deserializing an offset-less string already fails upstream.
        let mut seen = BTreeSet::new();
        for p in &positions {
            if !seen.insert(p.instrument_id.clone()) {
                return Err(InstrumentError::DuplicatePosition(
                    p.instrument_id.to_string(),
                ));
            }
        }

        let mut sorted_positions = positions;
        sorted_positions.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));

        let mut normalized_cash = BTreeMap::new();
        for (ccy, value) in cash {
            if !value.is_finite() {
                return Err(InstrumentError::InvalidCashBalance {
                    currency: ccy,
                    value,
                });
            }
            normalized_cash.insert(ccy.to_uppercase(), value);
        }

        Ok(Self {
            schema_version,
            as_of,
            positions: sorted_positions,
            cash: normalized_cash,
            meta,
        })
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn cash(&self) -> &BTreeMap<String, f64> {
        &self.cash
    }

    pub fn position_for(&self, instrument_id: &InstrumentId) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| &p.instrument_id == instrument_id)
    }

    /// `content_hash(Portfolio)` per spec §4.9 step 12 — the portfolio
    /// snapshot hash used in risk/stress report lineage.
    pub fn snapshot_hash(&self) -> Result<String, HashError> {
        content_hash(self)
    }
}
