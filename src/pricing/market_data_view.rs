//! Read-only market-data protocol pricing depends on (spec §4.8). Pricing
//! never touches storage or the access service directly; it only ever sees
//! this trait, so it is trivially testable against an in-memory fixture.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::canonical::ids::MarketDataId;
use crate::canonical::QualityFlag;
use crate::error::PricingError;

/// A single observed value plus whatever soft-quality metadata travels
/// with it. Quality flags propagate into `PositionValuation.warnings`
/// without ever altering the numeric value itself (spec §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketPoint {
    pub value: f64,
    pub meta: Option<BTreeSet<QualityFlag>>,
}

/// Read-only view over aligned market data. Implemented by
/// [`crate::access::bundle::TimeSeriesBundle`] for production use and by
/// simple in-memory maps in tests.
pub trait MarketDataView {
    fn get_value(
        &self,
        asset: &MarketDataId,
        field: &str,
        as_of: NaiveDate,
    ) -> Result<f64, PricingError>;

    fn has_value(&self, asset: &MarketDataId, field: &str, as_of: NaiveDate) -> bool;

    fn get_point(
        &self,
        asset: &MarketDataId,
        field: &str,
        as_of: NaiveDate,
    ) -> Result<MarketPoint, PricingError> {
        let value = self.get_value(asset, field, as_of)?;
        Ok(MarketPoint { value, meta: None })
    }
}
