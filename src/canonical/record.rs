//! Canonical record schema (C1): `BarRecord`, `PointRecord`, and the shared
//! metadata / quality-flag vocabulary every canonical record carries.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::canonical::ids::{Currency, InstrumentId};
use crate::error::SchemaError;

/// How a canonical record's `ts` was derived. See `calendar.rs` for the
/// derivation hierarchy this enum records the outcome of.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum TsProvenance {
    #[strum(serialize = "EXCHANGE_CLOSE")]
    ExchangeClose,
    #[strum(serialize = "FIXING_TIME")]
    FixingTime,
    #[strum(serialize = "PROVIDER_EOD")]
    ProviderEod,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

/// Stable quality-flag vocabulary (spec §3). Kept as a closed enum rather
/// than a free-form string so producers cannot silently invent new codes
/// that downstream consumers don't know how to interpret.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum QualityFlag {
    #[strum(serialize = "MISSING_VALUE")]
    MissingValue,
    #[strum(serialize = "DUPLICATE_RESOLVED")]
    DuplicateResolved,
    #[strum(serialize = "OUTLIER_RETURN")]
    OutlierReturn,
    #[strum(serialize = "SUSPECT_CORP_ACTION")]
    SuspectCorpAction,
    #[strum(serialize = "NONPOSITIVE_PRICE")]
    NonpositivePrice,
    #[strum(serialize = "NONMONOTONIC_INDEX")]
    NonmonotonicIndex,
    #[strum(serialize = "STALE")]
    Stale,
    #[strum(serialize = "PROVIDER_TIMESTAMP_USED")]
    ProviderTimestampUsed,
    #[strum(serialize = "ADJUSTED_PRICE_PRESENT")]
    AdjustedPricePresent,
    #[strum(serialize = "IMPUTED")]
    Imputed,
    #[strum(serialize = "CALENDAR_CONFLICT")]
    CalendarConflict,
}

/// Identifies the provider/endpoint a record came from, for lineage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Source {
    pub provider: String,
    pub endpoint: String,
    pub provider_dataset: Option<String>,
}

/// Fields common to every canonical record, regardless of kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub dataset_id: String,
    pub schema_version: u32,
    pub dataset_version: String,
    pub instrument_id: InstrumentId,
    /// Canonical, UTC-aware observation timestamp.
    pub ts: DateTime<Utc>,
    /// Instant at which the observation became known to the system;
    /// must be `>= ts_source_date`.
    pub asof_ts: DateTime<Utc>,
    pub ts_provenance: TsProvenance,
    pub source: Source,
    pub ingest_run_id: String,
    pub quality_flags: BTreeSet<QualityFlag>,
    pub trading_date_local: Option<chrono::NaiveDate>,
    pub timezone_local: Option<String>,
    pub currency: Option<Currency>,
}

impl RecordMeta {
    /// Validates the invariants `spec.md` §3 assigns to every canonical
    /// record's metadata: `asof_ts >= ts_source_date` where the source date
    /// is the UTC calendar date of `ts`.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let ts_source_date = self.ts.date_naive();
        if self.asof_ts.date_naive() < ts_source_date {
            return Err(SchemaError::AsofBeforeSourceDate {
                instrument_id: self.instrument_id.to_string(),
                asof_ts: self.asof_ts.to_rfc3339(),
                ts_source_date: ts_source_date.to_string(),
            });
        }
        Ok(())
    }
}

/// How an adjusted close was derived, when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum AdjustmentBasis {
    #[strum(serialize = "SPLIT_ONLY")]
    SplitOnly,
    #[strum(serialize = "SPLIT_AND_DIVIDEND")]
    SplitAndDividend,
    #[strum(serialize = "NONE")]
    None,
}

/// An end-of-day OHLCV bar, plus the common record metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
    pub adj_close: Option<f64>,
    pub adjustment_basis: Option<AdjustmentBasis>,
}

impl BarRecord {
    /// Validates the hard OHLC rules from spec §3: all present prices
    /// finite and strictly positive; `high >= max(open,close)`,
    /// `low <= min(open,close)`, `high >= low`; `volume >= 0` if present.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.meta.validate()?;

        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("adj_close", self.adj_close),
        ] {
            if let Some(v) = value {
                check_finite_positive(name, v)?;
            }
        }
        check_finite_positive("close", Some(self.close))?;

        if let Some(v) = self.volume {
            if !v.is_finite() {
                return Err(SchemaError::NonFinite {
                    field: "volume".to_string(),
                    value: v,
                });
            }
            if v < 0.0 {
                return Err(SchemaError::NegativeVolume(v));
            }
        }

        if let (Some(open), Some(high), Some(low)) = (self.open, self.high, self.low) {
            let hi_bound = open.max(self.close);
            let lo_bound = open.min(self.close);
            if high < hi_bound || low > lo_bound || high < low {
                return Err(SchemaError::OhlcInconsistent {
                    instrument_id: self.meta.instrument_id.to_string(),
                    ts: self.meta.ts.to_rfc3339(),
                    open,
                    high,
                    low,
                    close: self.close,
                });
            }
        }

        Ok(())
    }
}

fn check_finite_positive(field: &str, value: Option<f64>) -> Result<(), SchemaError> {
    let Some(v) = value else { return Ok(()) };
    if !v.is_finite() {
        return Err(SchemaError::NonFinite {
            field: field.to_string(),
            value: v,
        });
    }
    if v <= 0.0 {
        return Err(SchemaError::NonPositive {
            field: field.to_string(),
            value: v,
        });
    }
    Ok(())
}

/// Convention under which a fixing/point observation was sampled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixingConvention(pub String);

/// A non-OHLC scalar observation: an FX fixing, a macro print, a reference
/// rate — anything keyed by `(field, base_ccy, quote_ccy)` rather than an
/// OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub field: String,
    pub value: f64,
    pub base_ccy: Currency,
    pub quote_ccy: Currency,
    pub fixing_convention: Option<FixingConvention>,
}

impl PointRecord {
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.meta.validate()?;
        check_finite_positive("value", Some(self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(instrument_id: &str, ts: DateTime<Utc>, asof_ts: DateTime<Utc>) -> RecordMeta {
        RecordMeta {
            dataset_id: "eod.equity".to_string(),
            schema_version: 1,
            dataset_version: "2024-01-02T00".to_string(),
            instrument_id: InstrumentId::new(instrument_id).unwrap(),
            ts,
            asof_ts,
            ts_provenance: TsProvenance::ExchangeClose,
            source: Source {
                provider: "fixture".to_string(),
                endpoint: "bars".to_string(),
                provider_dataset: None,
            },
            ingest_run_id: "run-1".to_string(),
            quality_flags: BTreeSet::new(),
            trading_date_local: None,
            timezone_local: None,
            currency: Some(Currency::USD),
        }
    }

    #[test]
    fn valid_bar_passes() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let bar = BarRecord {
            meta: meta("EQ.AAPL", ts, ts),
            open: Some(100.0),
            high: Some(102.0),
            low: Some(99.0),
            close: 101.0,
            volume: Some(1_000.0),
            adj_close: None,
            adjustment_basis: None,
        };
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn ohlc_inconsistency_is_rejected() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let bar = BarRecord {
            meta: meta("EQ.AAPL", ts, ts),
            open: Some(100.0),
            high: Some(99.0), // high below open -> inconsistent
            low: Some(95.0),
            close: 98.0,
            volume: None,
            adj_close: None,
            adjustment_basis: None,
        };
        assert!(matches!(
            bar.validate(),
            Err(SchemaError::OhlcInconsistent { .. })
        ));
    }

    #[test]
    fn nonpositive_close_is_rejected() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let bar = BarRecord {
            meta: meta("EQ.AAPL", ts, ts),
            open: None,
            high: None,
            low: None,
            close: 0.0,
            volume: None,
            adj_close: None,
            adjustment_basis: None,
        };
        assert!(matches!(
            bar.validate(),
            Err(SchemaError::NonPositive { .. })
        ));
    }

    #[test]
    fn asof_before_source_date_is_rejected() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let asof = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bar = BarRecord {
            meta: meta("EQ.AAPL", ts, asof),
            open: Some(1.0),
            high: Some(1.0),
            low: Some(1.0),
            close: 1.0,
            volume: None,
            adj_close: None,
            adjustment_basis: None,
        };
        assert!(matches!(
            bar.validate(),
            Err(SchemaError::AsofBeforeSourceDate { .. })
        ));
    }
}
