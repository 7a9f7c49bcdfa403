//! Access-service request shape (spec §4.6): the inputs
//! `AccessService::get_timeseries` needs, plus the deterministic
//! request-hash every cache lookup and manifest keys off of. Hashing
//! goes through the same [`crate::canonical::content_hash`] used
//! everywhere else — assets and fields are sorted at construction so two
//! requests differing only in list order hash identically.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::content_hash;
use crate::error::HashError;

/// How a missing observation on an otherwise-valid session date is
/// handled once the provider series has been reindexed onto the target
/// calendar index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingDataPolicy {
    /// Leave the gap as `None`; callers decide what to do with it.
    NanOk,
    /// Drop the date from the bundle's index entirely, for every asset.
    DropDates,
    /// Fail the whole request.
    Error,
}

/// Which observation wins when a provider returns more than one value
/// for the same `(asset, field, date)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateDiscipline {
    Last,
    First,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub duplicate_discipline: DuplicateDiscipline,
    pub reject_nonpositive_prices: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            duplicate_discipline: DuplicateDiscipline::Last,
            reject_nonpositive_prices: true,
        }
    }
}

/// Jump/outlier guardrails applied to raw returns before the bundle is
/// handed back (spec §4.6 step 5). Thresholds, not corrections: a
/// flagged value is never altered, only annotated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuardrailPolicy {
    /// Absolute single-period simple return beyond which a date is
    /// flagged `SUSPECT_CORP_ACTION`.
    pub corp_action_jump_threshold: f64,
    /// Optional hard ceiling on absolute return; breaching it flags
    /// `OUTLIER_RETURN`. `None` disables the check.
    pub max_abs_return: Option<f64>,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            corp_action_jump_threshold: 0.40,
            max_abs_return: None,
        }
    }
}

/// One aligned-bundle request: which assets and fields, over which
/// calendar window, under which missing-data and validation rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRequest {
    /// Canonical `MarketDataId` keys, e.g. `"AAPL@XNAS"`. Sorted and
    /// deduplicated by [`TimeSeriesRequest::new`].
    pub assets: Vec<String>,
    /// Field names, e.g. `"close"`. Sorted and deduplicated.
    pub fields: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub calendar: String,
    pub missing_data_policy: MissingDataPolicy,
    pub validation_policy: ValidationPolicy,
    pub guardrails: GuardrailPolicy,
    /// Point-in-time cutoff for anti-look-ahead: a provider observation
    /// with no `as_of` concept simply ignores this field.
    pub as_of: Option<DateTime<Utc>>,
}

impl TimeSeriesRequest {
    pub fn new(
        assets: Vec<String>,
        fields: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
        calendar: impl Into<String>,
        missing_data_policy: MissingDataPolicy,
        validation_policy: ValidationPolicy,
        guardrails: GuardrailPolicy,
        as_of: Option<DateTime<Utc>>,
    ) -> Self {
        let assets: BTreeSet<String> = assets.into_iter().collect();
        let fields: BTreeSet<String> = fields.into_iter().collect();
        Self {
            assets: assets.into_iter().collect(),
            fields: fields.into_iter().collect(),
            start,
            end,
            calendar: calendar.into(),
            missing_data_policy,
            validation_policy,
            guardrails,
            as_of,
        }
    }

    /// Deterministic fingerprint of this request, stable under asset/field
    /// reordering since both are canonicalized in `new`.
    pub fn request_hash(&self) -> Result<String, HashError> {
        content_hash(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(assets: Vec<&str>, fields: Vec<&str>) -> TimeSeriesRequest {
        TimeSeriesRequest::new(
            assets.into_iter().map(String::from).collect(),
            fields.into_iter().map(String::from).collect(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            "XNYS",
            MissingDataPolicy::NanOk,
            ValidationPolicy::default(),
            GuardrailPolicy::default(),
            None,
        )
    }

    #[test]
    fn request_hash_is_stable_under_asset_and_field_reordering() {
        let a = req(vec!["AAPL", "MSFT"], vec!["close", "volume"]);
        let b = req(vec!["MSFT", "AAPL"], vec!["volume", "close"]);
        assert_eq!(a.request_hash().unwrap(), b.request_hash().unwrap());
    }

    #[test]
    fn different_windows_hash_differently() {
        let a = req(vec!["AAPL"], vec!["close"]);
        let mut b = req(vec!["AAPL"], vec!["close"]);
        b.end = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_ne!(a.request_hash().unwrap(), b.request_hash().unwrap());
    }

    #[test]
    fn duplicate_assets_collapse_in_new() {
        let r = req(vec!["AAPL", "AAPL"], vec!["close"]);
        assert_eq!(r.assets, vec!["AAPL".to_string()]);
    }
}
