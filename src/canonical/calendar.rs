//! Calendar & session semantics (C3).
//!
//! Derives a canonical UTC `ts` for an end-of-day record from a fixed
//! hierarchy of sources (spec §4.3): per-venue session rules first, then a
//! baseline venue calendar close, then the provider's own timestamp as a
//! last resort. Every step also yields the `TsProvenance` tag and, when the
//! provider disagrees with the calendar about whether a venue was open,
//! a `CALENDAR_CONFLICT` flag rather than a dropped record.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::canonical::record::{QualityFlag, TsProvenance};
use crate::error::CalendarError;

/// Market Identifier Code, e.g. `"XNYS"`, `"XLON"`.
pub type Mic = String;

/// Per-MIC trading calendar: which local dates are trading days, and the
/// regular/early-close local time for each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueCalendar {
    pub mic: Mic,
    pub timezone: String,
    pub trading_days: std::collections::BTreeSet<NaiveDate>,
    pub regular_close_local: NaiveTime,
    pub early_closes: std::collections::BTreeMap<NaiveDate, NaiveTime>,
}

impl VenueCalendar {
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.trading_days.contains(&date)
    }

    /// Trading-day sequence in `[start, end]`, inclusive, ascending, unique —
    /// the target index the access service reindexes provider series onto.
    pub fn sessions(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.trading_days
            .range(start..=end)
            .copied()
            .collect()
    }

    fn close_local(&self, date: NaiveDate) -> Option<NaiveTime> {
        if !self.is_trading_day(date) {
            return None;
        }
        Some(
            self.early_closes
                .get(&date)
                .copied()
                .unwrap_or(self.regular_close_local),
        )
    }

    fn close_utc(&self, date: NaiveDate) -> Result<Option<DateTime<Utc>>, CalendarError> {
        let Some(local_close) = self.close_local(date) else {
            return Ok(None);
        };
        let tz: Tz = self
            .timezone
            .parse()
            .map_err(|_| CalendarError::MissingSessionRule {
                mic: self.mic.clone(),
                date: date.to_string(),
            })?;
        let naive = date.and_time(local_close);
        let local = tz
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| CalendarError::MissingSessionRule {
                mic: self.mic.clone(),
                date: date.to_string(),
            })?;
        Ok(Some(local.with_timezone(&Utc)))
    }
}

/// A single MIC's entry in the session-rules table: the regular close time
/// to use, valid over an explicit date range (rules can change over time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRule {
    pub mic: Mic,
    pub regular_close_local: NaiveTime,
    pub timezone: String,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}

impl SessionRule {
    fn covers(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_to.map(|to| date <= to).unwrap_or(true)
    }

    fn close_utc(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        let tz: Tz = self
            .timezone
            .parse()
            .map_err(|_| CalendarError::MissingSessionRule {
                mic: self.mic.clone(),
                date: date.to_string(),
            })?;
        let naive = date.and_time(self.regular_close_local);
        tz.from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| CalendarError::MissingSessionRule {
                mic: self.mic.clone(),
                date: date.to_string(),
            })
    }
}

/// Table of per-MIC session rules, possibly several entries per MIC across
/// different validity windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRulesTable {
    pub rules: Vec<SessionRule>,
}

impl SessionRulesTable {
    fn find(&self, mic: &str, date: NaiveDate) -> Option<&SessionRule> {
        self.rules
            .iter()
            .find(|r| r.mic == mic && r.covers(date))
    }
}

/// The outcome of deriving a canonical `ts` for one EOD observation.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTimestamp {
    pub ts: DateTime<Utc>,
    pub provenance: TsProvenance,
    pub flags: Vec<QualityFlag>,
}

/// Implements the three-step derivation hierarchy from spec §4.3:
///
/// 1. `SessionRules` close for the MIC on `trading_date_local` -> UTC;
///    provenance `EXCHANGE_CLOSE`.
/// 2. Baseline calendar close -> UTC; provenance `EXCHANGE_CLOSE` (source =
///    baseline).
/// 3. Provider timestamp, preserved as UTC; provenance `PROVIDER_EOD` plus
///    flag `PROVIDER_TIMESTAMP_USED`.
///
/// Calendar conflicts — a provider bar on a day the calendar says is
/// closed, or no bar on a day the calendar says is open — never drop the
/// record; they attach `CALENDAR_CONFLICT` to whichever timestamp was
/// derived.
pub fn derive_ts(
    mic: &str,
    trading_date_local: NaiveDate,
    session_rules: &SessionRulesTable,
    baseline: Option<&VenueCalendar>,
    provider_ts: Option<DateTime<Utc>>,
) -> Result<DerivedTimestamp, CalendarError> {
    let mut flags = Vec::new();

    let calendar_says_open = baseline.map(|c| c.is_trading_day(trading_date_local));
    if let Some(false) = calendar_says_open {
        flags.push(QualityFlag::CalendarConflict);
    }

    if let Some(rule) = session_rules.find(mic, trading_date_local) {
        return Ok(DerivedTimestamp {
            ts: rule.close_utc(trading_date_local)?,
            provenance: TsProvenance::ExchangeClose,
            flags,
        });
    }

    if let Some(calendar) = baseline {
        if let Some(ts) = calendar.close_utc(trading_date_local)? {
            return Ok(DerivedTimestamp {
                ts,
                provenance: TsProvenance::ExchangeClose,
                flags,
            });
        }
        // Calendar says this is not a trading day but we were asked to
        // derive a timestamp anyway (a provider bar exists): flag it.
        if !flags.contains(&QualityFlag::CalendarConflict) {
            flags.push(QualityFlag::CalendarConflict);
        }
    }

    match provider_ts {
        Some(ts) => {
            flags.push(QualityFlag::ProviderTimestampUsed);
            Ok(DerivedTimestamp {
                ts,
                provenance: TsProvenance::ProviderEod,
                flags,
            })
        }
        None => Err(CalendarError::MissingSessionRule {
            mic: mic.to_string(),
            date: trading_date_local.to_string(),
        }),
    }
}
