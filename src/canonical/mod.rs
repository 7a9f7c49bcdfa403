//! Canonical schema & identity (C1), deterministic hashing (C2), and
//! calendar/session semantics (C3). These three are grouped together
//! because every other component depends on them: the record schema and
//! its identifiers, the single hashing routine every content hash must go
//! through, and the rules that turn a trading date into a canonical UTC
//! timestamp.

pub mod calendar;
pub mod hash;
pub mod ids;
pub mod record;

pub use calendar::{derive_ts, DerivedTimestamp, Mic, SessionRule, SessionRulesTable, VenueCalendar};
pub use hash::{canonical_json, content_hash, to_canonical_value};
pub use ids::{Currency, InstrumentId, MarketDataId};
pub use record::{AdjustmentBasis, BarRecord, FixingConvention, PointRecord, QualityFlag, RecordMeta, Source, TsProvenance};
