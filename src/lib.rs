//! QuantLab: a layered quantitative analytics framework over a
//! deterministic, content-hash-addressed canonical data contract.
//!
//! - [`canonical`] — schema & identity (C1), deterministic hashing
//!   (C2), calendar & session semantics (C3).
//! - [`ingestion`] — provider boundary and the fetch/normalize/validate
//!   runner (C4).
//! - [`storage`] — raw/canonical zones and the dataset registry (C5).
//! - [`access`] — aligned, cached, reproducible time-series bundles
//!   (C6), the one path pricing and risk read market data through.
//! - [`instruments`] — instrument, position, and portfolio domain model
//!   (C7).
//! - [`pricing`] — linear mark-to-market valuation and FX policy (C8).
//! - [`risk`] — returns, covariance, drawdown, historical VaR/ES,
//!   exposure and variance attribution (C9).
//! - [`stress`] — scenario sets and linear shock revaluation (C10).
//! - [`report`] — cross-subsystem lineage and canonical-JSON report
//!   assembly (C11).

pub mod access;
pub mod canonical;
pub mod error;
pub mod ingestion;
pub mod instruments;
pub mod pricing;
pub mod report;
pub mod risk;
pub mod storage;
pub mod stress;

pub use error::{QuantLabError, QuantLabResult};
