//! Instruments domain model (C7): typed specs, positions, portfolio
//! snapshots with canonical ordering. Construction-only validation; no
//! pricing or risk behavior lives here.

pub mod instrument;
pub mod portfolio;
pub mod position;
pub mod spec;

pub use instrument::{Instrument, InstrumentType};
pub use portfolio::Portfolio;
pub use position::Position;
pub use spec::{BondSpec, CashSpec, EquitySpec, FutureSpec, IndexSpec, InstrumentSpec};
