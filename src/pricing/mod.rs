//! Pricing engine (C8): linear mark-to-market valuation driven entirely
//! through [`market_data_view::MarketDataView`], plus the MVP FX policy.
//! No nonlinear derivative pricing and no margining/roll (spec §1).

pub mod engine;
pub mod fx;
pub mod market_data_view;
pub mod pricer;

pub use engine::{PortfolioValuation, PositionValuation, ValuationEngine};
pub use fx::{resolve_effective_rate, EffectiveFxRate};
pub use market_data_view::{MarketDataView, MarketPoint};
pub use pricer::{NativeValuation, Pricer, PricerRegistry};
