//! Stress engine (C10): linear scenario revaluation over a portfolio,
//! with explicit convention handling and no claim to statistical
//! likelihood (spec §4.10, §1 non-goals).

pub mod engine;
pub mod scenario;
pub mod shock;

pub use engine::{
    MissingShockPolicy, PositionMarketState, ScenarioResult, StressEngine, StressInput,
    StressReport, StressSummary,
};
pub use scenario::{Scenario, ScenarioKind, ScenarioSet, ShockConvention};
pub use shock::apply_shock;
