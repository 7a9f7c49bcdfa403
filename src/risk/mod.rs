//! Risk engine (C9): return builders, sample covariance, drawdown,
//! tracking error, historical VaR/ES, exposure and variance attribution,
//! assembled into a typed, deterministic `RiskReport`.

pub mod attribution;
pub mod covariance;
pub mod drawdown;
pub mod engine;
pub mod exposure;
pub mod request;
pub mod returns;
pub mod var_es;

pub use attribution::{variance_attribution, AttributionResult};
pub use covariance::{
    correlation_from_covariance, sample_covariance, CorrelationMatrix, CovarianceDiagnostics, CovarianceResult,
};
pub use drawdown::{compute_drawdown, DrawdownSeries};
pub use engine::{AssetSeries, InputLineage, RiskEngine, RiskInput, RiskMetrics, RiskReport};
pub use exposure::{compute_exposures, ExposureReport};
pub use request::{
    CovarianceEstimator, InputMode, InsufficientSamplePolicy, MissingDataPolicy, ReturnDefinition, RiskRequest,
    RiskWindow,
};
pub use returns::{build_return_series, ReturnSeries};
pub use var_es::{historical_var_es, VarEsResult};
