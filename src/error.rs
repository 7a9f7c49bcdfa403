use thiserror::Error;

/// Crate-wide result alias.
pub type QuantLabResult<T> = Result<T, QuantLabError>;

/// Top-level error type. Each variant wraps a subsystem-specific error enum
/// so callers can match on the subsystem first and the concrete failure
/// second, without collapsing the distinctions between input/schema,
/// identity/lineage, data-quality, provider/transport, storage/registry,
/// pricing, and risk/stress failures.
#[derive(Debug, Error)]
pub enum QuantLabError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error(transparent)]
    Stress(#[from] StressError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// C1 — canonical record / identifier construction failures.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("invalid instrument id '{0}': must be 1-64 characters with no whitespace")]
    InvalidInstrumentId(String),

    #[error("invalid currency code '{0}': must be three uppercase ISO-4217 letters")]
    InvalidCurrency(String),

    #[error("field '{field}' must be finite, got {value}")]
    NonFinite { field: String, value: f64 },

    #[error("field '{field}' must be positive, got {value}")]
    NonPositive { field: String, value: f64 },

    #[error("timestamp field '{field}' must carry an explicit UTC offset")]
    NaiveTimestamp { field: String },

    #[error(
        "asof_ts ({asof_ts}) must be >= ts_source_date ({ts_source_date}) for record {instrument_id}"
    )]
    AsofBeforeSourceDate {
        instrument_id: String,
        asof_ts: String,
        ts_source_date: String,
    },

    #[error(
        "OHLC inconsistency for {instrument_id} at {ts}: high={high} low={low} open={open} close={close}"
    )]
    OhlcInconsistent {
        instrument_id: String,
        ts: String,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("negative volume {0} for field 'volume'")]
    NegativeVolume(f64),

    #[error("quantity for '{instrument_id}' must be finite and >= 0, got {quantity}")]
    InvalidQuantity { instrument_id: String, quantity: f64 },

    #[error("missing required field '{0}'")]
    MissingField(String),
}

/// C2 — deterministic hashing / canonicalization failures.
#[derive(Debug, Clone, Error)]
pub enum HashError {
    #[error("cannot canonicalize non-finite number in field '{0}'")]
    NonFiniteNumber(String),

    #[error("canonical JSON serialization failed: {0}")]
    Serialization(String),
}

/// C3 — calendar / session semantics failures.
#[derive(Debug, Clone, Error)]
pub enum CalendarError {
    #[error("no session rule found for venue '{mic}' on {date}")]
    MissingSessionRule { mic: String, date: String },

    #[error("calendar conflict for {instrument_id} on {date}: {detail}")]
    Conflict {
        instrument_id: String,
        date: String,
        detail: String,
    },

    #[error("session rules table has no entry valid for '{mic}' at {date}")]
    NoValidRuleForDate { mic: String, date: String },
}

/// C4 — provider boundary and ingestion pipeline failures.
#[derive(Debug, Clone, Error)]
pub enum IngestionError {
    #[error("provider fetch failed for dataset '{dataset_id}': {detail}")]
    ProviderFetch { dataset_id: String, detail: String },

    #[error("normalization failed for dataset '{dataset_id}': {detail}")]
    Normalization { dataset_id: String, detail: String },

    #[error("validation failed with {hard_error_count} hard error(s): {detail}")]
    Validation {
        hard_error_count: usize,
        detail: String,
    },

    #[error("fixture adapter could not read '{path}': {detail}")]
    FixtureRead { path: String, detail: String },
}

/// C5 — storage zone and registry failures.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("failed to write to raw zone at '{path}': {detail}")]
    RawWrite { path: String, detail: String },

    #[error(
        "failed to publish canonical snapshot for ({dataset_id}, {dataset_version}): {detail}"
    )]
    CanonicalPublish {
        dataset_id: String,
        dataset_version: String,
        detail: String,
    },

    #[error(
        "registry conflict: ({dataset_id}, {dataset_version}) already registered with a different content hash"
    )]
    RegistryConflict {
        dataset_id: String,
        dataset_version: String,
    },

    #[error(
        "canonical snapshot ({dataset_id}, {dataset_version}) is already published with different content and cannot be overwritten in place"
    )]
    SnapshotOverwrite {
        dataset_id: String,
        dataset_version: String,
    },

    #[error("no registry entry found for ({dataset_id}, {dataset_version})")]
    RegistryEntryNotFound {
        dataset_id: String,
        dataset_version: String,
    },

    #[error(
        "integrity check failed for ({dataset_id}, {dataset_version}): expected content_hash {expected}, found {actual}"
    )]
    IntegrityMismatch {
        dataset_id: String,
        dataset_version: String,
        expected: String,
        actual: String,
    },

    #[error("underlying IO error: {0}")]
    Io(String),
}

/// C6 — access-service failures.
#[derive(Debug, Clone, Error)]
pub enum AccessError {
    #[error("no symbol mapping for asset '{0}'")]
    UnmappedAsset(String),

    #[error("required field missing for asset '{asset}' on {date}")]
    MissingRequiredField { asset: String, date: String },

    #[error("duplicate date {date} for asset '{asset}' could not be resolved under policy ERROR")]
    UnresolvedDuplicate { asset: String, date: String },

    #[error("non-monotonic or non-unique index detected for asset '{0}'")]
    IndexInvariantViolated(String),

    #[error("non-positive price {value} for asset '{asset}' on {date}")]
    NonPositivePrice {
        asset: String,
        date: String,
        value: f64,
    },

    #[error("manifest corrupted or unreadable at '{path}': {detail}")]
    ManifestCorrupt { path: String, detail: String },

    #[error("provider '{provider}' fetch failed: {detail}")]
    ProviderFetch { provider: String, detail: String },

    #[error("calendar '{calendar}' has no trading sessions between {start} and {end}")]
    NoTradingSessions {
        calendar: String,
        start: String,
        end: String,
    },

    #[error("cache io error at '{path}': {detail}")]
    CacheIo { path: String, detail: String },
}

/// C7 — instrument / position / portfolio construction failures.
#[derive(Debug, Clone, Error)]
pub enum InstrumentError {
    #[error("instrument_type '{instrument_type}' does not match spec kind '{spec_kind}'")]
    TypeSpecMismatch {
        instrument_type: String,
        spec_kind: String,
    },

    #[error("instrument '{0}' requires a market_data_id but none was supplied")]
    MissingMarketDataId(String),

    #[error("cash instrument '{0}' requires a currency but none was supplied")]
    MissingCurrency(String),

    #[error("future '{instrument_id}' multiplier must be finite and > 0, got {multiplier}")]
    InvalidMultiplier {
        instrument_id: String,
        multiplier: f64,
    },

    #[error("future '{0}' requires an expiry date")]
    MissingExpiry(String),

    #[error("bond '{0}' requires a maturity date")]
    MissingMaturity(String),

    #[error("duplicate position for instrument '{0}' in portfolio")]
    DuplicatePosition(String),

    #[error("cash balance for '{currency}' must be finite, got {value}")]
    InvalidCashBalance { currency: String, value: f64 },
}

/// C8 — pricing engine failures.
#[derive(Debug, Clone, Error)]
pub enum PricingError {
    #[error("no price for asset '{asset}' field '{field}' as of {as_of}")]
    MissingPrice {
        asset: String,
        field: String,
        as_of: String,
    },

    #[error("no FX rate for '{pair}' as of {as_of}")]
    MissingFxRate { pair: String, as_of: String },

    #[error("currency '{0}' is not supported by the MVP FX policy (only EUR/USD)")]
    UnsupportedCurrency(String),

    #[error("non-finite input encountered while pricing '{instrument_id}': {detail}")]
    NonFiniteInput {
        instrument_id: String,
        detail: String,
    },

    #[error("invalid FX rate {rate} for '{pair}' as of {as_of}: must be finite and positive")]
    InvalidFxRate {
        pair: String,
        as_of: String,
        rate: f64,
    },

    #[error("no pricer registered for instrument kind '{0}'")]
    MissingPricer(String),
}

/// C9 — risk engine failures.
#[derive(Debug, Clone, Error)]
pub enum RiskError {
    #[error("market data id '{0}' from the portfolio is not present in the supplied bundle")]
    AssetNotInBundle(String),

    #[error("look-ahead violation: data at {data_date} used for as_of {as_of}")]
    LookAhead { as_of: String, data_date: String },

    #[error("insufficient sample size: need >= {required}, got {actual}")]
    InsufficientSampleSize { required: usize, actual: usize },

    #[error("non-finite return encountered for asset '{asset}' on {date}")]
    NonFiniteReturn { asset: String, date: String },

    #[error("missing data for asset '{asset}' on {date} under policy ERROR")]
    MissingDataError { asset: String, date: String },

    #[error("as_of ({as_of}) is after the requested window end ({window_end})")]
    AsOfAfterWindowEnd { as_of: String, window_end: String },
}

/// C10 — stress engine failures.
#[derive(Debug, Clone, Error)]
pub enum StressError {
    #[error("missing market state price for asset '{0}' held in the portfolio")]
    MissingMarketState(String),

    #[error("invalid scenario '{scenario_id}': {detail}")]
    InvalidScenario { scenario_id: String, detail: String },

    #[error(
        "shocked price for '{asset}' would be non-positive ({shocked_price}) under convention {convention}"
    )]
    NonPositiveShockedPrice {
        asset: String,
        shocked_price: f64,
        convention: String,
    },

    #[error("duplicate scenario_id '{0}' in scenario set")]
    DuplicateScenarioId(String),
}

/// C11 — report assembly & lineage failures.
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("io error writing report to '{path}': {detail}")]
    Io { path: String, detail: String },

    #[error("report has no sections to assemble: pricing, risk, and stress are all absent")]
    EmptyReport,
}
