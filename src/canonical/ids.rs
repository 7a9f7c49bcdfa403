use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Identifier for a tradable or reference instrument, e.g. `"EQ.AAPL"`,
/// `"IDX.SPX"`, `"CASH.USD"`, `"FUT.ES"`, `"BOND.US10Y"`.
///
/// Non-empty, 1-64 characters, no whitespace. The namespace prefixes above
/// are recommended, not enforced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(raw: impl Into<String>) -> Result<Self, SchemaError> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > 64 || raw.chars().any(char::is_whitespace) {
            return Err(SchemaError::InvalidInstrumentId(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for InstrumentId {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InstrumentId> for String {
    fn from(value: InstrumentId) -> Self {
        value.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque, stable identifier for a market-data series, structurally
/// `(symbol, venue?)`. Distinct from [`InstrumentId`]: an instrument may
/// reference zero or one `MarketDataId` (cash never does; a non-tradable
/// index may not).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketDataId {
    symbol: String,
    venue: Option<String>,
}

impl MarketDataId {
    pub fn new(symbol: impl Into<String>, venue: Option<String>) -> Result<Self, SchemaError> {
        let symbol = symbol.into();
        if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
            return Err(SchemaError::InvalidInstrumentId(symbol));
        }
        Ok(Self { symbol, venue })
    }

    /// Convenience constructor for bare symbols with no venue qualifier,
    /// e.g. the canonical FX series `"FX.EURUSD"`.
    pub fn bare(symbol: impl Into<String>) -> Result<Self, SchemaError> {
        Self::new(symbol, None)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn venue(&self) -> Option<&str> {
        self.venue.as_deref()
    }

    /// Stable string rendering used as a map/column key and in canonical
    /// serialization: `"SYMBOL"` or `"SYMBOL@VENUE"`.
    pub fn as_canonical_key(&self) -> String {
        match &self.venue {
            Some(v) => format!("{}@{}", self.symbol, v),
            None => self.symbol.clone(),
        }
    }
}

impl fmt::Display for MarketDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_canonical_key())
    }
}

/// Three-letter uppercase ISO-4217 currency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub fn new(code: &str) -> Result<Self, SchemaError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(SchemaError::InvalidCurrency(code.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: constructed only from validated ASCII-uppercase bytes.
        std::str::from_utf8(&self.0).expect("Currency always holds valid ASCII")
    }

    pub const USD: Currency = Currency([b'U', b'S', b'D']);
    pub const EUR: Currency = Currency([b'E', b'U', b'R']);
}

impl TryFrom<String> for Currency {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_id_rejects_whitespace_and_empty() {
        assert!(InstrumentId::new("EQ.AAPL").is_ok());
        assert!(InstrumentId::new("").is_err());
        assert!(InstrumentId::new("EQ AAPL").is_err());
        assert!(InstrumentId::new("x".repeat(65)).is_err());
    }

    #[test]
    fn market_data_id_canonical_key() {
        let id = MarketDataId::new("AAPL", Some("XNAS".to_string())).unwrap();
        assert_eq!(id.as_canonical_key(), "AAPL@XNAS");
        let bare = MarketDataId::bare("FX.EURUSD").unwrap();
        assert_eq!(bare.as_canonical_key(), "FX.EURUSD");
    }

    #[test]
    fn currency_validates_iso4217_shape() {
        assert!(Currency::new("USD").is_ok());
        assert!(Currency::new("usd").is_err());
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("USDX").is_err());
        assert_eq!(Currency::USD.as_str(), "USD");
    }
}
