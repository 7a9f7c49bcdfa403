use serde::{Deserialize, Serialize};

use crate::canonical::ids::InstrumentId;
use crate::error::SchemaError;

/// A long-only holding: `(instrument_id, quantity)` with `quantity >= 0`
/// and finite. MVP is long-only; short positions are out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument_id: InstrumentId,
    pub quantity: f64,
}

impl Position {
    pub fn new(instrument_id: InstrumentId, quantity: f64) -> Result<Self, SchemaError> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(SchemaError::InvalidQuantity {
                instrument_id: instrument_id.to_string(),
                quantity,
            });
        }
        Ok(Self {
            instrument_id,
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_non_finite_quantity() {
        let id = InstrumentId::new("EQ.AAPL").unwrap();
        assert!(Position::new(id.clone(), -1.0).is_err());
        assert!(Position::new(id.clone(), f64::NAN).is_err());
        assert!(Position::new(id.clone(), f64::INFINITY).is_err());
        assert!(Position::new(id, 0.0).is_ok());
    }
}
