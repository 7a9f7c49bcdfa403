//! Shock application (spec §4.10): turns a base price plus a shock value
//! into a shocked price under the scenario's declared convention, with a
//! positivity guard for price-positive instruments.

use crate::error::StressError;
use crate::stress::scenario::ShockConvention;

/// `P' = P * (1 + shock)` (MULT_RETURN) or `P' = P * shock` (MULT_FACTOR).
/// Rejects a shocked price that would be non-positive.
pub fn apply_shock(
    asset: &str,
    base_price: f64,
    shock: f64,
    convention: ShockConvention,
) -> Result<f64, StressError> {
    let shocked = match convention {
        ShockConvention::MultReturn => base_price * (1.0 + shock),
        ShockConvention::MultFactor => base_price * shock,
    };
    if !shocked.is_finite() || shocked <= 0.0 {
        return Err(StressError::NonPositiveShockedPrice {
            asset: asset.to_string(),
            shocked_price: shocked,
            convention: format!("{convention:?}"),
        });
    }
    Ok(shocked)
}
