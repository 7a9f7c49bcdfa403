//! Return-series construction (spec §4.9 step 2): turns an aligned price
//! series into a return series under a declared definition and missing-
//! data policy. A `None` price slot represents an aligned-but-missing
//! observation (e.g. a holiday at one venue, not the other).

use chrono::NaiveDate;

use crate::error::RiskError;
use crate::risk::request::{MissingDataPolicy, ReturnDefinition};

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub asset: String,
    pub dates: Vec<NaiveDate>,
    pub returns: Vec<f64>,
    pub warnings: Vec<String>,
}

/// Builds a return series from `(date, price)` pairs already sorted
/// ascending by date. `price = None` marks an aligned gap.
pub fn build_return_series(
    asset: &str,
    prices: &[(NaiveDate, Option<f64>)],
    definition: ReturnDefinition,
    policy: MissingDataPolicy,
) -> Result<ReturnSeries, RiskError> {
    let mut filled: Vec<(NaiveDate, f64)> = Vec::with_capacity(prices.len());
    let mut warnings = Vec::new();
    let mut last_good: Option<f64> = None;

    for (date, price) in prices {
        match price {
            Some(p) => {
                filled.push((*date, *p));
                last_good = Some(*p);
            }
            None => match policy {
                MissingDataPolicy::Error => {
                    return Err(RiskError::MissingDataError {
                        asset: asset.to_string(),
                        date: date.to_string(),
                    });
                }
                MissingDataPolicy::Drop => {
                    warnings.push(format!("dropped missing observation for {asset} on {date}"));
                }
                MissingDataPolicy::Ffill => {
                    let Some(carried) = last_good else {
                        return Err(RiskError::MissingDataError {
                            asset: asset.to_string(),
                            date: date.to_string(),
                        });
                    };
                    warnings.push(format!(
                        "forward-filled missing observation for {asset} on {date}"
                    ));
                    filled.push((*date, carried));
                }
                MissingDataPolicy::Partial => {
                    warnings.push(format!(
                        "gap left in place for {asset} on {date} under PARTIAL policy"
                    ));
                }
            },
        }
    }

    let mut dates = Vec::with_capacity(filled.len().saturating_sub(1));
    let mut returns = Vec::with_capacity(filled.len().saturating_sub(1));
    for window in filled.windows(2) {
        let (prev_date, prev_price) = window[0];
        let (date, price) = window[1];
        if prev_price <= 0.0 && matches!(definition, ReturnDefinition::Log) {
            return Err(RiskError::NonFiniteReturn {
                asset: asset.to_string(),
                date: date.to_string(),
            });
        }
        let r = match definition {
            ReturnDefinition::Simple => price / prev_price - 1.0,
            ReturnDefinition::Log => (price / prev_price).ln(),
        };
        if !r.is_finite() {
            return Err(RiskError::NonFiniteReturn {
                asset: asset.to_string(),
                date: date.to_string(),
            });
        }
        let _ = prev_date;
        dates.push(date);
        returns.push(r);
    }

    Ok(ReturnSeries {
        asset: asset.to_string(),
        dates,
        returns,
        warnings,
    })
}
