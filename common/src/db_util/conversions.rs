//! Safe-ish conversions between rust and sql types.

use super::*;

pub fn i64_to_u64(i: i64) -> Result<u64, StoreError> {
    u64::try_from(i).map_err(|_| {
        StoreError::Conversion("i64 value is negative and cannot be converted to u64".to_string())
    })
}

/// Scores must be finite to be ranked.
pub fn f64_to_score(f: f64) -> Result<f64, StoreError> {
    if f.is_finite() {
        Ok(f)
    } else {
        Err(StoreError::Conversion(format!("stored score {f} is not finite")))
    }
}
