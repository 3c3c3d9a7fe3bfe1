//! Derived values computed on read from integer running totals.

use crate::error::ReportError;

/// Computes `part / total`.
///
/// # Errors
///
/// Returns [`ReportError::DivisionUndefined`] when `total` is zero.
pub fn ratio(part: u64, total: u64, metric: &'static str) -> Result<f64, ReportError> {
    if total == 0 {
        return Err(ReportError::DivisionUndefined { metric });
    }
    Ok(part as f64 / total as f64)
}

/// Computes the arithmetic mean of a running sum over `count` samples.
///
/// # Errors
///
/// Returns [`ReportError::DivisionUndefined`] when `count` is zero.
pub fn mean(sum: i64, count: u64, metric: &'static str) -> Result<f64, ReportError> {
    if count == 0 {
        return Err(ReportError::DivisionUndefined { metric });
    }
    Ok(sum as f64 / count as f64)
}
