//! Error conditions raised by the aggregation core.

use thiserror::Error;

/// Failure of a reporting pass or of one of its building blocks.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A rate or average was requested from an aggregate with no flights.
    #[error("{metric} is undefined for an aggregate with zero flights")]
    DivisionUndefined { metric: &'static str },

    /// A bucketed classifier has no bucket covering the value.
    #[error("no bucket configured for value {value}")]
    Classification { value: i64 },

    /// Distance buckets that overlap, leave gaps, or are otherwise malformed.
    #[error("invalid distance buckets: {0}")]
    InvalidBuckets(String),

    #[error("ranking limit {0} is outside 1..=100")]
    InvalidLimit(usize),

    #[error("report requires the {0} parameter")]
    MissingParameter(&'static str),

    #[error("{kind} '{code}' not found in reference data")]
    NotFound { kind: &'static str, code: String },

    #[error("failed reading flight records: {0}")]
    Source(#[from] csv::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed writing report output: {0}")]
    Sink(String),
}

impl ReportError {
    /// Returns `true` for conditions caused by report configuration rather
    /// than by the data or the environment.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReportError::Classification { .. }
                | ReportError::InvalidBuckets(_)
                | ReportError::InvalidLimit(_)
                | ReportError::MissingParameter(_)
        )
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        ReportError::Sink(e.to_string())
    }
}
