//! Ordering completed groups by a metric and keeping the top N.

use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::ReportError;
use crate::grouping::{GroupKey, Grouping};

/// Direction of the metric sort. Ties always fall back to ascending key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[value(name = "desc")]
    Descending,
    #[value(name = "asc")]
    Ascending,
}

/// Number of rows a ranked report may return, between 1 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Limit(usize);

impl Limit {
    pub const MIN: usize = 1;
    pub const MAX: usize = 100;

    /// # Errors
    ///
    /// Returns [`ReportError::InvalidLimit`] outside `1..=100`; the value is
    /// never clamped.
    pub fn new(n: usize) -> Result<Self, ReportError> {
        if (Self::MIN..=Self::MAX).contains(&n) {
            Ok(Limit(n))
        } else {
            Err(ReportError::InvalidLimit(n))
        }
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit(10)
    }
}

impl TryFrom<usize> for Limit {
    type Error = ReportError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        Limit::new(n)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One group with the score it was ranked by.
#[derive(Debug)]
pub struct Ranked<'g, K, A, S> {
    pub key: &'g K,
    pub aggregate: &'g A,
    pub score: S,
}

/// Scores every group with `metric`, sorts by score in `order` (ties by key
/// ascending) and keeps at most `limit` rows. `None` keeps every group.
///
/// The groups are only read, never modified.
///
/// # Errors
///
/// Propagates the first error raised by `metric`.
pub fn rank<'g, K, A, S, F>(
    groups: &'g Grouping<K, A>,
    metric: F,
    order: Order,
    limit: Option<Limit>,
) -> Result<Vec<Ranked<'g, K, A, S>>, ReportError>
where
    K: GroupKey,
    S: PartialOrd,
    F: Fn(&A) -> Result<S, ReportError>,
{
    let mut ranked = groups
        .iter()
        .map(|(key, aggregate)| {
            Ok(Ranked {
                key,
                aggregate,
                score: metric(aggregate)?,
            })
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    ranked.sort_by(|a, b| {
        let by_score = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
        let by_score = match order {
            Order::Descending => by_score.reverse(),
            Order::Ascending => by_score,
        };
        by_score.then_with(|| a.key.cmp(b.key))
    });

    if let Some(limit) = limit {
        ranked.truncate(limit.get());
    }

    Ok(ranked)
}

/// Every group in ascending key order.
pub fn by_key<K: GroupKey, A>(groups: &Grouping<K, A>) -> Vec<Ranked<'_, K, A, ()>> {
    let mut ranked: Vec<_> = groups
        .iter()
        .map(|(key, aggregate)| Ranked {
            key,
            aggregate,
            score: (),
        })
        .collect();
    ranked.sort_by(|a, b| a.key.cmp(b.key));
    ranked
}
