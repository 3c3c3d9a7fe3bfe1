//! Per-group aggregates and the accumulate/combine contract they share.
//!
//! Every aggregate forms a commutative monoid: `accumulate` folds one record
//! in, `combine` merges two partial aggregates, and the freshly constructed
//! value is the identity. Partitioning the input arbitrarily and combining
//! the partial results in any order yields the same aggregate as a single
//! sequential fold.

pub mod accumulator;
pub mod counter;
pub mod rates;

pub use accumulator::{
    AirportMetrics, AirportRelations, CarrierMetrics, CarrierRelations, DayRelations,
    DailyMetrics, FleetMetrics, Metrics, PlaneRelations, Relations,
};
pub use counter::{ArrivalDelay, Counter, DepartureDelay, Distance, Measure, RunningAverage};

use crate::record::FlightRecord;

/// A mergeable running summary of flight records.
pub trait Aggregate: Send {
    /// Folds a single record into the aggregate.
    fn accumulate(&mut self, record: &FlightRecord);

    /// Merges two partial aggregates.
    ///
    /// Both inputs are taken by value, so neither can be observed by anyone
    /// else while the merge reuses their storage.
    fn combine(self, other: Self) -> Self
    where
        Self: Sized;
}
