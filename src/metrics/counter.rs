//! Scalar aggregates: bare counts and running averages.

use std::marker::PhantomData;

use crate::error::ReportError;
use crate::metrics::Aggregate;
use crate::metrics::rates::mean;
use crate::record::FlightRecord;

/// Number of records folded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Counter(u64);

impl Counter {
    pub fn new(count: u64) -> Self {
        Counter(count)
    }

    pub fn count(&self) -> u64 {
        self.0
    }

    /// Average count per day over a year of service.
    pub fn daily_average(&self) -> f64 {
        self.0 as f64 / 365.0
    }
}

impl Aggregate for Counter {
    fn accumulate(&mut self, _record: &FlightRecord) {
        self.0 += 1;
    }

    fn combine(self, other: Self) -> Self {
        Counter(self.0 + other.0)
    }
}

/// Selects the integer quantity a [`RunningAverage`] tracks.
pub trait Measure: Send {
    const NAME: &'static str;

    fn measure(record: &FlightRecord) -> i64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepartureDelay;

impl Measure for DepartureDelay {
    const NAME: &'static str = "average departure delay";

    fn measure(record: &FlightRecord) -> i64 {
        i64::from(record.departure_delay())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrivalDelay;

impl Measure for ArrivalDelay {
    const NAME: &'static str = "average arrival delay";

    fn measure(record: &FlightRecord) -> i64 {
        i64::from(record.arrival_delay())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Distance;

impl Measure for Distance {
    const NAME: &'static str = "average distance";

    fn measure(record: &FlightRecord) -> i64 {
        i64::from(record.distance())
    }
}

/// Running sum and sample count; the average is only computed on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningAverage<M> {
    sum: i64,
    count: u64,
    measure: PhantomData<M>,
}

impl<M> Default for RunningAverage<M> {
    fn default() -> Self {
        RunningAverage {
            sum: 0,
            count: 0,
            measure: PhantomData,
        }
    }
}

impl<M: Measure> RunningAverage<M> {
    pub fn from_parts(sum: i64, count: u64) -> Self {
        RunningAverage {
            sum,
            count,
            measure: PhantomData,
        }
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn average(&self) -> Result<f64, ReportError> {
        mean(self.sum, self.count, M::NAME)
    }
}

impl<M: Measure> Aggregate for RunningAverage<M> {
    fn accumulate(&mut self, record: &FlightRecord) {
        self.sum += M::measure(record);
        self.count += 1;
    }

    fn combine(self, other: Self) -> Self {
        RunningAverage::from_parts(self.sum + other.sum, self.count + other.count)
    }
}
