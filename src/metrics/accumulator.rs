//! Full per-subject metrics: flight, cancellation and diversion counts,
//! delay totals, and the distinct related entities seen.

use std::collections::BTreeSet;
use std::fmt::Debug;

use chrono::NaiveDate;

use crate::error::ReportError;
use crate::metrics::Aggregate;
use crate::metrics::rates::{mean, ratio};
use crate::record::FlightRecord;

/// The family of distinct-entity sets a [`Metrics`] tracks.
///
/// Sets only ever grow; `union` is the set-level half of `combine`.
pub trait Relations: Default + Clone + PartialEq + Debug + Send {
    fn observe(&mut self, record: &FlightRecord);

    fn union(&mut self, other: Self);

    /// Number of distinct entities, used when ranking by cardinality.
    fn distinct(&self) -> usize;
}

/// Airports a subject airport exchanged traffic with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AirportRelations {
    origins: BTreeSet<String>,
    destinations: BTreeSet<String>,
}

impl AirportRelations {
    pub fn origins(&self) -> &BTreeSet<String> {
        &self.origins
    }

    pub fn destinations(&self) -> &BTreeSet<String> {
        &self.destinations
    }
}

impl Relations for AirportRelations {
    fn observe(&mut self, record: &FlightRecord) {
        self.origins.insert(record.origin().to_string());
        self.destinations.insert(record.destination().to_string());
    }

    fn union(&mut self, other: Self) {
        self.origins.extend(other.origins);
        self.destinations.extend(other.destinations);
    }

    fn distinct(&self) -> usize {
        self.origins.union(&self.destinations).count()
    }
}

/// Airports served by a carrier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarrierRelations {
    airports: BTreeSet<String>,
}

impl CarrierRelations {
    pub fn airports(&self) -> &BTreeSet<String> {
        &self.airports
    }
}

impl Relations for CarrierRelations {
    fn observe(&mut self, record: &FlightRecord) {
        self.airports.insert(record.origin().to_string());
        self.airports.insert(record.destination().to_string());
    }

    fn union(&mut self, other: Self) {
        self.airports.extend(other.airports);
    }

    fn distinct(&self) -> usize {
        self.airports.len()
    }
}

/// Distinct planes flown. Records without a tail number are not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaneRelations {
    planes: BTreeSet<String>,
}

impl Relations for PlaneRelations {
    fn observe(&mut self, record: &FlightRecord) {
        if !record.tail_number().is_empty() {
            self.planes.insert(record.tail_number().to_string());
        }
    }

    fn union(&mut self, other: Self) {
        self.planes.extend(other.planes);
    }

    fn distinct(&self) -> usize {
        self.planes.len()
    }
}

/// Distinct calendar days with at least one flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayRelations {
    days: BTreeSet<NaiveDate>,
}

impl Relations for DayRelations {
    fn observe(&mut self, record: &FlightRecord) {
        self.days.insert(record.date());
    }

    fn union(&mut self, other: Self) {
        self.days.extend(other.days);
    }

    fn distinct(&self) -> usize {
        self.days.len()
    }
}

pub type AirportMetrics = Metrics<AirportRelations>;
pub type CarrierMetrics = Metrics<CarrierRelations>;
pub type FleetMetrics = Metrics<PlaneRelations>;
pub type DailyMetrics = Metrics<DayRelations>;

/// Running metrics for one subject (an airport, carrier or plane code).
///
/// Delay sums only cover operated (non-cancelled) flights, so the averages
/// divide by `total_flights - total_cancelled`.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics<R> {
    subject: String,
    total_flights: u64,
    total_cancelled: u64,
    total_diverted: u64,
    departure_delay_sum: i64,
    arrival_delay_sum: i64,
    related: R,
}

impl<R: Relations> Metrics<R> {
    /// Creates the zero aggregate for `subject`.
    pub fn new(subject: impl Into<String>) -> Self {
        Metrics {
            subject: subject.into(),
            total_flights: 0,
            total_cancelled: 0,
            total_diverted: 0,
            departure_delay_sum: 0,
            arrival_delay_sum: 0,
            related: R::default(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn total_flights(&self) -> u64 {
        self.total_flights
    }

    pub fn total_cancelled(&self) -> u64 {
        self.total_cancelled
    }

    pub fn total_diverted(&self) -> u64 {
        self.total_diverted
    }

    pub fn total_operated(&self) -> u64 {
        self.total_flights - self.total_cancelled
    }

    pub fn related(&self) -> &R {
        &self.related
    }

    pub fn cancellation_rate(&self) -> Result<f64, ReportError> {
        ratio(self.total_cancelled, self.total_flights, "cancellation rate")
    }

    pub fn diversion_rate(&self) -> Result<f64, ReportError> {
        ratio(self.total_diverted, self.total_flights, "diversion rate")
    }

    pub fn average_departure_delay(&self) -> Result<f64, ReportError> {
        mean(
            self.departure_delay_sum,
            self.total_operated(),
            "average departure delay",
        )
    }

    pub fn average_arrival_delay(&self) -> Result<f64, ReportError> {
        mean(
            self.arrival_delay_sum,
            self.total_operated(),
            "average arrival delay",
        )
    }
}

impl Metrics<AirportRelations> {
    pub fn total_origins(&self) -> usize {
        self.related.origins().len()
    }

    pub fn total_destinations(&self) -> usize {
        self.related.destinations().len()
    }
}

impl Metrics<CarrierRelations> {
    pub fn total_airports(&self) -> usize {
        self.related.airports().len()
    }
}

impl<R: Relations> Aggregate for Metrics<R> {
    fn accumulate(&mut self, record: &FlightRecord) {
        self.total_flights += 1;
        if record.cancelled() {
            self.total_cancelled += 1;
        } else {
            self.departure_delay_sum += i64::from(record.departure_delay());
            self.arrival_delay_sum += i64::from(record.arrival_delay());
        }
        if record.diverted() {
            self.total_diverted += 1;
        }
        self.related.observe(record);
    }

    fn combine(mut self, other: Self) -> Self {
        debug_assert_eq!(self.subject, other.subject, "combining metrics of different subjects");
        self.total_flights += other.total_flights;
        self.total_cancelled += other.total_cancelled;
        self.total_diverted += other.total_diverted;
        self.departure_delay_sum += other.departure_delay_sum;
        self.arrival_delay_sum += other.arrival_delay_sum;
        self.related.union(other.related);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2008, 1, d).unwrap()
    }

    fn flight(origin: &str, destination: &str) -> FlightRecord {
        FlightRecord::new(day(1), origin, destination, "WN")
    }

    #[test]
    fn test_accumulate_counts() {
        let mut m = CarrierMetrics::new("WN");
        m.accumulate(&flight("LAS", "PHX").with_delays(10, 20));
        m.accumulate(&flight("PHX", "LAS").with_cancelled(true).with_delays(99, 99));
        m.accumulate(&flight("LAS", "SAN").with_diverted(true).with_delays(-2, 4));

        assert_eq!(m.subject(), "WN");
        assert_eq!(m.total_flights(), 3);
        assert_eq!(m.total_cancelled(), 1);
        assert_eq!(m.total_diverted(), 1);
        assert_eq!(m.total_airports(), 3);
        assert_eq!(m.average_departure_delay().unwrap(), 4.0);
        assert_eq!(m.average_arrival_delay().unwrap(), 12.0);
    }

    #[test]
    fn test_duplicate_entities_do_not_inflate_sets() {
        let mut m = AirportMetrics::new("LAS");
        for _ in 0..5 {
            m.accumulate(&flight("LAS", "PHX"));
        }

        assert_eq!(m.total_flights(), 5);
        assert_eq!(m.total_origins(), 1);
        assert_eq!(m.total_destinations(), 1);
        assert_eq!(m.related().distinct(), 2);
    }

    #[test]
    fn test_rates_from_known_totals() {
        let mut m = AirportMetrics::new("JFK");
        for i in 0..100 {
            m.accumulate(
                &flight("JFK", "BOS")
                    .with_cancelled(i < 7)
                    .with_diverted((7..10).contains(&i)),
            );
        }

        assert_eq!(m.cancellation_rate().unwrap(), 0.07);
        assert_eq!(m.diversion_rate().unwrap(), 0.03);
    }

    #[test]
    fn test_rates_undefined_without_flights() {
        let m = AirportMetrics::new("JFK");
        assert!(matches!(
            m.cancellation_rate(),
            Err(ReportError::DivisionUndefined { .. })
        ));
        assert!(matches!(
            m.diversion_rate(),
            Err(ReportError::DivisionUndefined { .. })
        ));
        assert!(m.average_departure_delay().is_err());
    }

    #[test]
    fn test_average_delay_undefined_when_all_cancelled() {
        let mut m = CarrierMetrics::new("AA");
        m.accumulate(&flight("DFW", "ORD").with_cancelled(true));
        assert_eq!(m.cancellation_rate().unwrap(), 1.0);
        assert!(m.average_arrival_delay().is_err());
    }

    #[test]
    fn test_combine_matches_sequential_fold() {
        let records = vec![
            flight("LAS", "PHX").with_delays(5, 5),
            flight("PHX", "SAN").with_cancelled(true),
            flight("SAN", "LAS").with_diverted(true).with_delays(1, 30),
            flight("LAS", "OAK"),
        ];

        let mut whole = CarrierMetrics::new("WN");
        records.iter().for_each(|r| whole.accumulate(r));

        let mut left = CarrierMetrics::new("WN");
        let mut right = CarrierMetrics::new("WN");
        records[..1].iter().for_each(|r| left.accumulate(r));
        records[1..].iter().for_each(|r| right.accumulate(r));

        assert_eq!(right.clone().combine(left.clone()), whole);
        assert_eq!(left.combine(right), whole);
    }

    #[test]
    fn test_plane_and_day_relations() {
        let mut fleet = FleetMetrics::new("WN");
        fleet.accumulate(&flight("LAS", "PHX").with_plane("N1"));
        fleet.accumulate(&flight("LAS", "PHX").with_plane("N2"));
        fleet.accumulate(&flight("LAS", "PHX").with_plane("N1"));
        fleet.accumulate(&flight("LAS", "PHX"));
        assert_eq!(fleet.related().distinct(), 2);

        let mut daily = DailyMetrics::new("N1");
        daily.accumulate(&FlightRecord::new(day(1), "A", "B", "WN"));
        daily.accumulate(&FlightRecord::new(day(2), "B", "A", "WN"));
        daily.accumulate(&FlightRecord::new(day(2), "A", "B", "WN"));
        assert_eq!(daily.related().distinct(), 2);
    }
}
