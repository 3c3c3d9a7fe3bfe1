//! The immutable flight record flowing through every reporting pass.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// One scheduled flight as read from the record source.
///
/// Records are never mutated after construction; the accumulation layer only
/// ever sees `&FlightRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub(crate) date: NaiveDate,
    pub(crate) origin: String,
    pub(crate) destination: String,
    pub(crate) carrier: String,
    #[serde(default)]
    pub(crate) tail_number: String,
    #[serde(default)]
    pub(crate) flight_number: String,
    pub(crate) distance: u32,
    #[serde(default, deserialize_with = "zero_if_empty")]
    pub(crate) departure_delay: i32,
    #[serde(default, deserialize_with = "zero_if_empty")]
    pub(crate) arrival_delay: i32,
    #[serde(deserialize_with = "flag")]
    pub(crate) cancelled: bool,
    #[serde(deserialize_with = "flag")]
    pub(crate) diverted: bool,
}

impl FlightRecord {
    pub fn new(date: NaiveDate, origin: &str, destination: &str, carrier: &str) -> Self {
        FlightRecord {
            date,
            origin: origin.to_string(),
            destination: destination.to_string(),
            carrier: carrier.to_string(),
            tail_number: String::new(),
            flight_number: String::new(),
            distance: 0,
            departure_delay: 0,
            arrival_delay: 0,
            cancelled: false,
            diverted: false,
        }
    }

    pub fn with_plane(mut self, tail_number: &str) -> Self {
        self.tail_number = tail_number.to_string();
        self
    }

    pub fn with_flight_number(mut self, flight_number: &str) -> Self {
        self.flight_number = flight_number.to_string();
        self
    }

    pub fn with_distance(mut self, miles: u32) -> Self {
        self.distance = miles;
        self
    }

    pub fn with_delays(mut self, departure: i32, arrival: i32) -> Self {
        self.departure_delay = departure;
        self.arrival_delay = arrival;
        self
    }

    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_diverted(mut self, diverted: bool) -> Self {
        self.diverted = diverted;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    pub fn tail_number(&self) -> &str {
        &self.tail_number
    }

    pub fn flight_number(&self) -> &str {
        &self.flight_number
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn departure_delay(&self) -> i32 {
        self.departure_delay
    }

    pub fn arrival_delay(&self) -> i32 {
        self.arrival_delay
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn diverted(&self) -> bool {
        self.diverted
    }

    /// Returns `true` if the flight touched `airport` as origin or destination.
    pub fn touches(&self, airport: &str) -> bool {
        self.origin == airport || self.destination == airport
    }
}

/// Missing delay columns (cancelled flights) read as zero minutes.
fn zero_if_empty<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or(0))
}

/// Accepts both the `0`/`1` encoding of the raw data set and `true`/`false`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "1" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "false" | "FALSE" | "False" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid flag value '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(csv: &str) -> Result<Vec<FlightRecord>, csv::Error> {
        csv::Reader::from_reader(csv.as_bytes())
            .deserialize()
            .collect()
    }

    const HEADER: &str = "date,origin,destination,carrier,tail_number,flight_number,distance,departure_delay,arrival_delay,cancelled,diverted\n";

    #[test]
    fn test_deserialize_numeric_flags() {
        let rows = read(&format!(
            "{HEADER}2008-01-03,IAD,TPA,WN,N712SW,335,810,8,-14,0,1\n"
        ))
        .unwrap();

        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.date(), NaiveDate::from_ymd_opt(2008, 1, 3).unwrap());
        assert_eq!(r.origin(), "IAD");
        assert_eq!(r.arrival_delay(), -14);
        assert!(!r.cancelled());
        assert!(r.diverted());
    }

    #[test]
    fn test_deserialize_empty_delays_for_cancelled() {
        let rows = read(&format!(
            "{HEADER}2008-01-03,IND,BWI,WN,,1,515,,,true,false\n"
        ))
        .unwrap();

        assert_eq!(rows[0].departure_delay(), 0);
        assert_eq!(rows[0].arrival_delay(), 0);
        assert!(rows[0].cancelled());
        assert_eq!(rows[0].tail_number(), "");
    }

    #[test]
    fn test_deserialize_rejects_bad_flag() {
        let result = read(&format!("{HEADER}2008-01-03,IND,BWI,WN,,1,515,0,0,maybe,0\n"));
        assert!(result.is_err());
    }

    #[test]
    fn test_touches() {
        let r = FlightRecord::new(NaiveDate::from_ymd_opt(2008, 1, 1).unwrap(), "JFK", "LAX", "AA");
        assert!(r.touches("JFK"));
        assert!(r.touches("LAX"));
        assert!(!r.touches("ORD"));
        assert_eq!(r.year(), 2008);
    }
}
