//! Classifying records into groups and routing them to per-group aggregates.

use std::collections::hash_map;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display};
use std::hash::Hash;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ReportError;
use crate::metrics::Aggregate;
use crate::record::FlightRecord;
use crate::reference::{AttributeTable, EntityKind};

/// Sentinel key for records whose grouping attribute is absent.
pub const UNKNOWN_KEY: &str = "UNKNOWN";

/// Anything usable as a group key: hashable, totally ordered and printable.
pub trait GroupKey: Eq + Hash + Ord + Clone + Send + Sync + Display {}

impl<T: Eq + Hash + Ord + Clone + Send + Sync + Display> GroupKey for T {}

/// Maps each record to exactly one group key.
pub trait Classifier: Sync {
    type Key: GroupKey;

    /// Reference-data table the key codes resolve against, if any.
    const ENTITY: Option<EntityKind> = None;

    /// # Errors
    ///
    /// Returns [`ReportError::Classification`] when no group covers the record.
    fn classify(&self, record: &FlightRecord) -> Result<Self::Key, ReportError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ByOrigin;

impl Classifier for ByOrigin {
    type Key = String;
    const ENTITY: Option<EntityKind> = Some(EntityKind::Airport);

    fn classify(&self, record: &FlightRecord) -> Result<String, ReportError> {
        Ok(record.origin().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ByDestination;

impl Classifier for ByDestination {
    type Key = String;
    const ENTITY: Option<EntityKind> = Some(EntityKind::Airport);

    fn classify(&self, record: &FlightRecord) -> Result<String, ReportError> {
        Ok(record.destination().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ByCarrier;

impl Classifier for ByCarrier {
    type Key = String;
    const ENTITY: Option<EntityKind> = Some(EntityKind::Carrier);

    fn classify(&self, record: &FlightRecord) -> Result<String, ReportError> {
        Ok(record.carrier().to_string())
    }
}

/// Groups by tail number; flights without one share the [`UNKNOWN_KEY`] group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByPlane;

impl Classifier for ByPlane {
    type Key = String;
    const ENTITY: Option<EntityKind> = Some(EntityKind::Plane);

    fn classify(&self, record: &FlightRecord) -> Result<String, ReportError> {
        let tail = record.tail_number().trim();
        if tail.is_empty() {
            Ok(UNKNOWN_KEY.to_string())
        } else {
            Ok(tail.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ByDate;

impl Classifier for ByDate {
    type Key = NaiveDate;

    fn classify(&self, record: &FlightRecord) -> Result<NaiveDate, ReportError> {
        Ok(record.date())
    }
}

/// Groups by an attribute of one of the record's codes, resolved from
/// reference data before the pass. Codes missing from the table share the
/// [`UNKNOWN_KEY`] group.
#[derive(Debug, Clone)]
pub struct ByAttribute {
    code: fn(&FlightRecord) -> &str,
    table: AttributeTable<String>,
}

impl ByAttribute {
    pub fn new(code: fn(&FlightRecord) -> &str, table: AttributeTable<String>) -> Self {
        ByAttribute { code, table }
    }

    /// State of the departure airport.
    pub fn origin_state(states: AttributeTable<String>) -> Self {
        ByAttribute::new(FlightRecord::origin, states)
    }

    /// State of the arrival airport.
    pub fn destination_state(states: AttributeTable<String>) -> Self {
        ByAttribute::new(FlightRecord::destination, states)
    }

    /// Manufacturer and model of the plane flown.
    pub fn plane_model(models: AttributeTable<String>) -> Self {
        ByAttribute::new(FlightRecord::tail_number, models)
    }
}

impl Classifier for ByAttribute {
    type Key = String;

    fn classify(&self, record: &FlightRecord) -> Result<String, ReportError> {
        let code = (self.code)(record).trim();
        Ok(self
            .table
            .get(code)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_KEY.to_string()))
    }
}

/// Year of manufacture as a group key. Unknown years sort after every known one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PlaneYear {
    Built(u16),
    Unknown,
}

impl Display for PlaneYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaneYear::Built(year) => write!(f, "{year}"),
            PlaneYear::Unknown => f.write_str(UNKNOWN_KEY),
        }
    }
}

/// Groups by the year the plane was built; planes with no known year (or a
/// recorded year of 0) fall into [`PlaneYear::Unknown`].
#[derive(Debug, Clone, Default)]
pub struct ByPlaneYear {
    years: AttributeTable<u16>,
}

impl ByPlaneYear {
    pub fn new(years: AttributeTable<u16>) -> Self {
        ByPlaneYear { years }
    }
}

impl Classifier for ByPlaneYear {
    type Key = PlaneYear;

    fn classify(&self, record: &FlightRecord) -> Result<PlaneYear, ReportError> {
        Ok(match self.years.get(record.tail_number().trim()) {
            Some(&year) if year > 0 => PlaneYear::Built(year),
            _ => PlaneYear::Unknown,
        })
    }
}

/// A directed origin/destination pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.origin, self.destination)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ByRoute;

impl Classifier for ByRoute {
    type Key = Route;

    fn classify(&self, record: &FlightRecord) -> Result<Route, ReportError> {
        Ok(Route {
            origin: record.origin().to_string(),
            destination: record.destination().to_string(),
        })
    }
}

/// Inclusive distance interval in miles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DistanceRange {
    pub min: u32,
    pub max: u32,
}

impl DistanceRange {
    pub fn between(min: u32, max: u32) -> Self {
        DistanceRange { min, max }
    }

    pub fn contains(&self, miles: u32) -> bool {
        self.min <= miles && miles <= self.max
    }
}

impl Display for DistanceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Bucketed classifier over flight distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRanges {
    ranges: Vec<DistanceRange>,
}

impl DistanceRanges {
    /// Sorts `ranges` and checks they tile one unbroken interval.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidBuckets`] for an empty set, an inverted
    /// range, or two neighbouring ranges that overlap or leave a gap.
    pub fn new(mut ranges: Vec<DistanceRange>) -> Result<Self, ReportError> {
        ranges.sort();
        if ranges.is_empty() {
            return Err(ReportError::InvalidBuckets("no buckets configured".into()));
        }
        if let Some(r) = ranges.iter().find(|r| r.min > r.max) {
            return Err(ReportError::InvalidBuckets(format!("{r} is inverted")));
        }
        for pair in ranges.windows(2) {
            let (low, high) = (pair[0], pair[1]);
            if high.min <= low.max {
                return Err(ReportError::InvalidBuckets(format!("{low} overlaps {high}")));
            }
            if low.max.checked_add(1) != Some(high.min) {
                return Err(ReportError::InvalidBuckets(format!(
                    "gap between {low} and {high}"
                )));
            }
        }

        let ranges = DistanceRanges { ranges };
        debug_assert!(ranges.is_contiguous());
        Ok(ranges)
    }

    /// The six buckets covering 0 to 5000 miles.
    pub fn standard() -> Self {
        DistanceRanges {
            ranges: vec![
                DistanceRange::between(0, 100),
                DistanceRange::between(101, 250),
                DistanceRange::between(251, 500),
                DistanceRange::between(501, 1000),
                DistanceRange::between(1001, 2500),
                DistanceRange::between(2501, 5000),
            ],
        }
    }

    pub fn ranges(&self) -> &[DistanceRange] {
        &self.ranges
    }

    /// Returns `true` if the buckets neither overlap nor leave gaps between
    /// their lowest and highest bounds.
    pub fn is_contiguous(&self) -> bool {
        self.ranges
            .windows(2)
            .all(|pair| pair[0].max.checked_add(1) == Some(pair[1].min))
    }
}

impl Classifier for DistanceRanges {
    type Key = DistanceRange;

    fn classify(&self, record: &FlightRecord) -> Result<DistanceRange, ReportError> {
        self.ranges
            .iter()
            .find(|r| r.contains(record.distance()))
            .copied()
            .ok_or(ReportError::Classification {
                value: i64::from(record.distance()),
            })
    }
}

/// A single condition a record must satisfy to take part in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Cancelled(bool),
    Origin(String),
    Destination(String),
    Carrier(String),
    /// Origin or destination.
    Airport(String),
    Year(i32),
    MaxDistance(u32),
    /// Origin or destination lies in `state`; `airports` holds the state's
    /// airport codes, resolved from reference data.
    State {
        state: String,
        airports: BTreeSet<String>,
    },
}

impl Predicate {
    fn matches(&self, record: &FlightRecord) -> bool {
        match self {
            Predicate::Cancelled(c) => record.cancelled() == *c,
            Predicate::Origin(code) => record.origin() == code,
            Predicate::Destination(code) => record.destination() == code,
            Predicate::Carrier(code) => record.carrier() == code,
            Predicate::Airport(code) => record.touches(code),
            Predicate::Year(year) => record.year() == *year,
            Predicate::MaxDistance(miles) => record.distance() <= *miles,
            Predicate::State { airports, .. } => {
                airports.contains(record.origin()) || airports.contains(record.destination())
            }
        }
    }

    /// Builds a [`Predicate::State`] from an airport-to-state table.
    pub fn state(state: &str, states: &AttributeTable<String>) -> Self {
        Predicate::State {
            state: state.to_string(),
            airports: states.codes_with(state),
        }
    }
}

/// Conjunction of predicates; the empty filter accepts every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    predicates: Vec<Predicate>,
}

impl RecordFilter {
    pub fn all() -> Self {
        RecordFilter::default()
    }

    pub fn operated() -> Self {
        RecordFilter::all().with(Predicate::Cancelled(false))
    }

    pub fn cancelled() -> Self {
        RecordFilter::all().with(Predicate::Cancelled(true))
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Narrows this filter by every predicate of `other`.
    pub fn and(mut self, other: RecordFilter) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, record: &FlightRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// Everything needed to fold records into groups: which records take part,
/// how they are keyed, and the zero aggregate for a new key.
pub struct GroupPlan<C: Classifier, A> {
    pub filter: RecordFilter,
    pub classifier: C,
    pub seed: fn(&C::Key) -> A,
}

impl<C: Classifier, A: Aggregate> GroupPlan<C, A> {
    pub fn new(classifier: C, seed: fn(&C::Key) -> A) -> Self {
        GroupPlan {
            filter: RecordFilter::all(),
            classifier,
            seed,
        }
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Key to aggregate mapping built by one pass (or one partition of a pass).
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping<K: GroupKey, A> {
    groups: HashMap<K, A>,
}

impl<K: GroupKey, A> Default for Grouping<K, A> {
    fn default() -> Self {
        Grouping {
            groups: HashMap::new(),
        }
    }
}

impl<K: GroupKey, A: Aggregate> Grouping<K, A> {
    pub fn new() -> Self {
        Grouping::default()
    }

    /// Classifies `record` and folds it into its group, creating the group
    /// from the plan's seed on first sight of the key.
    pub fn route<C>(&mut self, plan: &GroupPlan<C, A>, record: &FlightRecord) -> Result<(), ReportError>
    where
        C: Classifier<Key = K>,
    {
        let key = plan.classifier.classify(record)?;
        self.groups
            .entry(key)
            .or_insert_with_key(|k| (plan.seed)(k))
            .accumulate(record);
        Ok(())
    }

    /// Merges another partial grouping, combining aggregates of shared keys.
    pub fn merge(mut self, other: Self) -> Self {
        if self.groups.len() < other.groups.len() {
            return other.merge(self);
        }
        for (key, partial) in other.groups {
            let merged = match self.groups.remove(&key) {
                Some(existing) => existing.combine(partial),
                None => partial,
            };
            self.groups.insert(key, merged);
        }
        self
    }
}

impl<K: GroupKey, A> Grouping<K, A> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&A> {
        self.groups.get(key)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, A> {
        self.groups.iter()
    }
}

impl<K: GroupKey, A> IntoIterator for Grouping<K, A> {
    type Item = (K, A);
    type IntoIter = hash_map::IntoIter<K, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}
