//! The catalogue of grouped and live reports.
//!
//! Each report is a filter, a classifier, an aggregate shape and a view;
//! [`execute`] wires them into a [`ReportDriver`] pass.

use std::fmt;

use clap::ValueEnum;
use tracing::info;

use crate::driver::{LiveView, ReportDriver, ReportView};
use crate::error::ReportError;
use crate::grouping::{
    ByAttribute, ByCarrier, ByDate, ByDestination, ByOrigin, ByPlane, ByPlaneYear, ByRoute,
    Classifier, DistanceRanges, GroupPlan, Predicate, RecordFilter,
};
use crate::metrics::{
    AirportMetrics, ArrivalDelay, CarrierMetrics, Counter, DailyMetrics, DepartureDelay,
    FleetMetrics, Relations, RunningAverage,
};
use crate::output::{Column, MetricValue, RowSink};
use crate::ranking::{Limit, Order};
use crate::reference::AttributeTable;
use crate::source::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    MostFlightsByOrigin,
    TopDestinationsFromOrigin,
    MostPopularRoutes,
    MostFlightsByOriginState,
    MostFlightsByDestinationState,
    WorstDepartureDelayByOrigin,
    WorstArrivalDelayByDestination,
    MostCancelledByOrigin,
    MostCancelledByCarrier,
    MostFlightsByPlane,
    MostFlightsByPlaneModel,
    DaysWithMostCancellations,
    DaysWithLeastCancellations,
    FlightsByDistanceRange,
    FlightsByPlaneYear,
    HighestCancellationRateByAirport,
    CarrierMetrics,
    AirportMetrics,
    FleetSizeByCarrier,
    ActiveDaysByPlane,
}

impl ReportKind {
    pub fn description(&self) -> &'static str {
        match self {
            ReportKind::MostFlightsByOrigin => "Origins with the most operated flights",
            ReportKind::TopDestinationsFromOrigin => "Most served destinations from one origin",
            ReportKind::MostPopularRoutes => "Origin/destination pairs with the most flights",
            ReportKind::MostFlightsByOriginState => "Departure states with the most operated flights",
            ReportKind::MostFlightsByDestinationState => {
                "Arrival states with the most operated flights"
            }
            ReportKind::WorstDepartureDelayByOrigin => "Highest average departure delay by origin",
            ReportKind::WorstArrivalDelayByDestination => {
                "Highest average arrival delay by destination"
            }
            ReportKind::MostCancelledByOrigin => "Origins with the most cancellations",
            ReportKind::MostCancelledByCarrier => "Carriers with the most cancellations",
            ReportKind::MostFlightsByPlane => "Planes with the most flights and their daily average",
            ReportKind::MostFlightsByPlaneModel => {
                "Plane models with the most flights and their daily average"
            }
            ReportKind::DaysWithMostCancellations => "Days with the most cancellations",
            ReportKind::DaysWithLeastCancellations => "Days with the fewest cancellations",
            ReportKind::FlightsByDistanceRange => "Flight counts per distance bucket",
            ReportKind::FlightsByPlaneYear => "Flight counts per year of plane manufacture",
            ReportKind::HighestCancellationRateByAirport => {
                "Origins with the highest cancellation rate"
            }
            ReportKind::CarrierMetrics => "Totals, rates and airports served for every carrier",
            ReportKind::AirportMetrics => "Totals, rates and delays for every origin airport",
            ReportKind::FleetSizeByCarrier => "Carriers by number of distinct planes flown",
            ReportKind::ActiveDaysByPlane => "Planes by number of days in service",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

/// Caller-validated invocation parameters.
#[derive(Debug, Clone, Default)]
pub struct ReportParams {
    pub limit: Limit,
    /// Overrides the report's default direction for metric-ranked reports.
    pub order: Option<Order>,
    /// Narrows the report's own filter.
    pub filter: RecordFilter,
}

impl ReportParams {
    fn origin(&self) -> Option<&str> {
        self.filter.predicates().iter().find_map(|p| match p {
            Predicate::Origin(code) => Some(code.as_str()),
            _ => None,
        })
    }
}

fn count_columns(c: &Counter) -> Vec<Column> {
    vec![Column::new("count", c.count())]
}

fn plane_columns(c: &Counter) -> Vec<Column> {
    vec![
        Column::new("count", c.count()),
        Column::new("daily avg", MetricValue::Average(c.daily_average())),
    ]
}

fn departure_columns(avg: &RunningAverage<DepartureDelay>) -> Vec<Column> {
    vec![Column::new("delay (min)", MetricValue::average(avg.average()))]
}

fn arrival_columns(avg: &RunningAverage<ArrivalDelay>) -> Vec<Column> {
    vec![Column::new("delay (min)", MetricValue::average(avg.average()))]
}

fn carrier_columns(m: &CarrierMetrics) -> Vec<Column> {
    vec![
        Column::new("total", m.total_flights()),
        Column::new("cancelled %", MetricValue::percent(m.cancellation_rate())),
        Column::new("diverted %", MetricValue::percent(m.diversion_rate())),
        Column::new("airports", m.total_airports()),
    ]
}

fn airport_columns(m: &AirportMetrics) -> Vec<Column> {
    vec![
        Column::new("total", m.total_flights()),
        Column::new("cancelled %", MetricValue::percent(m.cancellation_rate())),
        Column::new("diverted %", MetricValue::percent(m.diversion_rate())),
        Column::new(
            "avg dep delay",
            MetricValue::average(m.average_departure_delay()),
        ),
    ]
}

fn cancellation_rate_columns(m: &AirportMetrics) -> Vec<Column> {
    vec![
        Column::new("rate %", MetricValue::percent(m.cancellation_rate())),
        Column::new("total", m.total_flights()),
    ]
}

fn fleet_columns(m: &FleetMetrics) -> Vec<Column> {
    vec![
        Column::new("planes", m.related().distinct()),
        Column::new("flights", m.total_flights()),
    ]
}

fn active_day_columns(m: &DailyMetrics) -> Vec<Column> {
    vec![
        Column::new("days", m.related().distinct()),
        Column::new("flights", m.total_flights()),
    ]
}

const AIRPORT_LIVE_COLUMNS: &[&str] = &["total", "cancelled", "diverted", "origins", "destinations"];
const CARRIER_LIVE_COLUMNS: &[&str] = &["total", "cancelled", "diverted", "airports"];

fn airport_live_columns(m: &AirportMetrics) -> Vec<Column> {
    vec![
        Column::new("total", m.total_flights()),
        Column::new("cancelled", m.total_cancelled()),
        Column::new("diverted", m.total_diverted()),
        Column::new("origins", m.total_origins()),
        Column::new("destinations", m.total_destinations()),
    ]
}

fn carrier_live_columns(m: &CarrierMetrics) -> Vec<Column> {
    vec![
        Column::new("total", m.total_flights()),
        Column::new("cancelled", m.total_cancelled()),
        Column::new("diverted", m.total_diverted()),
        Column::new("airports", m.total_airports()),
    ]
}

/// Ranks `Counter` groups by count.
fn counted<S, C>(
    driver: &ReportDriver<'_>,
    source: S,
    classifier: C,
    filter: RecordFilter,
    view: ReportView<Counter, u64>,
    sink: &mut dyn RowSink,
) -> Result<usize, ReportError>
where
    S: RecordSource,
    C: Classifier,
{
    let plan = GroupPlan::new(classifier, |_| Counter::default()).with_filter(filter);
    driver.run(source, &plan, &view, sink)
}

fn by_count(title: String, params: &ReportParams, default_order: Order) -> ReportView<Counter, u64> {
    ReportView::ranked(title, &["count"], |c| Ok(c.count()), count_columns)
        .order(params.order.unwrap_or(default_order))
        .limit(params.limit)
}

/// Runs report `kind` over `source`, writing rows to `sink`.
///
/// # Errors
///
/// Returns [`ReportError::MissingParameter`] when a required filter is
/// absent, and otherwise propagates any failure of the pass.
pub fn execute<S: RecordSource>(
    kind: ReportKind,
    driver: &ReportDriver<'_>,
    source: S,
    params: &ReportParams,
    sink: &mut dyn RowSink,
) -> Result<usize, ReportError> {
    info!(report = %kind, limit = %params.limit, "Running report");
    let narrowed = |base: RecordFilter| base.and(params.filter.clone());
    let order = |default: Order| params.order.unwrap_or(default);

    match kind {
        ReportKind::MostFlightsByOrigin => counted(
            driver,
            source,
            ByOrigin,
            narrowed(RecordFilter::operated()),
            by_count("Most flights by origin".into(), params, Order::Descending),
            sink,
        ),
        ReportKind::TopDestinationsFromOrigin => {
            let origin = params
                .origin()
                .ok_or(ReportError::MissingParameter("origin"))?
                .to_string();
            counted(
                driver,
                source,
                ByDestination,
                narrowed(RecordFilter::operated()),
                by_count(format!("Top destinations from {origin}"), params, Order::Descending),
                sink,
            )
        }
        ReportKind::MostPopularRoutes => counted(
            driver,
            source,
            ByRoute,
            narrowed(RecordFilter::operated()),
            by_count("Most popular routes".into(), params, Order::Descending),
            sink,
        ),
        ReportKind::MostFlightsByOriginState => counted(
            driver,
            source,
            ByAttribute::origin_state(AttributeTable::airport_states(driver.lookup())),
            narrowed(RecordFilter::operated()),
            by_count("Most flights by origin state".into(), params, Order::Descending),
            sink,
        ),
        ReportKind::MostFlightsByDestinationState => counted(
            driver,
            source,
            ByAttribute::destination_state(AttributeTable::airport_states(driver.lookup())),
            narrowed(RecordFilter::operated()),
            by_count("Most flights by destination state".into(), params, Order::Descending),
            sink,
        ),
        ReportKind::WorstDepartureDelayByOrigin => {
            let plan = GroupPlan::new(ByOrigin, |_| RunningAverage::<DepartureDelay>::default())
                .with_filter(narrowed(RecordFilter::operated()));
            let view = ReportView::ranked(
                "Worst average departure delay by origin",
                &["delay (min)"],
                |a: &RunningAverage<DepartureDelay>| a.average(),
                departure_columns,
            )
            .order(order(Order::Descending))
            .limit(params.limit);
            driver.run(source, &plan, &view, sink)
        }
        ReportKind::WorstArrivalDelayByDestination => {
            let plan = GroupPlan::new(ByDestination, |_| RunningAverage::<ArrivalDelay>::default())
                .with_filter(narrowed(RecordFilter::operated()));
            let view = ReportView::ranked(
                "Worst average arrival delay by destination",
                &["delay (min)"],
                |a: &RunningAverage<ArrivalDelay>| a.average(),
                arrival_columns,
            )
            .order(order(Order::Descending))
            .limit(params.limit);
            driver.run(source, &plan, &view, sink)
        }
        ReportKind::MostCancelledByOrigin => counted(
            driver,
            source,
            ByOrigin,
            narrowed(RecordFilter::cancelled()),
            by_count("Most cancelled flights by origin".into(), params, Order::Descending),
            sink,
        ),
        ReportKind::MostCancelledByCarrier => counted(
            driver,
            source,
            ByCarrier,
            narrowed(RecordFilter::cancelled()),
            by_count("Most cancelled flights by carrier".into(), params, Order::Descending),
            sink,
        ),
        ReportKind::MostFlightsByPlane => {
            let view = ReportView::ranked(
                "Most flights by plane",
                &["count", "daily avg"],
                |c: &Counter| Ok(c.count()),
                plane_columns,
            )
            .order(order(Order::Descending))
            .limit(params.limit);
            counted(driver, source, ByPlane, narrowed(RecordFilter::operated()), view, sink)
        }
        ReportKind::MostFlightsByPlaneModel => {
            let view = ReportView::ranked(
                "Most flights by plane model",
                &["count", "daily avg"],
                |c: &Counter| Ok(c.count()),
                plane_columns,
            )
            .order(order(Order::Descending))
            .limit(params.limit);
            let classifier = ByAttribute::plane_model(AttributeTable::plane_models(driver.lookup()));
            counted(driver, source, classifier, narrowed(RecordFilter::operated()), view, sink)
        }
        ReportKind::DaysWithMostCancellations => counted(
            driver,
            source,
            ByDate,
            narrowed(RecordFilter::cancelled()),
            by_count("Days with most cancellations".into(), params, Order::Descending),
            sink,
        ),
        ReportKind::DaysWithLeastCancellations => counted(
            driver,
            source,
            ByDate,
            narrowed(RecordFilter::cancelled()),
            by_count("Days with least cancellations".into(), params, Order::Ascending),
            sink,
        ),
        ReportKind::FlightsByDistanceRange => {
            let plan = GroupPlan::new(DistanceRanges::standard(), |_| Counter::default())
                .with_filter(narrowed(RecordFilter::operated()));
            let view = ReportView::listing("Flights by distance range", &["count"], count_columns);
            driver.run(source, &plan, &view, sink)
        }
        ReportKind::FlightsByPlaneYear => {
            let mut view = by_count("Flights by plane year".into(), params, Order::Descending);
            view.limit = None;
            let classifier = ByPlaneYear::new(AttributeTable::plane_years(driver.lookup()));
            counted(driver, source, classifier, narrowed(RecordFilter::operated()), view, sink)
        }
        ReportKind::HighestCancellationRateByAirport => {
            let plan = GroupPlan::new(ByOrigin, |k| AirportMetrics::new(k.clone()))
                .with_filter(narrowed(RecordFilter::all()));
            let view = ReportView::ranked(
                "Highest cancellation rate by airport",
                &["rate %", "total"],
                |m: &AirportMetrics| m.cancellation_rate(),
                cancellation_rate_columns,
            )
            .order(order(Order::Descending))
            .limit(params.limit);
            driver.run(source, &plan, &view, sink)
        }
        ReportKind::CarrierMetrics => {
            let plan = GroupPlan::new(ByCarrier, |k| CarrierMetrics::new(k.clone()))
                .with_filter(narrowed(RecordFilter::all()));
            let view = ReportView::listing(
                "Carrier metrics",
                &["total", "cancelled %", "diverted %", "airports"],
                carrier_columns,
            );
            driver.run(source, &plan, &view, sink)
        }
        ReportKind::AirportMetrics => {
            let plan = GroupPlan::new(ByOrigin, |k| AirportMetrics::new(k.clone()))
                .with_filter(narrowed(RecordFilter::all()));
            let view = ReportView::listing(
                "Airport metrics",
                &["total", "cancelled %", "diverted %", "avg dep delay"],
                airport_columns,
            );
            driver.run(source, &plan, &view, sink)
        }
        ReportKind::FleetSizeByCarrier => {
            let plan = GroupPlan::new(ByCarrier, |k| FleetMetrics::new(k.clone()))
                .with_filter(narrowed(RecordFilter::operated()));
            let view = ReportView::ranked(
                "Fleet size by carrier",
                &["planes", "flights"],
                |m: &FleetMetrics| Ok(m.related().distinct()),
                fleet_columns,
            )
            .order(order(Order::Descending))
            .limit(params.limit);
            driver.run(source, &plan, &view, sink)
        }
        ReportKind::ActiveDaysByPlane => {
            let plan = GroupPlan::new(ByPlane, |k| DailyMetrics::new(k.clone()))
                .with_filter(narrowed(RecordFilter::operated()));
            let view = ReportView::ranked(
                "Active days by plane",
                &["days", "flights"],
                |m: &DailyMetrics| Ok(m.related().distinct()),
                active_day_columns,
            )
            .order(order(Order::Descending))
            .limit(params.limit);
            driver.run(source, &plan, &view, sink)
        }
    }
}

/// Which single subject a live report follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveSubject {
    /// Flights departing from or arriving at the airport.
    Airport(String),
    Carrier(String),
}

/// Streams metrics for one subject, re-rendering after every matching flight.
pub fn execute_live<S: RecordSource>(
    subject: &LiveSubject,
    driver: &ReportDriver<'_>,
    source: S,
    filter: RecordFilter,
    sink: &mut dyn RowSink,
) -> Result<(), ReportError> {
    match subject {
        LiveSubject::Airport(code) => {
            let filter = RecordFilter::all()
                .with(Predicate::Airport(code.clone()))
                .and(filter);
            let view = LiveView {
                title: format!("Airport metrics for {code}"),
                columns: AIRPORT_LIVE_COLUMNS,
                render: airport_live_columns,
            };
            driver.live(source, &filter, AirportMetrics::new(code.clone()), &view, sink)?;
        }
        LiveSubject::Carrier(code) => {
            let filter = RecordFilter::all()
                .with(Predicate::Carrier(code.clone()))
                .and(filter);
            let view = LiveView {
                title: format!("Carrier metrics for {code}"),
                columns: CARRIER_LIVE_COLUMNS,
                render: carrier_live_columns,
            };
            driver.live(source, &filter, CarrierMetrics::new(code.clone()), &view, sink)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CollectSink;
    use crate::record::FlightRecord;
    use crate::reference::{Airport, Plane, Registry};
    use crate::source::MemorySource;
    use chrono::NaiveDate;

    fn flight(day: u32, origin: &str, destination: &str, carrier: &str) -> FlightRecord {
        FlightRecord::new(NaiveDate::from_ymd_opt(2008, 4, day).unwrap(), origin, destination, carrier)
    }

    fn sample() -> MemorySource {
        MemorySource::new(vec![
            flight(1, "JFK", "LAX", "AA").with_distance(2475).with_delays(30, 20).with_plane("N1"),
            flight(1, "JFK", "BOS", "B6").with_distance(187).with_delays(-5, -10).with_plane("N2"),
            flight(2, "JFK", "LAX", "AA").with_distance(2475).with_cancelled(true),
            flight(2, "LAX", "SFO", "AA").with_distance(337).with_delays(10, 0).with_plane("N1"),
            flight(3, "BOS", "JFK", "B6").with_distance(187).with_diverted(true).with_plane("N2"),
            flight(3, "SFO", "JFK", "AA").with_distance(2586).with_cancelled(true),
            flight(3, "SFO", "LAX", "UA").with_distance(337).with_cancelled(true),
        ])
    }

    fn run(kind: ReportKind, params: ReportParams) -> Result<CollectSink, ReportError> {
        let registry = Registry::new();
        let driver = ReportDriver::new(&registry);
        let mut sink = CollectSink::default();
        execute(kind, &driver, sample(), &params, &mut sink)?;
        Ok(sink)
    }

    fn registry() -> Registry {
        let airport = |iata: &str, state: &str| Airport {
            iata: iata.into(),
            name: format!("{iata} airport"),
            city: String::new(),
            state: state.into(),
        };
        let plane = |tail: &str, manufacturer: &str, model: &str, year: u16| Plane {
            tail_number: tail.into(),
            manufacturer: manufacturer.into(),
            model_number: model.into(),
            year: Some(year),
        };
        Registry::new()
            .with_airport(airport("JFK", "NY"))
            .with_airport(airport("LAX", "CA"))
            .with_airport(airport("SFO", "CA"))
            .with_airport(airport("BOS", "MA"))
            .with_plane(plane("N1", "BOEING", "737-7H4", 1998))
            .with_plane(plane("N2", "AIRBUS", "A320-214", 0))
    }

    fn run_with(registry: &Registry, kind: ReportKind, params: ReportParams) -> CollectSink {
        let driver = ReportDriver::new(registry);
        let mut sink = CollectSink::default();
        execute(kind, &driver, sample(), &params, &mut sink).unwrap();
        sink
    }

    fn keys(sink: &CollectSink) -> Vec<&str> {
        sink.rows.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_display_uses_cli_name() {
        assert_eq!(ReportKind::MostFlightsByOrigin.to_string(), "most-flights-by-origin");
        assert!(!ReportKind::ActiveDaysByPlane.description().is_empty());
    }

    #[test]
    fn test_most_flights_by_origin() {
        let sink = run(ReportKind::MostFlightsByOrigin, ReportParams::default()).unwrap();
        assert_eq!(keys(&sink), vec!["JFK", "BOS", "LAX"]);
        assert_eq!(sink.rows[0].value("count"), Some(MetricValue::Count(2)));
    }

    #[test]
    fn test_top_destinations_requires_origin() {
        let err = run(ReportKind::TopDestinationsFromOrigin, ReportParams::default()).unwrap_err();
        assert!(matches!(err, ReportError::MissingParameter("origin")));

        let params = ReportParams {
            filter: RecordFilter::all().with(Predicate::Origin("JFK".into())),
            ..Default::default()
        };
        let sink = run(ReportKind::TopDestinationsFromOrigin, params).unwrap();
        assert_eq!(sink.title, "Top destinations from JFK");
        assert_eq!(keys(&sink), vec!["BOS", "LAX"]);
    }

    #[test]
    fn test_routes_keyed_by_pair() {
        let sink = run(ReportKind::MostPopularRoutes, ReportParams::default()).unwrap();
        assert_eq!(sink.rows.len(), 4);
        assert!(keys(&sink).contains(&"JFK->LAX"));
    }

    #[test]
    fn test_worst_departure_delay() {
        let sink = run(ReportKind::WorstDepartureDelayByOrigin, ReportParams::default()).unwrap();
        assert_eq!(keys(&sink), vec!["JFK", "LAX", "BOS"]);
        assert_eq!(sink.rows[0].value("delay (min)"), Some(MetricValue::Average(12.5)));
    }

    #[test]
    fn test_cancellations_by_day_both_directions() {
        let most = run(ReportKind::DaysWithMostCancellations, ReportParams::default()).unwrap();
        assert_eq!(keys(&most), vec!["2008-04-03", "2008-04-02"]);

        let least = run(ReportKind::DaysWithLeastCancellations, ReportParams::default()).unwrap();
        assert_eq!(keys(&least), vec!["2008-04-02", "2008-04-03"]);
    }

    #[test]
    fn test_order_override() {
        let params = ReportParams {
            order: Some(Order::Ascending),
            ..Default::default()
        };
        let sink = run(ReportKind::MostCancelledByCarrier, params).unwrap();
        assert_eq!(keys(&sink), vec!["UA", "AA"]);
    }

    #[test]
    fn test_limit_applies() {
        let params = ReportParams {
            limit: Limit::new(1).unwrap(),
            ..Default::default()
        };
        let sink = run(ReportKind::MostFlightsByOrigin, params).unwrap();
        assert_eq!(keys(&sink), vec!["JFK"]);
    }

    #[test]
    fn test_distance_ranges_listing_in_key_order() {
        let sink = run(ReportKind::FlightsByDistanceRange, ReportParams::default()).unwrap();
        assert_eq!(keys(&sink), vec!["101-250", "251-500", "1001-2500"]);
    }

    #[test]
    fn test_carrier_metrics_rates() {
        let sink = run(ReportKind::CarrierMetrics, ReportParams::default()).unwrap();
        assert_eq!(keys(&sink), vec!["AA", "B6", "UA"]);

        let aa = &sink.rows[0];
        assert_eq!(aa.value("total"), Some(MetricValue::Count(4)));
        assert_eq!(aa.value("cancelled %"), Some(MetricValue::Percent(50.0)));
        assert_eq!(aa.value("airports"), Some(MetricValue::Count(3)));
    }

    #[test]
    fn test_airport_metrics_undefined_delay() {
        let sink = run(ReportKind::AirportMetrics, ReportParams::default()).unwrap();
        let sfo = sink.rows.iter().find(|r| r.key == "SFO").unwrap();
        assert_eq!(sfo.value("cancelled %"), Some(MetricValue::Percent(100.0)));
        assert_eq!(sfo.value("avg dep delay"), Some(MetricValue::Undefined));
    }

    #[test]
    fn test_highest_cancellation_rate() {
        let sink = run(ReportKind::HighestCancellationRateByAirport, ReportParams::default()).unwrap();
        assert_eq!(keys(&sink)[0], "SFO");
    }

    #[test]
    fn test_fleet_and_active_days() {
        let fleet = run(ReportKind::FleetSizeByCarrier, ReportParams::default()).unwrap();
        assert_eq!(keys(&fleet), vec!["AA", "B6"]);
        assert_eq!(fleet.rows[0].value("planes"), Some(MetricValue::Count(1)));

        let days = run(ReportKind::ActiveDaysByPlane, ReportParams::default()).unwrap();
        assert_eq!(keys(&days), vec!["N1", "N2"]);
        assert_eq!(days.rows[0].value("days"), Some(MetricValue::Count(2)));
    }

    #[test]
    fn test_plane_report_daily_average() {
        let sink = run(ReportKind::MostFlightsByPlane, ReportParams::default()).unwrap();
        assert_eq!(keys(&sink), vec!["N1", "N2"]);
        assert_eq!(
            sink.rows[0].value("daily avg"),
            Some(MetricValue::Average(2.0 / 365.0))
        );
    }

    #[test]
    fn test_flights_by_state() {
        let registry = registry();

        let origin = run_with(&registry, ReportKind::MostFlightsByOriginState, ReportParams::default());
        assert_eq!(keys(&origin), vec!["NY", "CA", "MA"]);
        assert_eq!(origin.rows[0].value("count"), Some(MetricValue::Count(2)));
        assert_eq!(origin.rows[0].name, None);

        let destination = run_with(
            &registry,
            ReportKind::MostFlightsByDestinationState,
            ReportParams::default(),
        );
        assert_eq!(keys(&destination), vec!["CA", "MA", "NY"]);
        assert_eq!(destination.rows[0].value("count"), Some(MetricValue::Count(2)));
    }

    #[test]
    fn test_state_filter_narrows_report() {
        let registry = registry();
        let states = AttributeTable::airport_states(&registry);
        let params = ReportParams {
            filter: RecordFilter::all().with(Predicate::state("MA", &states)),
            ..Default::default()
        };

        let sink = run_with(&registry, ReportKind::MostFlightsByOriginState, params);
        assert_eq!(keys(&sink), vec!["MA", "NY"]);
    }

    #[test]
    fn test_unresolved_states_share_unknown_group() {
        let sink = run_with(&Registry::new(), ReportKind::MostFlightsByOriginState, ReportParams::default());
        assert_eq!(keys(&sink), vec!["UNKNOWN"]);
        assert_eq!(sink.rows[0].value("count"), Some(MetricValue::Count(4)));
    }

    #[test]
    fn test_most_flights_by_plane_model() {
        let sink = run_with(&registry(), ReportKind::MostFlightsByPlaneModel, ReportParams::default());

        assert_eq!(keys(&sink), vec!["AIRBUS A320-214", "BOEING 737-7H4"]);
        assert_eq!(sink.rows[1].value("count"), Some(MetricValue::Count(2)));
        assert_eq!(
            sink.rows[1].value("daily avg"),
            Some(MetricValue::Average(2.0 / 365.0))
        );
    }

    #[test]
    fn test_flights_by_plane_year_ignores_limit() {
        let params = ReportParams {
            limit: Limit::new(1).unwrap(),
            ..Default::default()
        };
        let sink = run_with(&registry(), ReportKind::FlightsByPlaneYear, params);

        assert_eq!(keys(&sink), vec!["1998", "UNKNOWN"]);
        assert_eq!(sink.rows[1].value("count"), Some(MetricValue::Count(2)));
    }

    #[test]
    fn test_live_airport() {
        let registry = Registry::new();
        let driver = ReportDriver::new(&registry);
        let mut sink = CollectSink::default();

        execute_live(
            &LiveSubject::Airport("LAX".into()),
            &driver,
            sample(),
            RecordFilter::all(),
            &mut sink,
        )
        .unwrap();

        assert_eq!(sink.columns, AIRPORT_LIVE_COLUMNS);
        assert_eq!(sink.live_updates.len(), 4);
        let last = sink.live_updates.last().unwrap();
        assert_eq!(last[0].value, MetricValue::Count(4));
        assert_eq!(last[1].value, MetricValue::Count(2));
        assert_eq!(last[3].value, MetricValue::Count(3));
        assert!(sink.finished);
    }
}
