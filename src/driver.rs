//! Orchestration of a reporting pass: read, filter, group, rank, emit.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::ReportError;
use crate::grouping::{Classifier, GroupKey, GroupPlan, Grouping, RecordFilter};
use crate::metrics::Aggregate;
use crate::output::{Column, RankedRow, RowSink};
use crate::ranking::{Limit, Order, rank};
use crate::record::FlightRecord;
use crate::reference::ReferenceLookup;
use crate::source::RecordSource;

/// How the grouping phase is scheduled. Both modes produce identical groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    /// Split the source into disjoint partitions, fold each on its own
    /// worker, then merge the sealed partial groupings.
    Parallel { partitions: usize },
}

/// Completed grouping plus bookkeeping about the pass that built it.
#[derive(Debug)]
pub struct Aggregated<K: GroupKey, A> {
    pub groups: Grouping<K, A>,
    pub read: u64,
    pub matched: u64,
}

impl<K: GroupKey, A: Aggregate> Aggregated<K, A> {
    fn empty() -> Self {
        Aggregated {
            groups: Grouping::new(),
            read: 0,
            matched: 0,
        }
    }

    fn merge(self, other: Self) -> Self {
        Aggregated {
            groups: self.groups.merge(other.groups),
            read: self.read + other.read,
            matched: self.matched + other.matched,
        }
    }
}

/// How a completed grouping is ordered and rendered.
pub struct ReportView<A, V> {
    pub title: String,
    pub columns: &'static [&'static str],
    pub metric: fn(&A) -> Result<V, ReportError>,
    pub order: Order,
    pub limit: Option<Limit>,
    pub render: fn(&A) -> Vec<Column>,
}

impl<A, V: PartialOrd> ReportView<A, V> {
    /// Ranked by `metric`, descending, top 10 unless overridden.
    pub fn ranked(
        title: impl Into<String>,
        columns: &'static [&'static str],
        metric: fn(&A) -> Result<V, ReportError>,
        render: fn(&A) -> Vec<Column>,
    ) -> Self {
        ReportView {
            title: title.into(),
            columns,
            metric,
            order: Order::Descending,
            limit: Some(Limit::default()),
            render,
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl<A> ReportView<A, ()> {
    /// Every group, in key order.
    pub fn listing(
        title: impl Into<String>,
        columns: &'static [&'static str],
        render: fn(&A) -> Vec<Column>,
    ) -> Self {
        ReportView {
            title: title.into(),
            columns,
            metric: |_| Ok(()),
            order: Order::Ascending,
            limit: None,
            render,
        }
    }
}

/// Title, header and renderer of a live single-aggregate report.
pub struct LiveView<A> {
    pub title: String,
    pub columns: &'static [&'static str],
    pub render: fn(&A) -> Vec<Column>,
}

/// Runs reporting passes against injected reference data.
pub struct ReportDriver<'r> {
    lookup: &'r dyn ReferenceLookup,
    mode: ExecutionMode,
}

impl<'r> ReportDriver<'r> {
    pub fn new(lookup: &'r dyn ReferenceLookup) -> Self {
        ReportDriver {
            lookup,
            mode: ExecutionMode::Sequential,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Reference data available for resolving attribute tables before a pass.
    pub fn lookup(&self) -> &'r dyn ReferenceLookup {
        self.lookup
    }

    /// Folds every record accepted by the plan's filter into its group.
    ///
    /// # Errors
    ///
    /// Aborts on the first source or classification failure; no partial
    /// grouping is returned.
    #[tracing::instrument(skip_all, fields(mode = ?self.mode))]
    pub fn aggregate<S, C, A>(
        &self,
        source: S,
        plan: &GroupPlan<C, A>,
    ) -> Result<Aggregated<C::Key, A>, ReportError>
    where
        S: RecordSource,
        C: Classifier,
        A: Aggregate,
    {
        let started = Instant::now();

        let aggregated = match self.mode {
            ExecutionMode::Sequential => fold(source.into_records(), plan)?,
            ExecutionMode::Parallel { partitions } => {
                let parts = source.partition(partitions)?;
                debug!(partitions = parts.len(), "Source partitioned");
                parts
                    .into_par_iter()
                    .map(|part| fold(part.into_iter().map(Ok::<_, ReportError>), plan))
                    .try_reduce(Aggregated::empty, |a, b| Ok(a.merge(b)))?
            }
        };

        info!(
            read = aggregated.read,
            matched = aggregated.matched,
            groups = aggregated.groups.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Grouping pass complete"
        );
        Ok(aggregated)
    }

    /// Runs a full grouped report and emits its rows to `sink`.
    ///
    /// Nothing is written to the sink unless aggregation and ranking both
    /// succeed. Returns the number of rows emitted.
    #[tracing::instrument(skip_all, fields(report = %view.title))]
    pub fn run<S, C, A, V>(
        &self,
        source: S,
        plan: &GroupPlan<C, A>,
        view: &ReportView<A, V>,
        sink: &mut dyn RowSink,
    ) -> Result<usize, ReportError>
    where
        S: RecordSource,
        C: Classifier,
        A: Aggregate,
        V: PartialOrd,
    {
        let aggregated = self.aggregate(source, plan)?;
        let ranked = rank(&aggregated.groups, view.metric, view.order, view.limit)?;

        let rows: Vec<RankedRow> = ranked
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let key = r.key.to_string();
                let name = C::ENTITY.and_then(|kind| self.lookup.display_name(kind, &key));
                RankedRow {
                    rank: i + 1,
                    key,
                    name,
                    columns: (view.render)(r.aggregate),
                }
            })
            .collect();

        sink.begin(&view.title, view.columns)?;
        for row in &rows {
            sink.emit(row)?;
        }
        sink.finish()?;

        debug!(rows = rows.len(), "Report emitted");
        Ok(rows.len())
    }

    /// Tracks a single aggregate, re-rendering it after every record the
    /// filter accepts. Always sequential.
    ///
    /// # Errors
    ///
    /// A source failure aborts the pass; the sink is not finished then.
    #[tracing::instrument(skip_all, fields(report = %view.title))]
    pub fn live<S, A>(
        &self,
        source: S,
        filter: &RecordFilter,
        mut aggregate: A,
        view: &LiveView<A>,
        sink: &mut dyn RowSink,
    ) -> Result<A, ReportError>
    where
        S: RecordSource,
        A: Aggregate,
    {
        if self.mode != ExecutionMode::Sequential {
            warn!("Live reports always run sequentially");
        }

        sink.begin(&view.title, view.columns)?;
        let mut matched = 0u64;
        for record in source.into_records() {
            let record = record?;
            if filter.matches(&record) {
                aggregate.accumulate(&record);
                matched += 1;
                sink.live(&(view.render)(&aggregate))?;
            }
        }
        sink.finish()?;

        info!(matched, "Live pass complete");
        Ok(aggregate)
    }

    /// Counts the records accepted by `filter`.
    #[tracing::instrument(skip_all)]
    pub fn total<S: RecordSource>(&self, source: S, filter: &RecordFilter) -> Result<u64, ReportError> {
        let mut count = 0u64;
        for record in source.into_records() {
            if filter.matches(&record?) {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn fold<I, C, A>(records: I, plan: &GroupPlan<C, A>) -> Result<Aggregated<C::Key, A>, ReportError>
where
    I: IntoIterator<Item = Result<FlightRecord, ReportError>>,
    C: Classifier,
    A: Aggregate,
{
    let mut aggregated = Aggregated::empty();
    for record in records {
        let record = record?;
        aggregated.read += 1;
        if plan.filter.matches(&record) {
            aggregated.groups.route(plan, &record)?;
            aggregated.matched += 1;
        }
    }
    Ok(aggregated)
}
