//! Ranked rows and the sinks that render them.
//!
//! Supports aligned text tables, CSV, JSON, and in-memory collection.

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;
use tracing::debug;

use crate::error::ReportError;

/// A single rendered metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Average(f64),
    /// Percentage in `0.0..=100.0`.
    Percent(f64),
    /// The value could not be computed (e.g. a rate over zero flights).
    Undefined,
}

impl MetricValue {
    /// Renders a rate as a percentage, leaving it blank when undefined.
    pub fn percent(rate: Result<f64, ReportError>) -> Self {
        rate.map_or(MetricValue::Undefined, |r| MetricValue::Percent(r * 100.0))
    }

    pub fn average(avg: Result<f64, ReportError>) -> Self {
        avg.map_or(MetricValue::Undefined, MetricValue::Average)
    }

    pub fn render(&self) -> String {
        match self {
            MetricValue::Count(n) => thousands(*n),
            MetricValue::Average(v) | MetricValue::Percent(v) => format!("{v:.1}"),
            MetricValue::Undefined => String::new(),
        }
    }
}

impl From<usize> for MetricValue {
    fn from(n: usize) -> Self {
        MetricValue::Count(n as u64)
    }
}

impl From<u64> for MetricValue {
    fn from(n: u64) -> Self {
        MetricValue::Count(n)
    }
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub value: MetricValue,
}

impl Column {
    pub fn new(name: &'static str, value: impl Into<MetricValue>) -> Self {
        Column {
            name,
            value: value.into(),
        }
    }
}

/// One output row of a report, in final rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<Column>,
}

impl RankedRow {
    pub fn value(&self, column: &str) -> Option<MetricValue> {
        self.columns.iter().find(|c| c.name == column).map(|c| c.value)
    }
}

/// Destination for report output.
///
/// Grouped reports call `begin`, then `emit` once per row, then `finish`.
/// Live reports call `begin`, `live` after every matching record, then
/// `finish`. `finish` is only called when the pass completed.
pub trait RowSink {
    fn begin(&mut self, title: &str, columns: &[&'static str]) -> Result<(), ReportError>;

    fn emit(&mut self, row: &RankedRow) -> Result<(), ReportError>;

    /// Replaces the current live snapshot. Sinks may coalesce updates.
    fn live(&mut self, columns: &[Column]) -> Result<(), ReportError>;

    fn finish(&mut self) -> Result<(), ReportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

/// Builds the sink for `format` writing to `writer`.
pub fn sink_for<'w, W: Write + 'w>(format: OutputFormat, writer: W) -> Box<dyn RowSink + 'w> {
    match format {
        OutputFormat::Table => Box::new(TableSink::new(writer)),
        OutputFormat::Csv => Box::new(CsvSink::new(writer)),
        OutputFormat::Json => Box::new(JsonSink::new(writer)),
    }
}

/// Tab-separated text table. Live snapshots overwrite the current line.
pub struct TableSink<W: Write> {
    out: W,
    every: usize,
    updates: usize,
    pending: Option<Vec<Column>>,
}

impl<W: Write> TableSink<W> {
    pub fn new(out: W) -> Self {
        TableSink {
            out,
            every: 1,
            updates: 0,
            pending: None,
        }
    }

    /// Redraw live snapshots only on every `every`th update (and at the end).
    pub fn coalesce(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw_live(&mut self, columns: &[Column]) -> Result<(), ReportError> {
        let line = columns
            .iter()
            .map(|c| format!("{:>10}", c.value.render()))
            .collect::<Vec<_>>()
            .join("\t");
        write!(self.out, "{line}\r")?;
        self.out.flush()?;
        Ok(())
    }
}

fn truncate(name: &str, width: usize) -> String {
    name.chars().take(width).collect()
}

impl<W: Write> RowSink for TableSink<W> {
    fn begin(&mut self, title: &str, columns: &[&'static str]) -> Result<(), ReportError> {
        writeln!(self.out, "\n{title}\n")?;
        let mut cells = vec![format!("{:>10}", "key"), format!("{:<30}", "name")];
        cells.extend(columns.iter().map(|c| format!("{c:>10}")));
        let header = cells.join("\t");
        writeln!(self.out, "{header}")?;
        writeln!(self.out, "{}", "-".repeat(header.len() + cells.len() * 4))?;
        Ok(())
    }

    fn emit(&mut self, row: &RankedRow) -> Result<(), ReportError> {
        let mut cells = vec![
            format!("{:>10}", row.key),
            format!("{:<30}", truncate(row.name.as_deref().unwrap_or(""), 29)),
        ];
        cells.extend(row.columns.iter().map(|c| format!("{:>10}", c.value.render())));
        writeln!(self.out, "{}", cells.join("\t"))?;
        Ok(())
    }

    fn live(&mut self, columns: &[Column]) -> Result<(), ReportError> {
        self.updates += 1;
        if self.updates % self.every == 0 {
            self.pending = None;
            self.draw_live(columns)
        } else {
            self.pending = Some(columns.to_vec());
            Ok(())
        }
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        if let Some(columns) = self.pending.take() {
            self.draw_live(&columns)?;
        }
        if self.updates > 0 {
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// CSV output with a single header record.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        CsvSink {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(out),
        }
    }

    pub fn into_inner(self) -> Result<W, ReportError> {
        self.writer
            .into_inner()
            .map_err(|e| ReportError::Sink(e.to_string()))
    }
}

fn sink_error(e: csv::Error) -> ReportError {
    ReportError::Sink(e.to_string())
}

impl<W: Write> RowSink for CsvSink<W> {
    fn begin(&mut self, _title: &str, columns: &[&'static str]) -> Result<(), ReportError> {
        let mut header = vec!["rank", "key", "name"];
        header.extend_from_slice(columns);
        self.writer.write_record(&header).map_err(sink_error)
    }

    fn emit(&mut self, row: &RankedRow) -> Result<(), ReportError> {
        let mut record = vec![
            row.rank.to_string(),
            row.key.clone(),
            row.name.clone().unwrap_or_default(),
        ];
        record.extend(row.columns.iter().map(|c| c.value.render().replace(',', "")));
        self.writer.write_record(&record).map_err(sink_error)
    }

    fn live(&mut self, columns: &[Column]) -> Result<(), ReportError> {
        let mut record = vec![String::new(), String::new(), String::new()];
        record.extend(columns.iter().map(|c| c.value.render().replace(',', "")));
        self.writer.write_record(&record).map_err(sink_error)
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: &'a str,
    rows: &'a [RankedRow],
    #[serde(skip_serializing_if = "Option::is_none")]
    live: Option<&'a [Column]>,
}

/// Buffers the report and writes one pretty-printed JSON document on finish.
pub struct JsonSink<W: Write> {
    out: W,
    title: String,
    rows: Vec<RankedRow>,
    live: Option<Vec<Column>>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        JsonSink {
            out,
            title: String::new(),
            rows: Vec::new(),
            live: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowSink for JsonSink<W> {
    fn begin(&mut self, title: &str, _columns: &[&'static str]) -> Result<(), ReportError> {
        self.title = title.to_string();
        Ok(())
    }

    fn emit(&mut self, row: &RankedRow) -> Result<(), ReportError> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn live(&mut self, columns: &[Column]) -> Result<(), ReportError> {
        self.live = Some(columns.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        let report = JsonReport {
            title: &self.title,
            rows: &self.rows,
            live: self.live.as_deref(),
        };
        serde_json::to_writer_pretty(&mut self.out, &report)?;
        writeln!(self.out)?;
        debug!(rows = self.rows.len(), "JSON report written");
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub title: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<RankedRow>,
    pub live_updates: Vec<Vec<Column>>,
    pub finished: bool,
}

impl RowSink for CollectSink {
    fn begin(&mut self, title: &str, columns: &[&'static str]) -> Result<(), ReportError> {
        self.title = title.to_string();
        self.columns = columns.to_vec();
        Ok(())
    }

    fn emit(&mut self, row: &RankedRow) -> Result<(), ReportError> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn live(&mut self, columns: &[Column]) -> Result<(), ReportError> {
        self.live_updates.push(columns.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rank: usize, key: &str, count: u64) -> RankedRow {
        RankedRow {
            rank,
            key: key.to_string(),
            name: Some("John F Kennedy International Airport".to_string()),
            columns: vec![
                Column::new("count", count),
                Column::new("cancelled %", MetricValue::Undefined),
            ],
        }
    }

    #[test]
    fn test_render_values() {
        assert_eq!(MetricValue::Count(1234567).render(), "1,234,567");
        assert_eq!(MetricValue::Count(999).render(), "999");
        assert_eq!(MetricValue::Average(12.345).render(), "12.3");
        assert_eq!(MetricValue::Undefined.render(), "");
    }

    #[test]
    fn test_percent_from_rate() {
        assert_eq!(MetricValue::percent(Ok(0.25)), MetricValue::Percent(25.0));
        assert_eq!(
            MetricValue::percent(Err(ReportError::DivisionUndefined { metric: "rate" })),
            MetricValue::Undefined
        );
    }

    #[test]
    fn test_table_sink_truncates_name() {
        let mut sink = TableSink::new(Vec::new());
        sink.begin("Airports", &["count", "cancelled %"]).unwrap();
        sink.emit(&row(1, "JFK", 2500)).unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("Airports"));
        assert!(text.contains("JFK"));
        assert!(text.contains("2,500"));
        assert!(text.contains("John F Kennedy International"));
        assert!(!text.contains("International Airport"));
    }

    #[test]
    fn test_table_header_aligns_with_rows() {
        let mut sink = TableSink::new(Vec::new());
        sink.begin("Airports", &["count", "cancelled %"]).unwrap();
        sink.emit(&row(1, "JFK", 2500)).unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().filter(|l| !l.is_empty()).collect();
        let header: Vec<_> = lines[1].split('\t').collect();
        let first: Vec<_> = lines[3].split('\t').collect();

        assert_eq!(header.len(), first.len());
        assert_eq!(header[0].trim(), "key");
        assert_eq!(header[1].trim(), "name");
        assert_eq!(header[2].trim(), "count");
        assert_eq!(header[2].len(), first[2].len());
        assert_eq!(first[2].trim(), "2,500");
    }

    #[test]
    fn test_table_sink_coalesces_live_updates() {
        let mut sink = TableSink::new(Vec::new()).coalesce(3);
        sink.begin("Live", &["total"]).unwrap();
        for n in 1..=4u64 {
            sink.live(&[Column::new("total", n)]).unwrap();
        }
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.matches('\r').count(), 2);
        assert!(text.trim_end().ends_with("4"));
    }

    #[test]
    fn test_csv_sink_writes_header_once() {
        let mut sink = CsvSink::new(Vec::new());
        sink.begin("ignored", &["count", "cancelled %"]).unwrap();
        sink.emit(&row(1, "JFK", 1200)).unwrap();
        sink.emit(&row(2, "LAX", 7)).unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "rank,key,name,count,cancelled %");
        assert_eq!(lines[1], "1,JFK,John F Kennedy International Airport,1200,");
    }

    #[test]
    fn test_json_sink_document() {
        let mut sink = JsonSink::new(Vec::new());
        sink.begin("Most flights", &["count"]).unwrap();
        sink.emit(&row(1, "JFK", 3)).unwrap();
        sink.finish().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(value["title"], "Most flights");
        assert_eq!(value["rows"][0]["key"], "JFK");
        assert_eq!(value["rows"][0]["columns"][0]["value"], 3);
        assert!(value["rows"][0]["columns"][1]["value"].is_null());
    }

    #[test]
    fn test_row_value_lookup() {
        let r = row(1, "JFK", 5);
        assert_eq!(r.value("count"), Some(MetricValue::Count(5)));
        assert_eq!(r.value("missing"), None);
    }
}
