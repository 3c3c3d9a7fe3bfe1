//! Single-pass sources of flight records.
//!
//! A source is consumed by value, so an exhausted source can never be read
//! again; its underlying reader is released when the iterator is dropped,
//! whether the pass completes or fails partway through.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::vec;

use tracing::debug;

use crate::error::ReportError;
use crate::record::FlightRecord;

/// A finite, lazily read sequence of flight records.
pub trait RecordSource {
    type Records: Iterator<Item = Result<FlightRecord, ReportError>>;

    fn into_records(self) -> Self::Records;

    /// Splits the source into `parts` disjoint partitions whose union is the
    /// full record set. `parts == 0` is treated as a single partition.
    ///
    /// The default implementation reads the whole source into memory before
    /// splitting it, so a parallel pass holds every record at once while a
    /// sequential pass streams them. Sources that can seek or shard their
    /// input should override it.
    ///
    /// # Errors
    ///
    /// Fails with the first read error; no partitions are returned then.
    fn partition(self, parts: usize) -> Result<Vec<Vec<FlightRecord>>, ReportError>
    where
        Self: Sized,
    {
        let records = self.into_records().collect::<Result<Vec<_>, _>>()?;
        Ok(split(records, parts))
    }
}

/// Splits `records` into `parts` contiguous chunks of near-equal size.
pub fn split(records: Vec<FlightRecord>, parts: usize) -> Vec<Vec<FlightRecord>> {
    let parts = parts.max(1);
    let chunk = records.len().div_ceil(parts).max(1);
    let mut partitions = Vec::with_capacity(parts);
    let mut rest = records.into_iter();

    for _ in 0..parts {
        partitions.push(rest.by_ref().take(chunk).collect());
    }

    partitions
}

type CsvRecords<R> = std::iter::Map<
    csv::DeserializeRecordsIntoIter<R, FlightRecord>,
    fn(csv::Result<FlightRecord>) -> Result<FlightRecord, ReportError>,
>;

/// Headered CSV with one flight per row.
pub struct CsvSource<R: Read> {
    reader: csv::Reader<R>,
}

impl CsvSource<File> {
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        debug!(path = %path.display(), "Opening flight data");
        let file = File::open(path)?;
        Ok(CsvSource::from_reader(file))
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Self {
        CsvSource {
            reader: csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader),
        }
    }
}

impl<R: Read> RecordSource for CsvSource<R> {
    type Records = CsvRecords<R>;

    fn into_records(self) -> Self::Records {
        let convert: fn(csv::Result<FlightRecord>) -> Result<FlightRecord, ReportError> =
            |row| row.map_err(ReportError::from);
        self.reader.into_deserialize().map(convert)
    }
}

/// Records already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<FlightRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<FlightRecord>) -> Self {
        MemorySource { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for MemorySource {
    type Records = std::iter::Map<
        vec::IntoIter<FlightRecord>,
        fn(FlightRecord) -> Result<FlightRecord, ReportError>,
    >;

    fn into_records(self) -> Self::Records {
        let wrap: fn(FlightRecord) -> Result<FlightRecord, ReportError> = Ok;
        self.records.into_iter().map(wrap)
    }

    fn partition(self, parts: usize) -> Result<Vec<Vec<FlightRecord>>, ReportError> {
        Ok(split(self.records, parts))
    }
}
