pub mod config;
pub mod driver;
pub mod error;
pub mod grouping;
pub mod metrics;
pub mod output;
pub mod ranking;
pub mod record;
pub mod reference;
pub mod reports;
pub mod source;

pub use error::ReportError;
pub use record::FlightRecord;
