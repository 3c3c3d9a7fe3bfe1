//! CLI entry point for the flight statistics tool.
//!
//! Provides subcommands for ranked reports, live single-subject metrics,
//! filtered totals, and listing the report catalogue.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flight_stats::config::AppConfig;
use flight_stats::driver::{ExecutionMode, ReportDriver};
use flight_stats::grouping::{Predicate, RecordFilter};
use flight_stats::output::{OutputFormat, TableSink, sink_for};
use flight_stats::ranking::{Limit, Order};
use flight_stats::ReportError;
use flight_stats::reference::{AttributeTable, ReferenceLookup, Registry};
use flight_stats::reports::{LiveSubject, ReportKind, ReportParams, execute, execute_live};
use flight_stats::source::CsvSource;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "flight_stats")]
#[command(about = "Ranked statistics over flight records", long_about = None)]
struct Cli {
    /// Flight data CSV (defaults to FLIGHT_DATA_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Record filters shared by every subcommand.
#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    /// Only flights departing from this airport
    #[arg(long)]
    origin: Option<String>,

    /// Only flights arriving at this airport
    #[arg(long)]
    destination: Option<String>,

    /// Only flights operated by this carrier
    #[arg(long)]
    carrier: Option<String>,

    /// Only flights in this calendar year
    #[arg(long)]
    year: Option<i32>,

    /// Only flights of at most this many miles
    #[arg(long)]
    max_distance: Option<u32>,

    /// Only flights departing from or arriving in this state
    #[arg(long)]
    state: Option<String>,
}

impl FilterArgs {
    /// Builds the record filter; a state filter is resolved against `lookup`.
    fn to_filter(&self, lookup: &dyn ReferenceLookup) -> RecordFilter {
        let mut filter = RecordFilter::all();
        if let Some(code) = &self.origin {
            filter = filter.with(Predicate::Origin(code.to_uppercase()));
        }
        if let Some(code) = &self.destination {
            filter = filter.with(Predicate::Destination(code.to_uppercase()));
        }
        if let Some(code) = &self.carrier {
            filter = filter.with(Predicate::Carrier(code.to_uppercase()));
        }
        if let Some(year) = self.year {
            filter = filter.with(Predicate::Year(year));
        }
        if let Some(miles) = self.max_distance {
            filter = filter.with(Predicate::MaxDistance(miles));
        }
        if let Some(state) = &self.state {
            let states = AttributeTable::airport_states(lookup);
            filter = filter.with(Predicate::state(&state.to_uppercase(), &states));
        }
        filter
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a grouped, ranked report
    Report {
        #[arg(value_enum)]
        kind: ReportKind,

        /// Number of rows to show (1-100)
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Override the report's sort direction
        #[arg(long, value_enum)]
        order: Option<Order>,

        /// Split the input into this many partitions processed in parallel
        #[arg(short, long)]
        parallel: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Follow one airport or carrier, updating totals as records stream in
    Live {
        #[command(subcommand)]
        subject: LiveCommand,
    },
    /// Count operated flights matching the filters
    Total {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List available reports
    List,
}

#[derive(Subcommand)]
enum LiveCommand {
    Airport {
        code: String,

        /// Redraw every N matching flights
        #[arg(long, default_value_t = 1)]
        every: usize,

        #[arg(long)]
        year: Option<i32>,
    },
    Carrier {
        code: String,

        #[arg(long, default_value_t = 1)]
        every: usize,

        #[arg(long)]
        year: Option<i32>,
    },
}

/// Exit status for a failed run: 2 when the invocation itself was invalid,
/// 1 for data, I/O and other runtime failures.
fn exit_code(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<ReportError>() {
        Some(report) if report.is_configuration() => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        }
    };

    // Logging setup: colored stderr + JSON rolling log file
    let file_appender = tracing_appender::rolling::daily(config.log_dir(), config.log_file_name());
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Report failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    let data_path = cli.data.unwrap_or_else(|| config.data_path.clone());

    match cli.command {
        Commands::List => {
            for kind in <ReportKind as clap::ValueEnum>::value_variants() {
                println!("{:<40}{}", kind.to_string(), kind.description());
            }
        }
        Commands::Report {
            kind,
            limit,
            order,
            parallel,
            format,
            filter,
        } => {
            let limit = Limit::new(limit)?;
            let registry = Registry::load(&config.reference_dir)
                .with_context(|| format!("loading reference data from {}", config.reference_dir.display()))?;

            let mode = match parallel.or(config.partitions) {
                Some(partitions) if partitions > 1 => ExecutionMode::Parallel { partitions },
                _ => ExecutionMode::Sequential,
            };
            let driver = ReportDriver::new(&registry).with_mode(mode);
            let params = ReportParams {
                limit,
                order,
                filter: filter.to_filter(&registry),
            };

            let source = CsvSource::open(&data_path)
                .with_context(|| format!("opening {}", data_path.display()))?;
            let stdout = io::stdout();
            let mut sink = sink_for(format, stdout.lock());
            let rows = execute(kind, &driver, source, &params, sink.as_mut())?;
            info!(report = %kind, rows, "Report complete");
        }
        Commands::Live { subject } => {
            let (subject, every, year) = match subject {
                LiveCommand::Airport { code, every, year } => {
                    (LiveSubject::Airport(code.to_uppercase()), every, year)
                }
                LiveCommand::Carrier { code, every, year } => {
                    (LiveSubject::Carrier(code.to_uppercase()), every, year)
                }
            };
            let registry = Registry::load(&config.reference_dir)?;
            let filter = FilterArgs {
                year,
                ..Default::default()
            }
            .to_filter(&registry);

            let driver = ReportDriver::new(&registry);
            let source = CsvSource::open(&data_path)
                .with_context(|| format!("opening {}", data_path.display()))?;
            let stdout = io::stdout();
            let mut sink = TableSink::new(stdout.lock()).coalesce(every);
            execute_live(&subject, &driver, source, filter, &mut sink)?;
        }
        Commands::Total { filter } => {
            let registry = Registry::load(&config.reference_dir)?;
            let driver = ReportDriver::new(&registry);
            let source = CsvSource::open(&data_path)
                .with_context(|| format!("opening {}", data_path.display()))?;
            let filter = RecordFilter::operated().and(filter.to_filter(&registry));
            let count = driver.total(source, &filter)?;
            println!("Total flights matching {:?}: {count}", filter.predicates());
        }
    }

    Ok(())
}
