//! Environment-driven settings for the command-line front end.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file:
//!
//! | variable | default |
//! |---|---|
//! | `FLIGHT_DATA_PATH` | `data/flights.csv` |
//! | `REFERENCE_DIR` | `data/reference` |
//! | `LOG_FILE_PATH` | `logs/flight_stats.log` |
//! | `FLIGHT_STATS_PARTITIONS` | unset (sequential) |

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub reference_dir: PathBuf,
    pub log_file_path: PathBuf,
    /// Default partition count for parallel passes.
    pub partitions: Option<usize>,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |name: &str, default: &str| {
            PathBuf::from(get(name).unwrap_or_else(|| default.to_string()))
        };

        let partitions = match get("FLIGHT_STATS_PARTITIONS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("FLIGHT_STATS_PARTITIONS must be a positive integer, got '{raw}'"))?,
            ),
            None => None,
        };

        Ok(AppConfig {
            data_path: path("FLIGHT_DATA_PATH", "data/flights.csv"),
            reference_dir: path("REFERENCE_DIR", "data/reference"),
            log_file_path: path("LOG_FILE_PATH", "logs/flight_stats.log"),
            partitions,
        })
    }

    pub fn log_dir(&self) -> &Path {
        self.log_file_path.parent().unwrap_or(Path::new("logs"))
    }

    pub fn log_file_name(&self) -> &OsStr {
        self.log_file_path
            .file_name()
            .unwrap_or(OsStr::new("flight_stats.log"))
    }
}
