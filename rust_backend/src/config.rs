//! Availability configuration file support.
//!
//! Reads the observing window, the project groups and their catalogs, and
//! the pressure weights from a TOML file:
//!
//! ```toml
//! [date]
//! start_date = "2025/01/01"
//! end_date = "2025/07/01"
//! nhours = 13
//! nsubhours = 4
//! semester = "2025-S1"
//!
//! [project]
//! prjs = ["MX", "US", "UM"]
//!
//! [project.filename_dict]
//! MX = "catalogs/mx_targets.csv"
//!
//! [pressure]
//! efficiency = 0.5
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{UptimeError, UptimeResult};
use crate::models::Instrument;
use crate::services::pressure::PressureSettings;
use crate::time::{build_grid, parse_date, ObservingContext, TimeGrid};

/// Environment variable holding the configuration file path.
pub const CONFIG_ENV_VAR: &str = "SOURCE_CONFIG_PATH";

/// Availability configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    pub date: DateSettings,
    #[serde(default)]
    pub project: ProjectSettings,
    #[serde(default)]
    pub pressure: PressureConfig,
    /// Directory relative catalog paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Observing window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSettings {
    /// First night, `YYYY/MM/DD` or `YYYY-MM-DD`.
    pub start_date: String,
    /// Night after the last one, same format.
    pub end_date: String,
    /// Hours sampled per night.
    #[serde(default = "default_nhours")]
    pub nhours: u32,
    /// Samples per hour.
    #[serde(default = "default_nsubhours")]
    pub nsubhours: u32,
    #[serde(default)]
    pub semester: String,
    /// UT hour of each night's first sample.
    #[serde(default = "default_nightly_start_offset_hours")]
    pub nightly_start_offset_hours: f64,
}

/// Project groups and their catalogs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Groups loaded by default.
    #[serde(default)]
    pub prjs: Vec<String>,
    /// Catalog file per group code.
    #[serde(default)]
    pub filename_dict: BTreeMap<String, PathBuf>,
}

/// Pressure plot weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureConfig {
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    #[serde(default = "default_group_weights")]
    pub group_weights: BTreeMap<String, f64>,
    /// Per-instrument multipliers; instruments not listed weigh 1.0.
    #[serde(default)]
    pub instrument_weights: BTreeMap<String, f64>,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            efficiency: default_efficiency(),
            group_weights: default_group_weights(),
            instrument_weights: BTreeMap::new(),
        }
    }
}

fn default_nhours() -> u32 {
    13
}

fn default_nsubhours() -> u32 {
    4
}

fn default_nightly_start_offset_hours() -> f64 {
    3.0
}

fn default_efficiency() -> f64 {
    PressureSettings::default().efficiency
}

fn default_group_weights() -> BTreeMap<String, f64> {
    PressureSettings::default().group_weights
}

impl AvailabilityConfig {
    /// Parse configuration text. Relative catalog paths resolve against the
    /// current directory.
    pub fn from_toml_str(content: &str) -> UptimeResult<Self> {
        toml::from_str(content)
            .map_err(|e| UptimeError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration from a TOML file. Relative catalog paths resolve
    /// against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> UptimeResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            UptimeError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Load configuration from the file named by `SOURCE_CONFIG_PATH`.
    pub fn from_env() -> UptimeResult<Self> {
        let path = std::env::var_os(CONFIG_ENV_VAR).ok_or_else(|| {
            UptimeError::Config(format!("{} is not set", CONFIG_ENV_VAR))
        })?;
        Self::from_file(PathBuf::from(path))
    }

    pub fn start_date(&self) -> UptimeResult<NaiveDate> {
        parse_date(&self.date.start_date).map_err(|e| UptimeError::Config(e.to_string()))
    }

    pub fn end_date(&self) -> UptimeResult<NaiveDate> {
        parse_date(&self.date.end_date).map_err(|e| UptimeError::Config(e.to_string()))
    }

    pub fn nightly_start_offset(&self) -> UptimeResult<Duration> {
        let hours = self.date.nightly_start_offset_hours;
        if !hours.is_finite() || !(0.0..24.0).contains(&hours) {
            return Err(UptimeError::Config(format!(
                "nightly_start_offset_hours must be in [0, 24), got {}",
                hours
            )));
        }
        Ok(Duration::seconds((hours * 3600.0).round() as i64))
    }

    /// Build the observation grid described by the `[date]` section.
    pub fn build_grid(&self) -> UptimeResult<TimeGrid> {
        build_grid(
            self.start_date()?,
            self.end_date()?,
            self.date.nhours,
            self.date.nsubhours,
            self.nightly_start_offset()?,
        )
    }

    pub fn build_context(&self) -> UptimeResult<ObservingContext> {
        Ok(ObservingContext::new(self.build_grid()?))
    }

    /// Catalog path of a group, matched case-insensitively.
    pub fn catalog_path(&self, group: &str) -> Option<PathBuf> {
        let group = group.trim();
        let path = self
            .project
            .filename_dict
            .get(&group.to_uppercase())
            .or_else(|| {
                self.project
                    .filename_dict
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(group))
                    .map(|(_, path)| path)
            })?;
        Some(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        })
    }

    /// Pressure weights, with instrument names validated.
    pub fn pressure_settings(&self) -> UptimeResult<PressureSettings> {
        let mut settings = PressureSettings {
            group_weights: self.pressure.group_weights.clone(),
            efficiency: self.pressure.efficiency,
            ..PressureSettings::default()
        };
        for (name, weight) in &self.pressure.instrument_weights {
            let instrument = name.parse::<Instrument>().map_err(UptimeError::Config)?;
            settings.instrument_weights[instrument.index()] = *weight;
        }
        Ok(settings)
    }

    /// Heading shown above the plots.
    pub fn title(&self) -> String {
        if self.date.semester.is_empty() {
            "LMT Source Availability".to_string()
        } else {
            format!("LMT Source Availability {}", self.date.semester)
        }
    }
}
