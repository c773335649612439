//! Source availability report.
//!
//! Loads the catalogs named by an availability configuration, computes (or
//! reads from cache) their visibility, and prints one plot view as JSON.
//!
//! # Usage
//!
//! ```bash
//! uptime-report [CONFIG] [VIEW] [RANKS] [PROJECT] [DAY]
//! ```
//!
//! - `CONFIG`: configuration file (default: `$SOURCE_CONFIG_PATH`)
//! - `VIEW`: `pressure` (default), `season`, `uptimes` or `uberup`
//! - `RANKS`: comma separated ranks (default: `A,B,C,D`)
//! - `PROJECT`: index of the selected project for `uptimes`/`uberup` (default: 0)
//! - `DAY`: night shown by `uptimes` (default: 0)
//!
//! # Environment Variables
//!
//! - `SOURCE_CONFIG_PATH`: configuration file when `CONFIG` is not given
//! - `RUST_LOG`: Log level (default: info)

use std::env;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use uptime_rust::api::{
    PressurePlotData, SeasonPlotData, UberUpPlotData, UptimePlotData, PRESSURE_VIEW, SEASON_VIEW,
    UBER_UP_VIEW, UPTIMES_VIEW,
};
use uptime_rust::models::Rank;
use uptime_rust::{AvailabilityConfig, Session};

fn parse_ranks(value: &str) -> Result<Vec<Rank>> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Rank>().map_err(|e| anyhow!(e)))
        .collect()
}

fn parse_index(value: Option<&String>, name: &str) -> Result<usize> {
    match value {
        Some(v) => v
            .parse()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", name, v)),
        None => Ok(0),
    }
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => AvailabilityConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AvailabilityConfig::from_env().context("No configuration file given")?,
    };
    let view = args.get(2).map(String::as_str).unwrap_or(PRESSURE_VIEW);
    let ranks = match args.get(3) {
        Some(value) => parse_ranks(value)?,
        None => Rank::ALL.to_vec(),
    };
    let project_index = parse_index(args.get(4), "PROJECT")?;
    let day = parse_index(args.get(5), "DAY")?;

    info!("{}", config.title());
    let mut session = Session::from_config(&config).context("Failed to build the time grid")?;
    let day_count = session.context().grid().day_count();

    let json = match view {
        PRESSURE_VIEW => {
            let settings = config.pressure_settings()?;
            let profile = session.pressure(&ranks, &settings, 0, day_count.saturating_sub(1));
            serde_json::to_string_pretty(&PressurePlotData::from(&profile))?
        }
        SEASON_VIEW => {
            let season = session.season(&ranks, 0, day_count);
            serde_json::to_string_pretty(&SeasonPlotData::from(&season))?
        }
        UPTIMES_VIEW => {
            let curves = session
                .uptime_curves(&ranks, project_index, day)
                .ok_or_else(|| anyhow!("No selected project at index {}", project_index))?;
            let data = UptimePlotData::new(&curves, session.window.message());
            serde_json::to_string_pretty(&data)?
        }
        UBER_UP_VIEW => {
            let heatmap = session
                .uber_up(&ranks, project_index, 0, day_count)
                .ok_or_else(|| anyhow!("No selected project at index {}", project_index))?;
            serde_json::to_string_pretty(&UberUpPlotData::from(&heatmap))?
        }
        other => bail!(
            "Unknown view '{}', expected one of {}, {}, {}, {}",
            other,
            PRESSURE_VIEW,
            SEASON_VIEW,
            UPTIMES_VIEW,
            UBER_UP_VIEW
        ),
    };

    println!("{}", json);
    Ok(())
}
