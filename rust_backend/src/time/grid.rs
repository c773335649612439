//! Observation time grid.
//!
//! A grid has one column per night and one row per sub-hour sample. Column
//! `j`, row `i` holds `start + j days + nightly_offset + i / subdivisions`
//! hours, in UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{UptimeError, UptimeResult};
use crate::models::Observatory;
use crate::time::sidereal::datetime_to_jd;

/// Parameters a grid was built from.
///
/// Derived visibility matrices record the `GridSpec` they were computed against;
/// two grids with equal parameters hold identical instants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub start_date: NaiveDate,
    pub day_count: usize,
    pub hours_per_night: u32,
    pub subdivisions_per_hour: u32,
    pub nightly_start_offset_seconds: i64,
    pub site: Observatory,
}

impl GridSpec {
    pub fn samples_per_day(&self) -> usize {
        (self.hours_per_night * self.subdivisions_per_hour) as usize
    }

    /// Matrix shape `(samples_per_day, day_count)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.samples_per_day(), self.day_count)
    }

    /// Hours represented by one sample.
    pub fn sample_hours(&self) -> f64 {
        1.0 / self.subdivisions_per_hour as f64
    }
}

/// Two-dimensional array of observation instants for a date range.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    spec: GridSpec,
    instants: Array2<DateTime<Utc>>,
    julian_dates: Array2<f64>,
    day_names: Vec<String>,
}

impl TimeGrid {
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn site(&self) -> &Observatory {
        &self.spec.site
    }

    pub fn samples_per_day(&self) -> usize {
        self.spec.samples_per_day()
    }

    pub fn day_count(&self) -> usize {
        self.spec.day_count
    }

    pub fn shape(&self) -> (usize, usize) {
        self.spec.shape()
    }

    pub fn sample_hours(&self) -> f64 {
        self.spec.sample_hours()
    }

    pub fn instants(&self) -> &Array2<DateTime<Utc>> {
        &self.instants
    }

    pub fn julian_dates(&self) -> &Array2<f64> {
        &self.julian_dates
    }

    /// ISO date label (`YYYY-MM-DD`) of each day column.
    pub fn day_names(&self) -> &[String] {
        &self.day_names
    }

    pub fn is_empty(&self) -> bool {
        self.spec.day_count == 0 || self.spec.samples_per_day() == 0
    }

    /// `"<first day> -- <last day>"` for an inclusive column range, clamped to the grid.
    pub fn day_range_label(&self, day_start: usize, day_end: usize) -> String {
        if self.day_names.is_empty() {
            return String::new();
        }
        let last = self.day_names.len() - 1;
        let start = day_start.min(last);
        let end = day_end.clamp(start, last);
        format!("{} -- {}", self.day_names[start], self.day_names[end])
    }
}

/// Build a grid at the LMT site.
pub fn build_grid(
    start_date: NaiveDate,
    end_date: NaiveDate,
    hours_per_night: u32,
    subdivisions_per_hour: u32,
    nightly_start_offset: Duration,
) -> UptimeResult<TimeGrid> {
    build_grid_at(
        start_date,
        end_date,
        hours_per_night,
        subdivisions_per_hour,
        nightly_start_offset,
        Observatory::LMT,
    )
}

/// Build a grid for an explicit site.
pub fn build_grid_at(
    start_date: NaiveDate,
    end_date: NaiveDate,
    hours_per_night: u32,
    subdivisions_per_hour: u32,
    nightly_start_offset: Duration,
    site: Observatory,
) -> UptimeResult<TimeGrid> {
    if subdivisions_per_hour == 0 {
        return Err(UptimeError::InvalidGrid(
            "subdivisions_per_hour must be positive".to_string(),
        ));
    }
    if hours_per_night > 24 {
        return Err(UptimeError::InvalidGrid(format!(
            "hours_per_night must be at most 24, got {}",
            hours_per_night
        )));
    }

    // Both ends anchored at UTC midnight, so the difference is a whole number of days
    let day_count = (end_date - start_date).num_days().max(0) as usize;

    let spec = GridSpec {
        start_date,
        day_count,
        hours_per_night,
        subdivisions_per_hour,
        nightly_start_offset_seconds: nightly_start_offset.num_seconds(),
        site,
    };

    let midnight = Utc.from_utc_datetime(&start_date.and_time(NaiveTime::MIN));
    let first = midnight + nightly_start_offset;
    let subdivisions = subdivisions_per_hour as i64;

    let instants = Array2::from_shape_fn(spec.shape(), |(row, col)| {
        let offset_ms = row as i64 * 3_600_000 / subdivisions;
        first + Duration::days(col as i64) + Duration::milliseconds(offset_ms)
    });
    let julian_dates = instants.mapv(|t| datetime_to_jd(&t));

    let day_names = (0..day_count)
        .map(|col| {
            let day_start = first + Duration::days(col as i64);
            day_start.format("%Y-%m-%d").to_string()
        })
        .collect();

    log::debug!(
        "Built time grid from {} for {} days, {} samples per day",
        first.to_rfc3339(),
        day_count,
        spec.samples_per_day()
    );

    Ok(TimeGrid {
        spec,
        instants,
        julian_dates,
        day_names,
    })
}

/// Parse a configuration date written as `YYYY/MM/DD` or `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> UptimeResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|e| UptimeError::InvalidGrid(format!("invalid date '{}': {}", value, e)))
}
