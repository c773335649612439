//! Per-project plot data: elevation curves of one night and the uber-up
//! heatmap over a range of nights.

use std::ops::Range;

use chrono::Timelike;
use ndarray::{s, Array2};

use crate::models::Project;
use crate::services::visibility::{ELEVATION_MAX, ELEVATION_MIN};
use crate::time::ObservingContext;

/// Number of hour ticks on the heatmap's vertical axis.
pub const HOUR_TICKS: usize = 10;

/// Maximum number of day ticks on the heatmap's horizontal axis.
pub const DAY_TICKS: usize = 7;

/// Elevation of one target over a night.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationCurve {
    pub name: String,
    pub elevation: Vec<f64>,
}

/// Elevation curves of a window of a project's targets for one night.
#[derive(Debug, Clone, PartialEq)]
pub struct UptimeCurves {
    /// `"<date> - <project>"`.
    pub title: String,
    /// Local sidereal time of each sample, made monotonic by shifting the
    /// hours after the midnight wrap down by 24.
    pub lst_axis: Vec<f64>,
    pub curves: Vec<ElevationCurve>,
    /// Targets shown, as a range over the project's targets.
    pub window: Range<usize>,
    pub band: (f64, f64),
}

impl UptimeCurves {
    /// `(min, max)` of the LST axis, `None` for an empty night.
    pub fn lst_range(&self) -> Option<(f64, f64)> {
        let min = self.lst_axis.iter().copied().reduce(f64::min)?;
        let max = self.lst_axis.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }

    /// Axis caption naming the 1-based source numbers shown.
    pub fn window_label(&self) -> String {
        format!(
            "Source Elevation [deg.] -- Sources {} to {}",
            self.window.start + 1,
            self.window.end
        )
    }
}

/// Elevation curves for the targets of `project` inside `window` on night `day`.
///
/// The window is clamped to the project's targets; targets without an
/// uptime for the context's grid are skipped. A night outside the grid
/// yields no axis and no curves.
pub fn project_uptime_curves(
    project: &Project,
    ctx: &ObservingContext,
    day: usize,
    window: Range<usize>,
) -> UptimeCurves {
    let grid = ctx.grid();
    let end = window.end.min(project.len());
    let window = window.start.min(end)..end;
    let band = (ELEVATION_MIN, ELEVATION_MAX);

    if day >= grid.day_count() {
        return UptimeCurves {
            title: String::new(),
            lst_axis: Vec::new(),
            curves: Vec::new(),
            window,
            band,
        };
    }

    let mut lst_axis: Vec<f64> = ctx.lst_hours().column(day).to_vec();
    if let Some(&last) = lst_axis.last() {
        for lst in lst_axis.iter_mut().filter(|lst| **lst > last) {
            *lst -= 24.0;
        }
    }

    let curves = project.targets()[window.clone()]
        .iter()
        .filter_map(|target| {
            let Some(uptime) = target.uptime_for(grid.spec()) else {
                log::debug!("No uptime for '{}' on the current grid", target.name);
                return None;
            };
            Some(ElevationCurve {
                name: target.name.clone(),
                elevation: uptime.elevation.column(day).to_vec(),
            })
        })
        .collect();

    UptimeCurves {
        title: format!("{} - {}", grid.day_names()[day], project.id),
        lst_axis,
        curves,
        window,
        band,
    }
}

/// Uber-up counts of a project over a range of nights, with axis ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct UberUpHeatmap {
    pub title: String,
    /// `(samples_per_day, days)` counts of targets up.
    pub values: Array2<u32>,
    /// `(row position, UT hour)` pairs.
    pub hour_ticks: Vec<(f64, u32)>,
    /// `(column position, day label)` pairs; positions are relative to `values`.
    pub day_ticks: Vec<(usize, String)>,
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Uber-up heatmap of `project` over day columns `day_start..day_end` (end
/// exclusive, clamped to the grid).
///
/// Hour ticks label ten evenly spaced rows with the UT hour they fall on,
/// counted from the grid's first instant. Day ticks are spaced by a sixth of
/// the inclusive range length, so at most seven are produced.
pub fn uber_up_heatmap(
    project: &mut Project,
    ctx: &ObservingContext,
    day_start: usize,
    day_end: usize,
) -> UberUpHeatmap {
    let grid = ctx.grid();
    let (rows, day_count) = grid.shape();
    let end = day_end.min(day_count);
    let start = day_start.min(end);

    let values = project.uber_up(rows, day_count).slice(s![.., start..end]).to_owned();

    let first_hour = grid
        .instants()
        .first()
        .map(|t| t.hour() as f64)
        .unwrap_or_default();
    let night_hours = rows as f64 * grid.sample_hours();
    let hour_ticks = if rows == 0 {
        Vec::new()
    } else {
        linspace(0.0, rows as f64, HOUR_TICKS)
            .into_iter()
            .zip(linspace(first_hour, first_hour + night_hours, HOUR_TICKS))
            .map(|(position, hour)| (position, hour as u32))
            .collect()
    };

    let span = day_end.saturating_sub(day_start) + 1;
    let step = span / (DAY_TICKS - 1);
    let mut day_ticks: Vec<(usize, String)> = Vec::new();
    for i in 0..DAY_TICKS {
        let day = start + i * step;
        if day >= end {
            break;
        }
        if day_ticks.last().is_some_and(|(pos, _)| *pos == day - start) {
            continue;
        }
        day_ticks.push((day - start, grid.day_names()[day].clone()));
    }

    UberUpHeatmap {
        title: project.id.clone(),
        values,
        hour_ticks,
        day_ticks,
    }
}
