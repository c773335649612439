//! Presentation DTOs.
//!
//! Each plot view gets one serializable type carrying the series, axes and
//! labels a front end needs, built from the matching service output.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::services::pressure::{DemandSeries, PressureProfile};
use crate::services::season::SeasonMatrix;
use crate::services::uptimes::{ElevationCurve, UberUpHeatmap, UptimeCurves};

/// View name constants, as accepted by the report binary.
pub const PRESSURE_VIEW: &str = "pressure";
pub const SEASON_VIEW: &str = "season";
pub const UPTIMES_VIEW: &str = "uptimes";
pub const UBER_UP_VIEW: &str = "uberup";

fn rows_of<T: Clone>(matrix: &Array2<T>) -> Vec<Vec<T>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Stacked demand bars with the reference availability line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressurePlotData {
    pub title: String,
    /// LST hour of each bar, `0..24`.
    pub lst_hours: Vec<u32>,
    pub series: Vec<DemandSeries>,
    pub reference: Vec<f64>,
    pub reference_label: String,
    pub total_demand: Vec<f64>,
}

impl From<&PressureProfile> for PressurePlotData {
    fn from(profile: &PressureProfile) -> Self {
        Self {
            title: profile.title.clone(),
            lst_hours: (0..profile.reference.len() as u32).collect(),
            series: profile.series(),
            reference: profile.reference.to_vec(),
            reference_label: profile.reference_label(),
            total_demand: profile.total_demand().to_vec(),
        }
    }
}

/// Fraction-up heatmap, projects by days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonPlotData {
    pub title: String,
    pub projects: Vec<String>,
    pub days: Vec<String>,
    /// One row per project.
    pub values: Vec<Vec<f64>>,
}

impl From<&SeasonMatrix> for SeasonPlotData {
    fn from(season: &SeasonMatrix) -> Self {
        Self {
            title: season.title.clone(),
            projects: season.projects.clone(),
            days: season.days.clone(),
            values: rows_of(&season.values),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationSeries {
    pub name: String,
    pub elevation: Vec<f64>,
}

impl From<&ElevationCurve> for ElevationSeries {
    fn from(curve: &ElevationCurve) -> Self {
        Self {
            name: curve.name.clone(),
            elevation: curve.elevation.clone(),
        }
    }
}

/// Elevation against LST for one night.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimePlotData {
    pub title: String,
    pub y_label: String,
    pub lst_axis: Vec<f64>,
    /// `(min, max)` of `lst_axis`; absent for an empty night.
    pub lst_range: Option<(f64, f64)>,
    pub band: (f64, f64),
    pub series: Vec<ElevationSeries>,
    /// Status line of the source window.
    pub message: String,
}

impl UptimePlotData {
    pub fn new(curves: &UptimeCurves, message: impl Into<String>) -> Self {
        Self {
            title: curves.title.clone(),
            y_label: curves.window_label(),
            lst_axis: curves.lst_axis.clone(),
            lst_range: curves.lst_range(),
            band: curves.band,
            series: curves.curves.iter().map(ElevationSeries::from).collect(),
            message: message.into(),
        }
    }
}

/// Targets-up counts for one project, UT samples by days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UberUpPlotData {
    pub title: String,
    /// One row per sample of the night.
    pub values: Vec<Vec<u32>>,
    pub hour_tick_positions: Vec<f64>,
    pub hour_tick_labels: Vec<u32>,
    pub day_tick_positions: Vec<usize>,
    pub day_tick_labels: Vec<String>,
}

impl From<&UberUpHeatmap> for UberUpPlotData {
    fn from(heatmap: &UberUpHeatmap) -> Self {
        let (hour_tick_positions, hour_tick_labels) = heatmap.hour_ticks.iter().copied().unzip();
        let (day_tick_positions, day_tick_labels) = heatmap.day_ticks.iter().cloned().unzip();
        Self {
            title: heatmap.title.clone(),
            values: rows_of(&heatmap.values),
            hour_tick_positions,
            hour_tick_labels,
            day_tick_positions,
            day_tick_labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_season_rows_follow_projects() {
        let season = SeasonMatrix {
            values: array![[0.5, 1.0], [0.0, 0.25]],
            projects: vec!["MX-01".into(), "MX-02".into()],
            days: vec!["2025-01-01".into(), "2025-01-02".into()],
            day_start: 0,
            title: "2025-01-01 -- 2025-01-02".into(),
        };
        let data = SeasonPlotData::from(&season);
        assert_eq!(data.values, vec![vec![0.5, 1.0], vec![0.0, 0.25]]);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["projects"][1], "MX-02");
        assert_eq!(json["values"][1][1], 0.25);
    }

    #[test]
    fn test_uber_up_ticks_are_split() {
        let heatmap = UberUpHeatmap {
            title: "MX-01".into(),
            values: array![[1, 0], [2, 1]],
            hour_ticks: vec![(0.0, 3), (2.0, 4)],
            day_ticks: vec![(0, "2025-01-01".into())],
        };
        let data = UberUpPlotData::from(&heatmap);
        assert_eq!(data.values, vec![vec![1, 0], vec![2, 1]]);
        assert_eq!(data.hour_tick_positions, vec![0.0, 2.0]);
        assert_eq!(data.hour_tick_labels, vec![3, 4]);
        assert_eq!(data.day_tick_positions, vec![0]);
        assert_eq!(data.day_tick_labels, vec!["2025-01-01"]);
    }
}
