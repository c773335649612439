//! Demand ("pressure") aggregation.
//!
//! Spreads each selected target's requested integration time over the
//! local sidereal hours in which it is observable, accumulated per
//! instrument and rank, and builds the reference curve of available
//! sidereal time the demand is compared against.

use std::collections::BTreeMap;

use ndarray::s;
use serde::{Deserialize, Serialize};

use crate::models::{Instrument, Project, Rank, LST_BUCKETS};
use crate::time::sidereal::lst_bucket;
use crate::time::ObservingContext;

const INSTRUMENTS: usize = Instrument::ALL.len();
const RANKS: usize = Rank::ALL.len();

/// Demand hours indexed `[instrument][rank][lst_hour]`.
pub type DemandCube = [[[f64; LST_BUCKETS]; RANKS]; INSTRUMENTS];

/// Weights applied when building a pressure profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureSettings {
    /// Share of telescope time per project group, keyed by two-letter group code.
    pub group_weights: BTreeMap<String, f64>,
    /// Fraction of available time expected to yield science data.
    pub efficiency: f64,
    /// Multiplier on requested time per instrument.
    pub instrument_weights: [f64; INSTRUMENTS],
}

impl Default for PressureSettings {
    fn default() -> Self {
        let group_weights = [("UM", 0.15), ("US", 0.15), ("MX", 0.7)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            group_weights,
            efficiency: 0.5,
            instrument_weights: [1.0; INSTRUMENTS],
        }
    }
}

impl PressureSettings {
    pub fn instrument_weight(&self, instrument: Instrument) -> f64 {
        self.instrument_weights[instrument.index()]
    }

    /// Sum of the weights whose key appears in the two-letter prefix of any
    /// selected group (case-insensitive).
    pub fn group_share<S: AsRef<str>>(&self, groups: &[S]) -> f64 {
        groups
            .iter()
            .map(|group| {
                let prefix = group
                    .as_ref()
                    .chars()
                    .take(2)
                    .collect::<String>()
                    .to_uppercase();
                self.group_weights
                    .iter()
                    .filter(|(key, _)| prefix.contains(key.to_uppercase().as_str()))
                    .map(|(_, weight)| weight)
                    .sum::<f64>()
            })
            .sum()
    }
}

/// One stacked-bar series of a pressure plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSeries {
    pub instrument: Instrument,
    pub rank: Rank,
    pub label: String,
    pub hours: [f64; LST_BUCKETS],
}

/// Demand per instrument and rank over LST hours, plus the available-time reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureProfile {
    pub demand: DemandCube,
    /// Available sidereal time per LST hour, scaled by group share and efficiency.
    pub reference: [f64; LST_BUCKETS],
    /// Summed group share of the selected groups.
    pub group_share: f64,
    pub efficiency: f64,
    pub instrument_weights: [f64; INSTRUMENTS],
    pub title: String,
}

impl PressureProfile {
    /// Non-empty series, instrument-major then rank, in canonical order.
    pub fn series(&self) -> Vec<DemandSeries> {
        let mut series = Vec::new();
        for instrument in Instrument::ALL {
            for rank in Rank::ALL {
                let hours = self.demand[instrument.index()][rank.index()];
                if hours.iter().all(|&h| h == 0.0) {
                    continue;
                }
                let mut label = format!("{}-{}", instrument, rank);
                let weight = self.instrument_weights[instrument.index()];
                if weight > 1.0 {
                    label.push_str(&format!(" * {:?}", weight));
                }
                series.push(DemandSeries {
                    instrument,
                    rank,
                    label,
                    hours,
                });
            }
        }
        series
    }

    /// Total demand per LST hour across all series.
    pub fn total_demand(&self) -> [f64; LST_BUCKETS] {
        let mut total = [0.0; LST_BUCKETS];
        for per_rank in &self.demand {
            for hours in per_rank {
                for (t, h) in total.iter_mut().zip(hours) {
                    *t += h;
                }
            }
        }
        total
    }

    pub fn reference_label(&self) -> String {
        format!(
            "UPTIME ({:.2} %) efficiency ({:.2} %)",
            self.group_share * 100.0,
            self.efficiency * 100.0
        )
    }
}

/// Build the pressure profile for the selected ranks and project groups.
///
/// A target with rank in `ranks` adds `integration_time * instrument_weight`
/// hours spread across LST hours in proportion to its histogram; targets
/// never up contribute nothing. The reference curve counts every grid
/// instant of day columns `day_start..=day_end` (clamped to the grid) into
/// its LST hour at `1 / subdivisions` hours each, scaled by the group share
/// times efficiency.
pub fn compute_pressure<'a, P, S>(
    projects: P,
    ranks: &[Rank],
    groups: &[S],
    settings: &PressureSettings,
    day_start: usize,
    day_end: usize,
    ctx: &ObservingContext,
) -> PressureProfile
where
    P: IntoIterator<Item = &'a Project>,
    S: AsRef<str>,
{
    let mut demand: DemandCube = [[[0.0; LST_BUCKETS]; RANKS]; INSTRUMENTS];

    for target in projects.into_iter().flat_map(|p| p.targets()) {
        if !ranks.contains(&target.rank) {
            continue;
        }
        let histogram = target.lst_histogram();
        let total: f64 = histogram.iter().sum();
        if total == 0.0 {
            continue;
        }
        let requested =
            target.integration_time.value() * settings.instrument_weight(target.instrument);
        let cell = &mut demand[target.instrument.index()][target.rank.index()];
        for (hour, share) in cell.iter_mut().zip(histogram) {
            *hour += requested * share / total;
        }
    }

    let group_share = settings.group_share(groups);
    let mult = group_share * settings.efficiency;

    let grid = ctx.grid();
    let mut reference = [0.0; LST_BUCKETS];
    if grid.day_count() > 0 && day_start < grid.day_count() {
        let end = day_end.min(grid.day_count() - 1);
        if end >= day_start {
            let sample_hours = grid.sample_hours();
            for &lst in ctx.lst_hours().slice(s![.., day_start..=end]) {
                reference[lst_bucket(lst)] += sample_hours;
            }
        }
    }
    for value in &mut reference {
        *value *= mult;
    }

    log::debug!(
        "Pressure over days {}..={}: group share {:.2}, efficiency {:.2}",
        day_start,
        day_end,
        group_share,
        settings.efficiency
    );

    PressureProfile {
        demand,
        reference,
        group_share,
        efficiency: settings.efficiency,
        instrument_weights: settings.instrument_weights,
        title: grid.day_range_label(day_start, day_end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SkyCoordinate, Target, Uptime};
    use crate::time::build_grid;
    use chrono::{Duration, NaiveDate};
    use ndarray::Array2;
    use qtty::{Degrees, Hours};

    fn context(days: i64) -> ObservingContext {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let grid =
            build_grid(start, start + Duration::days(days), 4, 4, Duration::hours(3)).unwrap();
        ObservingContext::new(grid)
    }

    fn target(
        instrument: Instrument,
        rank: Rank,
        hours: f64,
        hist: &[(usize, f64)],
        ctx: &ObservingContext,
    ) -> Target {
        let coord = SkyCoordinate::equatorial(Degrees::new(0.0), Degrees::new(0.0)).unwrap();
        let mut t = Target::new(
            "s",
            coord,
            "MX-01",
            "pi",
            instrument,
            Hours::new(hours),
            rank,
            "1",
        );
        let mut lst_histogram = [0.0; LST_BUCKETS];
        for &(h, v) in hist {
            lst_histogram[h] = v;
        }
        let shape = ctx.grid().shape();
        t.set_uptime(Uptime {
            grid: *ctx.grid().spec(),
            azimuth: Array2::zeros(shape),
            elevation: Array2::zeros(shape),
            visible: Array2::zeros(shape),
            lst_histogram,
        });
        t
    }

    #[test]
    fn test_demand_is_normalized_by_histogram() {
        let ctx = context(2);
        let project = Project::with_targets(
            "MX-01",
            vec![
                target(Instrument::Sequoia, Rank::B, 3.0, &[(2, 1.0), (3, 0.5)], &ctx),
                target(Instrument::Rsr, Rank::A, 2.0, &[(10, 0.25)], &ctx),
                // never up: ignored
                target(Instrument::Rsr, Rank::A, 5.0, &[], &ctx),
                // rank not selected: ignored
                target(Instrument::Rsr, Rank::D, 5.0, &[(1, 1.0)], &ctx),
            ],
        );
        let profile = compute_pressure(
            &[project],
            &[Rank::A, Rank::B],
            &["MX"],
            &PressureSettings::default(),
            0,
            1,
            &ctx,
        );

        let seq = profile.demand[Instrument::Sequoia.index()][Rank::B.index()];
        assert!((seq[2] - 2.0).abs() < 1e-12);
        assert!((seq[3] - 1.0).abs() < 1e-12);
        assert!((profile.demand[0][0][10] - 2.0).abs() < 1e-12);
        assert_eq!(profile.demand[0][3], [0.0; LST_BUCKETS]);
        assert!((profile.total_demand().iter().sum::<f64>() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_series_order_and_labels() {
        let ctx = context(1);
        let project = Project::with_targets(
            "MX-01",
            vec![
                target(Instrument::Toltec, Rank::A, 1.0, &[(0, 1.0)], &ctx),
                target(Instrument::Rsr, Rank::C, 1.0, &[(0, 1.0)], &ctx),
                target(Instrument::Rsr, Rank::A, 1.0, &[(0, 1.0)], &ctx),
            ],
        );
        let mut settings = PressureSettings::default();
        settings.instrument_weights[Instrument::Toltec.index()] = 2.0;
        let profile = compute_pressure(&[project], &Rank::ALL, &["MX"], &settings, 0, 0, &ctx);

        let labels: Vec<String> = profile.series().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["RSR-A", "RSR-C", "TolTEC-A * 2.0"]);
        assert!((profile.demand[Instrument::Toltec.index()][0][0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_group_share() {
        let settings = PressureSettings::default();
        assert!((settings.group_share(&["MX", "us"]) - 0.85).abs() < 1e-12);
        assert!((settings.group_share(&["MX_2025", "UM"]) - 0.85).abs() < 1e-12);
        assert_eq!(settings.group_share(&["XX"]), 0.0);
        assert_eq!(settings.group_share::<&str>(&[]), 0.0);
    }

    #[test]
    fn test_reference_curve_covers_inclusive_day_range() {
        let ctx = context(3);
        let profile = compute_pressure(
            std::iter::empty(),
            &Rank::ALL,
            &["MX", "US", "UM"],
            &PressureSettings::default(),
            0,
            1,
            &ctx,
        );
        // 2 days x 4 hours of samples, group share 1.0, efficiency 0.5
        let total: f64 = profile.reference.iter().sum();
        assert!((total - 2.0 * 4.0 * 0.5).abs() < 1e-9);
        assert!(profile.series().is_empty());
        assert_eq!(profile.reference_label(), "UPTIME (100.00 %) efficiency (50.00 %)");
        assert_eq!(profile.title, "2025-01-01 -- 2025-01-02");
    }

    #[test]
    fn test_degenerate_ranges() {
        let ctx = context(0);
        let no_groups: [&str; 0] = [];
        let settings = PressureSettings::default();
        let profile = compute_pressure(std::iter::empty(), &[], &no_groups, &settings, 0, 5, &ctx);
        assert_eq!(profile.reference, [0.0; LST_BUCKETS]);
        assert_eq!(profile.title, "");

        let ctx = context(2);
        let profile =
            compute_pressure(std::iter::empty(), &Rank::ALL, &["MX"], &settings, 5, 9, &ctx);
        assert_eq!(profile.reference, [0.0; LST_BUCKETS]);
    }
}
