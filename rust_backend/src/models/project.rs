use std::fmt;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::models::target::{Rank, Target};

/// A proposal and the targets it requested, in catalog order.
///
/// The uber-up matrix is derived from the targets' visibility and is dropped
/// whenever targets are replaced or their uptimes recomputed through the
/// project, so readers never see a stale aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    targets: Vec<Target>,
    #[serde(skip)]
    uber_up: Option<Array2<u32>>,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            targets: Vec::new(),
            uber_up: None,
        }
    }

    pub fn with_targets(id: impl Into<String>, targets: Vec<Target>) -> Self {
        Self {
            id: id.into(),
            targets,
            uber_up: None,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Rank of the first target, the rank the dashboard files a project under.
    pub fn leading_rank(&self) -> Option<Rank> {
        self.targets.first().map(|t| t.rank)
    }

    pub fn push_target(&mut self, target: Target) {
        self.targets.push(target);
        self.uber_up = None;
    }

    /// Mutable access to the targets. Invalidates the uber-up aggregate.
    pub(crate) fn targets_mut(&mut self) -> &mut [Target] {
        self.uber_up = None;
        &mut self.targets
    }

    /// Uber-up over the first `day_columns` day columns, rebuilt if missing or
    /// built for a different column count.
    pub fn uber_up(&mut self, samples_per_day: usize, day_columns: usize) -> &Array2<u32> {
        let fresh = matches!(&self.uber_up, Some(m) if m.dim() == (samples_per_day, day_columns));
        if !fresh {
            self.uber_up = Some(aggregate_project_visibility(
                self,
                samples_per_day,
                day_columns,
            ));
        }
        self.uber_up.get_or_insert_with(|| Array2::zeros((samples_per_day, day_columns)))
    }

    /// Drop the cached aggregate.
    pub fn invalidate(&mut self) {
        self.uber_up = None;
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Element-wise sum of the owned targets' visibility matrices.
///
/// The result is `(samples_per_day, day_columns)`; each target contributes
/// its first `min(day_columns, its column count)` columns and rows up to
/// `samples_per_day`. Targets without an uptime contribute nothing, so a
/// project with no computed targets yields all zeros.
pub fn aggregate_project_visibility(
    project: &Project,
    samples_per_day: usize,
    day_columns: usize,
) -> Array2<u32> {
    let mut uber = Array2::<u32>::zeros((samples_per_day, day_columns));
    for target in project.targets() {
        let Some(uptime) = target.uptime() else {
            continue;
        };
        let (rows, cols) = uptime.visible.dim();
        let rows = rows.min(samples_per_day);
        let cols = cols.min(day_columns);
        let mut dst = uber.slice_mut(s![..rows, ..cols]);
        dst += &uptime.visible.slice(s![..rows, ..cols]).mapv(u32::from);
    }
    uber
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instrument, Rank, SkyCoordinate, Uptime, LST_BUCKETS};
    use crate::time::grid::GridSpec;
    use chrono::NaiveDate;
    use ndarray::array;
    use qtty::{Degrees, Hours};

    fn spec(days: usize) -> GridSpec {
        GridSpec {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            day_count: days,
            hours_per_night: 1,
            subdivisions_per_hour: 2,
            nightly_start_offset_seconds: 0,
            site: crate::models::Observatory::LMT,
        }
    }

    fn target_with(visible: Array2<u8>) -> Target {
        let coord = SkyCoordinate::equatorial(Degrees::new(10.0), Degrees::new(10.0)).unwrap();
        let mut t = Target::new(
            "t",
            coord,
            "P-01",
            "pi",
            Instrument::Rsr,
            Hours::new(1.0),
            Rank::A,
            "",
        );
        let shape = visible.dim();
        t.set_uptime(Uptime {
            grid: spec(shape.1),
            azimuth: Array2::zeros(shape),
            elevation: Array2::zeros(shape),
            visible,
            lst_histogram: [0.0; LST_BUCKETS],
        });
        t
    }

    #[test]
    fn test_aggregate_sums_targets() {
        let mut p = Project::new("P-01");
        p.push_target(target_with(array![[1, 0, 1], [0, 0, 1]]));
        p.push_target(target_with(array![[1, 1, 0], [0, 0, 1]]));

        let uber = aggregate_project_visibility(&p, 2, 3);
        assert_eq!(uber, array![[2, 1, 1], [0, 0, 2]]);
    }

    #[test]
    fn test_aggregate_clamps_columns() {
        let mut p = Project::new("P-01");
        p.push_target(target_with(array![[1, 0, 1], [0, 1, 1]]));

        assert_eq!(aggregate_project_visibility(&p, 2, 2), array![[1, 0], [0, 1]]);
        // Wider than the matrices: the extra columns stay zero
        assert_eq!(
            aggregate_project_visibility(&p, 2, 4),
            array![[1, 0, 1, 0], [0, 1, 1, 0]]
        );
    }

    #[test]
    fn test_empty_project_is_zero() {
        let p = Project::new("P-02");
        let uber = aggregate_project_visibility(&p, 4, 3);
        assert_eq!(uber.dim(), (4, 3));
        assert!(uber.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_uber_up_rebuilt_after_change() {
        let mut p = Project::new("P-01");
        p.push_target(target_with(array![[1, 0], [0, 0]]));
        assert_eq!(p.uber_up(2, 2), &array![[1, 0], [0, 0]]);

        p.push_target(target_with(array![[1, 1], [1, 1]]));
        assert_eq!(p.uber_up(2, 2), &array![[2, 1], [1, 1]]);

        // Different column count forces a rebuild
        assert_eq!(p.uber_up(2, 1), &array![[2], [1]]);
    }

    #[test]
    fn test_leading_rank() {
        let mut p = Project::new("P-01");
        assert_eq!(p.leading_rank(), None);
        p.push_target(target_with(array![[1]]));
        assert_eq!(p.leading_rank(), Some(Rank::A));
    }
}
