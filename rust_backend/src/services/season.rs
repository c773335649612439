//! Seasonal visibility per project.

use ndarray::{s, Array2, Axis};
use serde::Serialize;

use crate::models::Project;
use crate::time::ObservingContext;

/// Fraction of each night's samples in which a project has at least one
/// target up, for a range of nights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonMatrix {
    /// `(projects, days)`, values in `[0, 1]`.
    pub values: Array2<f64>,
    /// Project ids, one per row.
    pub projects: Vec<String>,
    /// Day labels, one per column.
    pub days: Vec<String>,
    /// Absolute grid column of the first column of `values`.
    pub day_start: usize,
    pub title: String,
}

impl SeasonMatrix {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Season matrix over day columns `day_start..day_end` (end exclusive,
/// clamped to the grid).
///
/// Each project's uber-up is rebuilt for the whole grid first; a column's
/// value is the number of samples with any target up over the number of
/// samples per night.
pub fn compute_season<'a, I>(
    ctx: &ObservingContext,
    projects: I,
    day_start: usize,
    day_end: usize,
) -> SeasonMatrix
where
    I: IntoIterator<Item = &'a mut Project>,
{
    let mut projects: Vec<&mut Project> = projects.into_iter().collect();
    let grid = ctx.grid();
    let (rows, day_count) = grid.shape();
    let end = day_end.min(day_count);
    let start = day_start.min(end);
    let width = end - start;

    let mut values = Array2::<f64>::zeros((projects.len(), width));
    for (mut out, project) in values.axis_iter_mut(Axis(0)).zip(projects.iter_mut()) {
        if rows == 0 {
            continue;
        }
        let uber = project.uber_up(rows, day_count);
        for (value, column) in out
            .iter_mut()
            .zip(uber.slice(s![.., start..end]).axis_iter(Axis(1)))
        {
            let up = column.iter().filter(|&&count| count != 0).count();
            *value = up as f64 / rows as f64;
        }
    }

    let title = if width == 0 {
        String::new()
    } else {
        grid.day_range_label(start, end - 1)
    };

    log::debug!(
        "Season matrix for {} projects over days {}..{}",
        projects.len(),
        start,
        end
    );

    SeasonMatrix {
        values,
        projects: projects.iter().map(|p| p.id.clone()).collect(),
        days: grid.day_names()[start..end].to_vec(),
        day_start: start,
        title,
    }
}
