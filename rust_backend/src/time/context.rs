use ndarray::Array2;

use crate::models::Observatory;
use crate::time::grid::TimeGrid;
use crate::time::sidereal::local_sidereal_time;

/// Everything a visibility computation needs besides the target: the shared
/// time grid and the horizontal frame at the site (local sidereal time of
/// every grid instant).
///
/// A session builds one context and passes it by reference to every
/// computation; nothing about the grid lives on the target types.
#[derive(Debug, Clone)]
pub struct ObservingContext {
    grid: TimeGrid,
    lst_hours: Array2<f64>,
}

impl ObservingContext {
    pub fn new(grid: TimeGrid) -> Self {
        let longitude = grid.site().longitude;
        let lst_hours = grid
            .julian_dates()
            .mapv(|jd| local_sidereal_time(jd, longitude).value());
        Self { grid, lst_hours }
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn site(&self) -> &Observatory {
        self.grid.site()
    }

    /// Local mean sidereal time (hours, `[0, 24)`) at every grid instant.
    pub fn lst_hours(&self) -> &Array2<f64> {
        &self.lst_hours
    }
}
