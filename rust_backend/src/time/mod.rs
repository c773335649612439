//! Time handling: Julian dates, sidereal time, the observation grid and the
//! observing context shared by all visibility computations.

pub mod context;
pub mod grid;
pub mod sidereal;

pub use context::ObservingContext;
pub use grid::{build_grid, build_grid_at, parse_date, GridSpec, TimeGrid};
pub use sidereal::{datetime_to_jd, datetime_to_mjd, local_sidereal_time, mjd_to_datetime};
