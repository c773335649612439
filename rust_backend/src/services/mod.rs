//! Service layer: visibility computation and the reductions built on it.
//!
//! Services take the observing context explicitly and never reach for
//! process-wide state; each session passes its own context and projects.

pub mod pressure;
pub mod season;
pub mod uptimes;
pub mod visibility;

pub use pressure::{compute_pressure, DemandSeries, PressureProfile, PressureSettings};
pub use season::{compute_season, SeasonMatrix};
pub use uptimes::{project_uptime_curves, uber_up_heatmap, UberUpHeatmap, UptimeCurves};
pub use visibility::{compute_project_uptimes, compute_uptimes, compute_visibility};
