//! Source availability engine for the Large Millimeter Telescope.
//!
//! Computes, for every target of a proposal catalog, when it sits inside the
//! telescope's pointing band over a grid of nightly samples, and reduces
//! those visibilities into the views an availability dashboard shows:
//! per-LST demand against available sky time, seasonal fraction-up per
//! project, nightly elevation curves and the per-project uber-up heatmap.
//!
//! Computed visibility is cached next to each catalog in a versioned binary
//! file and recomputed when the grid changes.

pub mod api;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod parsing;
pub mod services;
pub mod session;
pub mod time;

pub use config::AvailabilityConfig;
pub use error::{UptimeError, UptimeResult};
pub use session::{Session, SourceWindow};
