//! Domain model: observatory site, sky coordinates, catalog targets and the
//! projects that own them.

pub mod coordinates;
pub mod observatory;
pub mod project;
pub mod target;

pub use coordinates::{CoordinateFrame, Horizontal, SkyCoordinate};
pub use observatory::Observatory;
pub use project::{aggregate_project_visibility, Project};
pub use target::{Instrument, Rank, Target, Uptime, LST_BUCKETS};
