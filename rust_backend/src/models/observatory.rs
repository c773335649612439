use qtty::{Degrees, Meters};
use serde::{Deserialize, Serialize};

/// Geographic position of the telescope.
///
/// Longitude is east-positive. Height is kept for reference only; the
/// horizontal transform ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observatory {
    pub latitude: Degrees,
    pub longitude: Degrees,
    pub height: Meters,
}

impl Observatory {
    /// Large Millimeter Telescope, Sierra Negra, Mexico.
    pub const LMT: Observatory = Observatory {
        latitude: Degrees::new(18.986111),
        longitude: Degrees::new(-97.31458333),
        height: Meters::new(4640.0),
    };

    pub fn new(latitude: Degrees, longitude: Degrees, height: Meters) -> Self {
        Self {
            latitude,
            longitude,
            height,
        }
    }
}

impl Default for Observatory {
    fn default() -> Self {
        Self::LMT
    }
}
