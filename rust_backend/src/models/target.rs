//! Catalog targets and their derived visibility.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use qtty::Hours;
use serde::{Deserialize, Serialize};

use crate::models::coordinates::SkyCoordinate;
use crate::time::grid::GridSpec;

/// Receivers available on the telescope, in the canonical plotting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Instrument {
    Rsr,
    Sequoia,
    Msip1,
    B4r,
    Toltec,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Rsr,
        Instrument::Sequoia,
        Instrument::Msip1,
        Instrument::B4r,
        Instrument::Toltec,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Name as written in catalogs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Rsr => "RSR",
            Instrument::Sequoia => "SEQUOIA",
            Instrument::Msip1 => "MSIP1",
            Instrument::B4r => "B4R",
            Instrument::Toltec => "TolTEC",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Instrument::ALL
            .into_iter()
            .find(|inst| inst.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown instrument: {}", s))
    }
}

/// Scheduling tier, `A` highest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Rank {
    #[default]
    A,
    B,
    C,
    D,
}

impl Rank {
    pub const ALL: [Rank; 4] = [Rank::A, Rank::B, Rank::C, Rank::D];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Rank::A),
            "B" => Ok(Rank::B),
            "C" => Ok(Rank::C),
            "D" => Ok(Rank::D),
            other => Err(format!("Unknown rank: {}", other)),
        }
    }
}

/// Number of local sidereal hour buckets.
pub const LST_BUCKETS: usize = 24;

/// Visibility of one target over one time grid.
///
/// All matrices are shaped `(samples_per_day, day_count)` of `grid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uptime {
    pub grid: GridSpec,
    pub azimuth: Array2<f64>,
    pub elevation: Array2<f64>,
    /// 1 where the target is inside the pointing band, 0 elsewhere.
    pub visible: Array2<u8>,
    /// Visible hours per integer LST hour.
    pub lst_histogram: [f64; LST_BUCKETS],
}

impl Uptime {
    pub fn visible_samples(&self) -> usize {
        self.visible.iter().filter(|&&v| v != 0).count()
    }

    pub fn total_visible_hours(&self) -> f64 {
        self.lst_histogram.iter().sum()
    }

    pub fn is_ever_visible(&self) -> bool {
        self.visible.iter().any(|&v| v != 0)
    }
}

/// A single source requested by a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub coordinate: SkyCoordinate,
    pub proposal_id: String,
    pub pi_name: String,
    pub instrument: Instrument,
    pub integration_time: Hours,
    pub rank: Rank,
    pub priority: String,
    uptime: Option<Uptime>,
}

impl Target {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        coordinate: SkyCoordinate,
        proposal_id: impl Into<String>,
        pi_name: impl Into<String>,
        instrument: Instrument,
        integration_time: Hours,
        rank: Rank,
        priority: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            coordinate,
            proposal_id: proposal_id.into(),
            pi_name: pi_name.into(),
            instrument,
            integration_time,
            rank,
            priority: priority.into(),
            uptime: None,
        }
    }

    /// Derived visibility, whatever grid it was computed for.
    pub fn uptime(&self) -> Option<&Uptime> {
        self.uptime.as_ref()
    }

    /// Derived visibility if it was computed for `spec`.
    pub fn uptime_for(&self, spec: &GridSpec) -> Option<&Uptime> {
        self.uptime.as_ref().filter(|u| &u.grid == spec)
    }

    pub(crate) fn set_uptime(&mut self, uptime: Uptime) {
        self.uptime = Some(uptime);
    }

    /// LST histogram of the current uptime, zeros if none was computed.
    pub fn lst_histogram(&self) -> [f64; LST_BUCKETS] {
        self.uptime
            .as_ref()
            .map(|u| u.lst_histogram)
            .unwrap_or([0.0; LST_BUCKETS])
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.proposal_id,
            self.pi_name,
            self.name,
            self.coordinate.lon().value(),
            self.coordinate.lat().value()
        )
    }
}
