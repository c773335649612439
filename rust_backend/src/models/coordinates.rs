//! Sky coordinates and the transforms needed to point a ground telescope:
//! galactic → ICRS, J2000 → mean equinox of date, equatorial → horizontal.
//!
//! Refraction, nutation and aberration are ignored; at the 25°/80° band
//! limits they move a target by well under a sample.

use std::fmt;

use qtty::Degrees;
use serde::{Deserialize, Serialize};

use crate::error::{UptimeError, UptimeResult};
use crate::time::sidereal::julian_centuries;

/// ICRS → galactic rotation (Hipparcos definition). Rows are the galactic
/// axes expressed in ICRS.
const ICRS_TO_GALACTIC: [[f64; 3]; 3] = [
    [-0.054_875_560_416_215_4, -0.873_437_090_234_885_0, -0.483_835_015_548_713_2],
    [0.494_109_427_875_583_7, -0.444_829_629_960_011_2, 0.746_982_244_497_218_9],
    [-0.867_666_149_019_004_7, -0.198_076_373_431_201_5, 0.455_983_776_175_066_9],
];

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Frame tag carried by catalog coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateFrame {
    /// RA/Dec, ICRS (J2000).
    Equatorial,
    /// Galactic longitude/latitude.
    Galactic,
}

impl CoordinateFrame {
    /// Catalog `system` column: `Galactic` (any case) selects the galactic
    /// frame, everything else is taken as equatorial.
    pub fn from_catalog(system: &str) -> Self {
        if system.trim().eq_ignore_ascii_case("galactic") {
            CoordinateFrame::Galactic
        } else {
            CoordinateFrame::Equatorial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateFrame::Equatorial => "Equatorial",
            CoordinateFrame::Galactic => "Galactic",
        }
    }
}

impl fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated position on the sky.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoordinate {
    lon: Degrees,
    lat: Degrees,
    frame: CoordinateFrame,
}

impl SkyCoordinate {
    /// Build a coordinate, rejecting non-finite angles and latitudes outside ±90°.
    pub fn new(lon: Degrees, lat: Degrees, frame: CoordinateFrame) -> UptimeResult<Self> {
        if !lon.value().is_finite() || !lat.value().is_finite() {
            return Err(UptimeError::InvalidCoordinate(format!(
                "non-finite angle ({}, {})",
                lon.value(),
                lat.value()
            )));
        }
        if lat.value().abs() > 90.0 {
            return Err(UptimeError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                lat.value()
            )));
        }
        Ok(Self {
            lon: Degrees::new(lon.value().rem_euclid(360.0)),
            lat,
            frame,
        })
    }

    pub fn equatorial(ra: Degrees, dec: Degrees) -> UptimeResult<Self> {
        Self::new(ra, dec, CoordinateFrame::Equatorial)
    }

    pub fn galactic(l: Degrees, b: Degrees) -> UptimeResult<Self> {
        Self::new(l, b, CoordinateFrame::Galactic)
    }

    /// Longitude-like angle (RA or l) as given.
    pub fn lon(&self) -> Degrees {
        self.lon
    }

    /// Latitude-like angle (Dec or b) as given.
    pub fn lat(&self) -> Degrees {
        self.lat
    }

    pub fn frame(&self) -> CoordinateFrame {
        self.frame
    }

    /// ICRS (J2000) right ascension and declination.
    pub fn to_icrs(&self) -> (Degrees, Degrees) {
        match self.frame {
            CoordinateFrame::Equatorial => (self.lon, self.lat),
            CoordinateFrame::Galactic => galactic_to_icrs(self.lon, self.lat),
        }
    }
}

/// Horizontal position in degrees. Azimuth is measured from north through east.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizontal {
    pub azimuth: f64,
    pub elevation: f64,
}

/// Convert galactic (l, b) to ICRS (RA, Dec).
pub fn galactic_to_icrs(l: Degrees, b: Degrees) -> (Degrees, Degrees) {
    let (l, b) = (l.value().to_radians(), b.value().to_radians());
    let gal = [b.cos() * l.cos(), b.cos() * l.sin(), b.sin()];

    let mut icrs = [0.0; 3];
    for (i, out) in icrs.iter_mut().enumerate() {
        *out = (0..3).map(|j| ICRS_TO_GALACTIC[j][i] * gal[j]).sum();
    }

    let ra = icrs[1].atan2(icrs[0]).to_degrees().rem_euclid(360.0);
    let dec = icrs[2].clamp(-1.0, 1.0).asin().to_degrees();
    (Degrees::new(ra), Degrees::new(dec))
}

/// Precess J2000 mean RA/Dec to the mean equinox of `jd` (IAU 1976 angles).
///
/// Inputs and outputs are radians.
pub fn precess_from_j2000(ra: f64, dec: f64, jd: f64) -> (f64, f64) {
    let t = julian_centuries(jd);
    let t2 = t * t;
    let t3 = t2 * t;
    let zeta = (2306.2181 * t + 0.30188 * t2 + 0.017998 * t3) * ARCSEC_TO_RAD;
    let z = (2306.2181 * t + 1.09468 * t2 + 0.018203 * t3) * ARCSEC_TO_RAD;
    let theta = (2004.3109 * t - 0.42665 * t2 - 0.041833 * t3) * ARCSEC_TO_RAD;

    let a = dec.cos() * (ra + zeta).sin();
    let b = theta.cos() * dec.cos() * (ra + zeta).cos() - theta.sin() * dec.sin();
    let c = theta.sin() * dec.cos() * (ra + zeta).cos() + theta.cos() * dec.sin();

    let ra_date = (a.atan2(b) + z).rem_euclid(std::f64::consts::TAU);
    let dec_date = c.clamp(-1.0, 1.0).asin();
    (ra_date, dec_date)
}

/// Equatorial (of date) → horizontal for a given local sidereal time.
///
/// `ra`, `dec`, `latitude` in radians; `lst_hours` in hours.
pub fn equatorial_to_horizontal(ra: f64, dec: f64, lst_hours: f64, latitude: f64) -> Horizontal {
    let hour_angle = (lst_hours * 15.0).to_radians() - ra;
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_ha, cos_ha) = hour_angle.sin_cos();

    let sin_alt = sin_lat * sin_dec + cos_lat * cos_dec * cos_ha;
    let elevation = sin_alt.clamp(-1.0, 1.0).asin().to_degrees();

    let azimuth = (-cos_dec * sin_ha)
        .atan2(sin_dec * cos_lat - cos_dec * sin_lat * cos_ha)
        .to_degrees()
        .rem_euclid(360.0);

    Horizontal {
        azimuth,
        elevation,
    }
}

/// Parse a catalog angle in degrees: decimal (`"83.63"`) or sexagesimal
/// (`"83:37:48"`, `"-5 23 28"`).
pub fn parse_angle(value: &str) -> UptimeResult<Degrees> {
    let value = value.trim();
    if value.is_empty() {
        return Err(UptimeError::InvalidCoordinate("empty angle".to_string()));
    }
    if let Ok(deg) = value.parse::<f64>() {
        return Ok(Degrees::new(deg));
    }

    let negative = value.starts_with('-');
    let parts: Vec<&str> = value
        .trim_start_matches(['-', '+'])
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(UptimeError::InvalidCoordinate(format!(
            "cannot parse angle '{}'",
            value
        )));
    }

    let mut total = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let component: f64 = part.parse().map_err(|_| {
            UptimeError::InvalidCoordinate(format!("cannot parse angle '{}'", value))
        })?;
        total += component / 60f64.powi(i as i32);
    }
    Ok(Degrees::new(if negative { -total } else { total }))
}
