//! Julian dates and mean sidereal time.
//!
//! Instants are carried as `chrono::DateTime<Utc>`; the astronomy code works
//! on Julian dates derived from the Unix timestamp, so no calendar arithmetic
//! is needed.

use chrono::{DateTime, Utc};
use qtty::{Degrees, Hours};

/// MJD epoch (1858-11-17 00:00:00 UTC) as Unix timestamp
const MJD_EPOCH_UNIX: i64 = -3506716800;

const SECONDS_PER_DAY: f64 = 86400.0;

/// Offset between Julian Date and Modified Julian Date.
pub const JD_MJD_OFFSET: f64 = 2_400_000.5;

/// Julian Date of the J2000.0 epoch (2000-01-01 12:00 TT, treated as UTC).
pub const J2000_JD: f64 = 2_451_545.0;

/// Convert a UTC instant to Modified Julian Date.
#[inline]
pub fn datetime_to_mjd(dt: &DateTime<Utc>) -> f64 {
    let whole = (dt.timestamp() - MJD_EPOCH_UNIX) as f64;
    let frac = dt.timestamp_subsec_nanos() as f64 * 1e-9;
    (whole + frac) / SECONDS_PER_DAY
}

/// Convert a UTC instant to Julian Date.
#[inline]
pub fn datetime_to_jd(dt: &DateTime<Utc>) -> f64 {
    datetime_to_mjd(dt) + JD_MJD_OFFSET
}

/// Convert a Modified Julian Date back to a UTC instant (microsecond resolution).
pub fn mjd_to_datetime(mjd: f64) -> Option<DateTime<Utc>> {
    if !mjd.is_finite() {
        return None;
    }
    let micros = (mjd * SECONDS_PER_DAY * 1e6).round() as i64;
    let secs = micros.div_euclid(1_000_000) + MJD_EPOCH_UNIX;
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Julian centuries since J2000.0.
#[inline]
pub fn julian_centuries(jd: f64) -> f64 {
    (jd - J2000_JD) / 36525.0
}

/// Greenwich mean sidereal time in hours, `[0, 24)`.
pub fn greenwich_mean_sidereal_time(jd: f64) -> Hours {
    let t = julian_centuries(jd);
    let gmst_deg = 280.46061837 + 360.98564736629 * (jd - J2000_JD) + 0.000387933 * t * t
        - t * t * t / 38710000.0;
    Hours::new(gmst_deg.rem_euclid(360.0) / 15.0)
}

/// Local mean sidereal time in hours, `[0, 24)`, for an east-positive longitude.
pub fn local_sidereal_time(jd: f64, longitude: Degrees) -> Hours {
    let gmst = greenwich_mean_sidereal_time(jd).value();
    Hours::new((gmst + longitude.value() / 15.0).rem_euclid(24.0))
}

/// Integer LST hour (`0..24`) of a sidereal time in hours.
#[inline]
pub fn lst_bucket(lst_hours: f64) -> usize {
    // rem_euclid keeps the value below 24.0, but rounding can land exactly on it
    (lst_hours.rem_euclid(24.0) as usize).min(23)
}
