//! Visibility engine.
//!
//! Turns one target's sky coordinate into azimuth/elevation over the
//! observing grid, marks the samples inside the telescope pointing band and
//! bins the visible time by local sidereal hour.
//!
//! ## Performance considerations
//! - Precession is evaluated once per night column; the equinox drifts by
//!   well under an arcsecond over one night
//! - LST of every instant comes precomputed from the [`ObservingContext`]
//! - No allocation besides the three output matrices

use ndarray::{Array2, Zip};

use crate::models::coordinates::{equatorial_to_horizontal, precess_from_j2000};
use crate::models::{Project, Target, Uptime, LST_BUCKETS};
use crate::time::sidereal::lst_bucket;
use crate::time::ObservingContext;

/// Lowest elevation the telescope can point at, degrees (inclusive).
pub const ELEVATION_MIN: f64 = 25.0;

/// Elevation above which tracking is not possible, degrees (exclusive).
pub const ELEVATION_MAX: f64 = 80.0;

/// True when `elevation` (degrees) lies in the pointing band `[25, 80)`.
#[inline]
pub fn in_pointing_band(elevation: f64) -> bool {
    (ELEVATION_MIN..ELEVATION_MAX).contains(&elevation)
}

/// Compute the visibility of `target` over the context's grid.
///
/// ## Returns
/// An [`Uptime`] tagged with the grid's spec: azimuth and elevation in
/// degrees, a 0/1 visibility matrix, and the LST histogram where each
/// visible sample adds `1 / subdivisions_per_hour` hours to the bucket of its
/// local sidereal hour.
///
/// ## Edge cases
/// - Zero-day grids yield empty matrices and an all-zero histogram
/// - Never-visible targets yield an all-zero histogram
pub fn compute_visibility(target: &Target, ctx: &ObservingContext) -> Uptime {
    let grid = ctx.grid();
    let shape = grid.shape();
    let latitude = ctx.site().latitude.value().to_radians();

    let (ra_j2000, dec_j2000) = target.coordinate.to_icrs();
    let (ra_j2000, dec_j2000) = (
        ra_j2000.value().to_radians(),
        dec_j2000.value().to_radians(),
    );

    let mut azimuth = Array2::<f64>::zeros(shape);
    let mut elevation = Array2::<f64>::zeros(shape);

    for (col, jds) in grid.julian_dates().columns().into_iter().enumerate() {
        let Some(&jd) = jds.first() else {
            continue;
        };
        let (ra, dec) = precess_from_j2000(ra_j2000, dec_j2000, jd);
        for (row, &lst) in ctx.lst_hours().column(col).iter().enumerate() {
            let horizontal = equatorial_to_horizontal(ra, dec, lst, latitude);
            azimuth[[row, col]] = horizontal.azimuth;
            elevation[[row, col]] = horizontal.elevation;
        }
    }

    let visible = elevation.mapv(|el| u8::from(in_pointing_band(el)));

    let sample_hours = grid.sample_hours();
    let mut lst_histogram = [0.0; LST_BUCKETS];
    Zip::from(&visible)
        .and(ctx.lst_hours())
        .for_each(|&up, &lst| {
            if up != 0 {
                lst_histogram[lst_bucket(lst)] += sample_hours;
            }
        });

    Uptime {
        grid: *grid.spec(),
        azimuth,
        elevation,
        visible,
        lst_histogram,
    }
}

/// Compute and attach visibility for every target in `targets`.
pub fn compute_uptimes(targets: &mut [Target], ctx: &ObservingContext) {
    for target in targets.iter_mut() {
        let uptime = compute_visibility(target, ctx);
        target.set_uptime(uptime);
    }
}

/// Recompute every target of `project`, dropping its stale uber-up.
pub fn compute_project_uptimes(project: &mut Project, ctx: &ObservingContext) {
    compute_uptimes(project.targets_mut(), ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instrument, Observatory, Rank, SkyCoordinate};
    use crate::time::build_grid_at;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;
    use qtty::{Degrees, Hours, Meters};

    fn context(lat: f64, days: i64, hours: u32, subdiv: u32) -> ObservingContext {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let site = Observatory::new(Degrees::new(lat), Degrees::new(-97.31), Meters::new(4640.0));
        let grid = build_grid_at(
            start,
            start + Duration::days(days),
            hours,
            subdiv,
            Duration::hours(3),
            site,
        )
        .unwrap();
        ObservingContext::new(grid)
    }

    fn target(ra: f64, dec: f64) -> Target {
        let coord = SkyCoordinate::equatorial(Degrees::new(ra), Degrees::new(dec)).unwrap();
        Target::new("src", coord, "MX-01", "pi", Instrument::Rsr, Hours::new(1.0), Rank::A, "1")
    }

    #[test]
    fn test_band_limits() {
        assert!(in_pointing_band(25.0));
        assert!(in_pointing_band(79.999));
        assert!(!in_pointing_band(80.0));
        assert!(!in_pointing_band(24.999));
        assert!(!in_pointing_band(f64::NAN));
    }

    #[test]
    fn test_pole_target_always_up_at_mid_latitude() {
        // At latitude 50 the celestial pole sits at 50 degrees elevation
        let ctx = context(50.0, 2, 4, 4);
        let uptime = compute_visibility(&target(0.0, 90.0), &ctx);

        assert_eq!(uptime.visible.dim(), (16, 2));
        assert!(uptime.visible.iter().all(|&v| v == 1));
        assert!(uptime.elevation.iter().all(|el| (el - 50.0).abs() < 0.5));
        assert!((uptime.total_visible_hours() - 8.0).abs() < 1e-9);
        assert_eq!(&uptime.grid, ctx.grid().spec());
    }

    #[test]
    fn test_far_south_target_never_up() {
        let ctx = context(18.986111, 3, 13, 4);
        let uptime = compute_visibility(&target(120.0, -85.0), &ctx);

        assert!(!uptime.is_ever_visible());
        assert_eq!(uptime.lst_histogram, [0.0; LST_BUCKETS]);
    }

    #[test]
    fn test_zero_day_grid() {
        let ctx = context(18.986111, 0, 13, 4);
        let uptime = compute_visibility(&target(83.6, 22.0), &ctx);

        assert_eq!(uptime.visible.dim(), (52, 0));
        assert_eq!(uptime.total_visible_hours(), 0.0);
    }

    #[test]
    fn test_compute_uptimes_attaches_results() {
        let ctx = context(18.986111, 1, 4, 2);
        let mut targets = vec![target(10.0, 10.0), target(200.0, -30.0)];
        compute_uptimes(&mut targets, &ctx);
        assert!(targets.iter().all(|t| t.uptime_for(ctx.grid().spec()).is_some()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_visible_iff_in_band(ra in 0.0f64..360.0, dec in -89.0f64..89.0) {
            let ctx = context(18.986111, 2, 6, 2);
            let uptime = compute_visibility(&target(ra, dec), &ctx);
            for (&v, &el) in uptime.visible.iter().zip(uptime.elevation.iter()) {
                prop_assert_eq!(v == 1, (25.0..80.0).contains(&el));
                prop_assert!(v <= 1);
            }
        }

        #[test]
        fn prop_histogram_sums_to_visible_time(
            ra in 0.0f64..360.0,
            dec in -60.0f64..89.0,
            subdiv in 1u32..6,
        ) {
            let ctx = context(18.986111, 2, 8, subdiv);
            let uptime = compute_visibility(&target(ra, dec), &ctx);
            let expected = uptime.visible_samples() as f64 / subdiv as f64;
            prop_assert!((uptime.total_visible_hours() - expected).abs() < 1e-9);
        }
    }
}
