//! End-to-end tests: catalog file to cached uptimes to plot reductions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use qtty::{Degrees, Meters};
use tempfile::TempDir;

use uptime_rust::io::cache::read_format_tag;
use uptime_rust::io::{cache_path_for, load_catalog, CacheFormat, LoadOrigin};
use uptime_rust::models::{aggregate_project_visibility, Observatory, Rank};
use uptime_rust::parsing::Catalog;
use uptime_rust::services::{compute_pressure, compute_season, PressureSettings};
use uptime_rust::time::{build_grid_at, ObservingContext};
use uptime_rust::UptimeError;

const CATALOG: &str = "\
proposal_id,name_pi,source,ra,dec,system,instrument,time,priority,rank
MX-1,Doe,Pole,0.0,90.0,Equatorial,RSR,2.0,1,A
MX-2,Roe,Deep South,0.0,-80.0,Equatorial,TolTEC,3.0,1,B
";

/// A site at latitude 50 where the celestial pole sits at 50 degrees elevation.
fn northern_site() -> Observatory {
    Observatory::new(Degrees::new(50.0), Degrees::new(0.0), Meters::new(0.0))
}

fn context(days: i64) -> ObservingContext {
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let grid = build_grid_at(
        start,
        start + Duration::days(days),
        4,
        4,
        Duration::hours(3),
        northern_site(),
    )
    .unwrap();
    ObservingContext::new(grid)
}

fn write_catalog(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("mx_targets.csv");
    fs::write(&path, CATALOG).unwrap();
    path
}

fn load(cache: &Path, catalog: &Path, ctx: &ObservingContext) -> uptime_rust::io::LoadedCatalog {
    load_catalog(Some(cache), catalog, ctx).unwrap()
}

#[test]
fn test_pole_target_is_always_up() {
    let dir = TempDir::new().unwrap();
    let catalog_path = write_catalog(&dir);
    let ctx = context(2);

    let loaded = load(&cache_path_for(&catalog_path), &catalog_path, &ctx);
    assert_eq!(loaded.origin, LoadOrigin::Computed);

    let mut catalog = loaded.catalog;
    assert_eq!(catalog.projects.len(), 2);
    let pole = &catalog.projects[0].targets()[0];
    let uptime = pole.uptime_for(ctx.grid().spec()).unwrap();

    assert_eq!(uptime.visible.dim(), (16, 2));
    assert!(uptime.visible.iter().all(|&v| v == 1));
    assert!(uptime.elevation.iter().all(|e| (e - 50.0).abs() < 0.5));
    // 2 nights x 4 hours
    assert!((uptime.lst_histogram.iter().sum::<f64>() - 8.0).abs() < 1e-9);

    let south = catalog.projects[1].targets()[0].uptime().unwrap();
    assert!(!south.is_ever_visible());

    let uber = aggregate_project_visibility(&catalog.projects[0], 16, 2);
    assert_eq!(uber, uptime.visible.mapv(u32::from));

    let season = compute_season(&ctx, &mut catalog.projects, 0, 2);
    assert_eq!(season.values.row(0).to_vec(), vec![1.0, 1.0]);
    assert_eq!(season.values.row(1).to_vec(), vec![0.0, 0.0]);
}

#[test]
fn test_cache_is_reused_on_second_load() {
    let dir = TempDir::new().unwrap();
    let catalog_path = write_catalog(&dir);
    let cache_path = cache_path_for(&catalog_path);
    let ctx = context(2);

    let first = load(&cache_path, &catalog_path, &ctx);
    assert_eq!(first.origin, LoadOrigin::Computed);
    assert!(cache_path.is_file());
    assert_eq!(read_format_tag(&cache_path).unwrap(), CacheFormat::Current);

    let second = load(&cache_path, &catalog_path, &ctx);
    assert_eq!(second.origin, LoadOrigin::Cache);
    assert_eq!(second.catalog.target_count(), first.catalog.target_count());

    let ids = |catalog: &Catalog| -> Vec<String> {
        catalog.projects.iter().map(|p| p.id.clone()).collect()
    };
    assert_eq!(ids(&second.catalog), ids(&first.catalog));

    for (before, after) in first.catalog.targets().zip(second.catalog.targets()) {
        assert_eq!(before.name, after.name);
        assert_eq!(before.proposal_id, after.proposal_id);
        assert!(before.uptime().is_some());
        assert_eq!(before.uptime(), after.uptime(), "uptime of {}", before.name);
    }
}

#[test]
fn test_grid_change_triggers_recomputation() {
    let dir = TempDir::new().unwrap();
    let catalog_path = write_catalog(&dir);
    let cache_path = cache_path_for(&catalog_path);

    load(&cache_path, &catalog_path, &context(2));

    let wider = context(3);
    let loaded = load(&cache_path, &catalog_path, &wider);
    assert_eq!(loaded.origin, LoadOrigin::CacheRecomputed);
    let uptime = loaded.catalog.projects[0].targets()[0].uptime().unwrap();
    assert_eq!(uptime.visible.dim(), (16, 3));

    // The rewritten cache now matches the wider grid
    let again = load(&cache_path, &catalog_path, &wider);
    assert_eq!(again.origin, LoadOrigin::Cache);
}

#[test]
fn test_corrupt_cache_is_an_error() {
    let dir = TempDir::new().unwrap();
    let catalog_path = write_catalog(&dir);
    let cache_path = cache_path_for(&catalog_path);

    fs::write(&cache_path, b"UPTM\x02not a payload").unwrap();
    let result = load_catalog(Some(&cache_path), &catalog_path, &context(2));
    assert!(matches!(result, Err(UptimeError::CacheDecode { .. })));

    fs::write(&cache_path, b"UPTM\x09").unwrap();
    let result = load_catalog(Some(&cache_path), &catalog_path, &context(2));
    assert!(matches!(result, Err(UptimeError::CacheFormat { .. })));

    // The broken cache is left in place
    assert_eq!(fs::read(&cache_path).unwrap(), b"UPTM\x09");
}

#[test]
fn test_no_cache_path_skips_persistence() {
    let dir = TempDir::new().unwrap();
    let catalog_path = write_catalog(&dir);

    let loaded = load_catalog(None, &catalog_path, &context(1)).unwrap();
    assert_eq!(loaded.origin, LoadOrigin::Computed);
    assert!(!cache_path_for(&catalog_path).exists());
}

#[test]
fn test_pressure_from_loaded_catalog() {
    let dir = TempDir::new().unwrap();
    let catalog_path = write_catalog(&dir);
    let ctx = context(2);
    let catalog = load(&cache_path_for(&catalog_path), &catalog_path, &ctx).catalog;

    let profile = compute_pressure(
        &catalog.projects,
        &[Rank::A, Rank::B],
        &["MX"],
        &PressureSettings::default(),
        0,
        1,
        &ctx,
    );
    // Only the pole target is ever up; its 2 hours spread over its LST hours
    let total: f64 = profile.total_demand().iter().sum();
    assert!((total - 2.0).abs() < 1e-9);
    let series = profile.series();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].label, "RSR-A");

    // 8 hours of samples, MX share 0.7, efficiency 0.5
    let reference: f64 = profile.reference.iter().sum();
    assert!((reference - 8.0 * 0.7 * 0.5).abs() < 1e-9);
}
