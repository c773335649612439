//! Catalog store: catalog parsing plus the visibility cache.

use std::path::{Path, PathBuf};

use crate::error::UptimeResult;
use crate::io::cache::{read_cache, write_cache, CacheRecord};
use crate::io::checksum::checksum_file;
use crate::parsing::catalog::{parse_catalog, Catalog};
use crate::services::visibility::compute_project_uptimes;
use crate::time::ObservingContext;

/// Where the returned projects came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Parsed from the catalog and computed from scratch.
    Computed,
    /// Read from the cache as is.
    Cache,
    /// Read from the cache, but the uptimes belonged to another grid and were recomputed.
    CacheRecomputed,
}

#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub origin: LoadOrigin,
}

/// Default cache location for a catalog: same path, extension `cache`.
pub fn cache_path_for(catalog_path: &Path) -> PathBuf {
    catalog_path.with_extension("cache")
}

/// Load the projects of `catalog_path` with uptimes for `ctx`'s grid.
///
/// See [`load_catalog`] for the cache rules.
pub fn load_or_compute(
    cache_path: Option<&Path>,
    catalog_path: &Path,
    ctx: &ObservingContext,
) -> UptimeResult<Catalog> {
    load_catalog(cache_path, catalog_path, ctx).map(|loaded| loaded.catalog)
}

/// Load the projects of `catalog_path` with uptimes for `ctx`'s grid.
///
/// - No cache path, or no file at it: parse the catalog, compute every
///   uptime and write the cache (when a path was given).
/// - Cache present: decode it. A corrupt or unknown cache is an error and is
///   never replaced by a recomputation. Uptimes computed for another grid
///   are recomputed and the cache rewritten. A catalog checksum that no
///   longer matches the catalog file is only reported.
pub fn load_catalog(
    cache_path: Option<&Path>,
    catalog_path: &Path,
    ctx: &ObservingContext,
) -> UptimeResult<LoadedCatalog> {
    let spec = ctx.grid().spec();

    let cache_path = cache_path.filter(|p| !p.as_os_str().is_empty());
    let Some(cache_path) = cache_path.filter(|p| p.is_file()) else {
        let mut catalog = parse_catalog(catalog_path)?;
        log::info!(
            "Computing uptimes for {} targets of {}",
            catalog.target_count(),
            catalog_path.display()
        );
        for project in &mut catalog.projects {
            compute_project_uptimes(project, ctx);
        }
        if let Some(path) = cache_path {
            let checksum = checksum_file(catalog_path).ok();
            persist(path, &catalog, ctx, checksum);
        }
        return Ok(LoadedCatalog {
            catalog,
            origin: LoadOrigin::Computed,
        });
    };

    let record = read_cache(cache_path, spec)?;
    log::info!(
        "Loaded {} projects from cache {}",
        record.projects.len(),
        cache_path.display()
    );

    let current_checksum = checksum_file(catalog_path).ok();
    match (&record.catalog_checksum, &current_checksum) {
        (Some(cached), Some(current)) if cached != current => log::warn!(
            "Catalog {} changed since {} was written; delete the cache to pick up the changes",
            catalog_path.display(),
            cache_path.display()
        ),
        (Some(_), None) => log::debug!(
            "Catalog {} unreadable, skipping checksum check",
            catalog_path.display()
        ),
        _ => {}
    }

    let mut catalog = Catalog::new(record.projects);
    let stale = catalog
        .targets()
        .any(|target| target.uptime_for(spec).is_none());
    if !stale {
        return Ok(LoadedCatalog {
            catalog,
            origin: LoadOrigin::Cache,
        });
    }

    log::info!(
        "Cached uptimes in {} do not match the current grid; recomputing",
        cache_path.display()
    );
    for project in &mut catalog.projects {
        compute_project_uptimes(project, ctx);
    }
    persist(
        cache_path,
        &catalog,
        ctx,
        record.catalog_checksum.or(current_checksum),
    );
    Ok(LoadedCatalog {
        catalog,
        origin: LoadOrigin::CacheRecomputed,
    })
}

/// Write the cache, reporting but not propagating failures: the computed
/// projects are still usable without it.
fn persist(path: &Path, catalog: &Catalog, ctx: &ObservingContext, checksum: Option<String>) {
    let record = CacheRecord {
        grid: Some(*ctx.grid().spec()),
        catalog_checksum: checksum,
        projects: catalog.projects.clone(),
    };
    if let Err(e) = write_cache(path, &record) {
        log::warn!("Failed to write cache {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_for() {
        assert_eq!(
            cache_path_for(Path::new("/data/mx_targets.csv")),
            PathBuf::from("/data/mx_targets.cache")
        );
        assert_eq!(
            cache_path_for(Path::new("targets")),
            PathBuf::from("targets.cache")
        );
    }
}
