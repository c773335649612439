//! Persistence of computed visibility.
//!
//! [`store`] combines catalog parsing with the versioned binary [`cache`];
//! [`checksum`] fingerprints catalog files so a cache can tell when its
//! catalog changed underneath it.
//!
//! # Example
//!
//! ```no_run
//! use uptime_rust::io::store::{cache_path_for, load_or_compute};
//! use uptime_rust::time::{build_grid, parse_date, ObservingContext};
//! use chrono::Duration;
//! use std::path::Path;
//!
//! let grid = build_grid(
//!     parse_date("2025/01/01").unwrap(),
//!     parse_date("2025/02/01").unwrap(),
//!     13,
//!     4,
//!     Duration::hours(3),
//! )
//! .unwrap();
//! let ctx = ObservingContext::new(grid);
//! let catalog_path = Path::new("mx_targets.csv");
//! let cache = cache_path_for(catalog_path);
//! let catalog = load_or_compute(Some(&cache), catalog_path, &ctx)
//!     .expect("Failed to load");
//! println!("Loaded {} targets", catalog.target_count());
//! ```

pub mod cache;
pub mod checksum;
pub mod store;

pub use cache::{read_cache, write_cache, write_cache_with, CacheFormat, CacheRecord};
pub use store::{cache_path_for, load_catalog, load_or_compute, LoadOrigin, LoadedCatalog};
