//! Parsers for observatory input files.
//!
//! - [`catalog`]: target catalogs (CSV with a header row)
//!
//! # Example
//!
//! ```no_run
//! use uptime_rust::parsing::catalog::parse_catalog;
//! use std::path::Path;
//!
//! let catalog = parse_catalog(Path::new("targets.csv"))
//!     .expect("Failed to parse catalog");
//! println!("{} projects", catalog.projects.len());
//! ```

pub mod catalog;


pub use catalog::{normalize_proposal_id, parse_catalog, Catalog, CatalogRow};
