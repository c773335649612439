//! Versioned on-disk snapshot of computed projects.
//!
//! ## Layout
//! ```text
//! +------+---------+---------------------------------+
//! | UPTM | version | bincode payload (standard cfg)  |
//! +------+---------+---------------------------------+
//!   4 B     1 B
//! ```
//!
//! Version 1 is the legacy layout: text fields stored as raw bytes, no grid
//! spec and no catalog checksum. Version 2 stores text, the [`GridSpec`] the
//! uptimes were computed for, and the catalog checksum. The version byte is
//! read before anything else and selects the decode path; unknown versions
//! are rejected.
//!
//! Files are replaced whole (written to a sibling temp file, then renamed).
//! Two processes writing the same cache path concurrently is not supported.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, UptimeError, UptimeResult};
use crate::models::{
    CoordinateFrame, Instrument, Project, Rank, SkyCoordinate, Target, Uptime, LST_BUCKETS,
};
use crate::time::GridSpec;
use qtty::{Degrees, Hours};

/// File magic.
pub const CACHE_MAGIC: [u8; 4] = *b"UPTM";

const HEADER_LEN: usize = CACHE_MAGIC.len() + 1;

/// On-disk format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CacheFormat {
    Legacy = 1,
    Current = 2,
}

impl CacheFormat {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(CacheFormat::Legacy),
            2 => Some(CacheFormat::Current),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Decoded cache contents.
#[derive(Debug, Clone)]
pub struct CacheRecord {
    /// Grid the uptimes were computed for; `None` for legacy files.
    pub grid: Option<GridSpec>,
    /// SHA-256 of the catalog the projects came from; `None` for legacy files.
    pub catalog_checksum: Option<String>,
    pub projects: Vec<Project>,
}

#[derive(Serialize)]
struct CurrentPayloadRef<'a> {
    grid: &'a Option<GridSpec>,
    catalog_checksum: &'a Option<String>,
    projects: &'a [Project],
}

#[derive(Deserialize)]
struct CurrentPayload {
    grid: Option<GridSpec>,
    catalog_checksum: Option<String>,
    projects: Vec<Project>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyUptime {
    azimuth: Array2<f64>,
    elevation: Array2<f64>,
    visible: Array2<u8>,
    lst_histogram: [f64; LST_BUCKETS],
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyTarget {
    name: Vec<u8>,
    lon: f64,
    lat: f64,
    system: Vec<u8>,
    proposal_id: Vec<u8>,
    pi_name: Vec<u8>,
    instrument: Vec<u8>,
    integration_time: f64,
    rank: Vec<u8>,
    priority: Vec<u8>,
    uptime: Option<LegacyUptime>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyProject {
    id: Vec<u8>,
    targets: Vec<LegacyTarget>,
}

/// Decode stored text: UTF-8 when valid, Latin-1 otherwise.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

impl LegacyTarget {
    fn from_target(target: &Target) -> Self {
        Self {
            name: target.name.as_bytes().to_vec(),
            lon: target.coordinate.lon().value(),
            lat: target.coordinate.lat().value(),
            system: target.coordinate.frame().as_str().as_bytes().to_vec(),
            proposal_id: target.proposal_id.as_bytes().to_vec(),
            pi_name: target.pi_name.as_bytes().to_vec(),
            instrument: target.instrument.as_str().as_bytes().to_vec(),
            integration_time: target.integration_time.value(),
            rank: target.rank.as_str().as_bytes().to_vec(),
            priority: target.priority.as_bytes().to_vec(),
            uptime: target.uptime().map(|u| LegacyUptime {
                azimuth: u.azimuth.clone(),
                elevation: u.elevation.clone(),
                visible: u.visible.clone(),
                lst_histogram: u.lst_histogram,
            }),
        }
    }

    /// Convert to a target. The stored matrices are adopted for `grid` when
    /// their shape matches it; otherwise the target comes back without an
    /// uptime and must be recomputed.
    fn into_target(self, grid: &GridSpec, path: &Path) -> UptimeResult<Target> {
        let bad = |message: String| UptimeError::CacheDecode {
            message,
            context: ErrorContext::for_path(path),
        };

        let frame = CoordinateFrame::from_catalog(&decode_text(&self.system));
        let coordinate = SkyCoordinate::new(Degrees::new(self.lon), Degrees::new(self.lat), frame)
            .map_err(|e| bad(e.to_string()))?;
        let instrument = decode_text(&self.instrument)
            .parse::<Instrument>()
            .map_err(bad)?;
        let rank = decode_text(&self.rank).parse::<Rank>().map_err(bad)?;

        let mut target = Target::new(
            decode_text(&self.name),
            coordinate,
            decode_text(&self.proposal_id),
            decode_text(&self.pi_name),
            instrument,
            Hours::new(self.integration_time),
            rank,
            decode_text(&self.priority),
        );
        if let Some(stored) = self.uptime {
            if stored.visible.dim() == grid.shape() {
                target.set_uptime(Uptime {
                    grid: *grid,
                    azimuth: stored.azimuth,
                    elevation: stored.elevation,
                    visible: stored.visible,
                    lst_histogram: stored.lst_histogram,
                });
            }
        }
        Ok(target)
    }
}

fn encode_current(record: &CacheRecord) -> UptimeResult<Vec<u8>> {
    let payload = CurrentPayloadRef {
        grid: &record.grid,
        catalog_checksum: &record.catalog_checksum,
        projects: &record.projects,
    };
    bincode::serde::encode_to_vec(&payload, bincode::config::standard())
        .map_err(|e| UptimeError::CacheEncode(e.to_string()))
}

fn encode_legacy(record: &CacheRecord) -> UptimeResult<Vec<u8>> {
    let projects: Vec<LegacyProject> = record
        .projects
        .iter()
        .map(|p| LegacyProject {
            id: p.id.as_bytes().to_vec(),
            targets: p.targets().iter().map(LegacyTarget::from_target).collect(),
        })
        .collect();
    bincode::serde::encode_to_vec(&projects, bincode::config::standard())
        .map_err(|e| UptimeError::CacheEncode(e.to_string()))
}

/// Write `bytes` under the magic and version header, replacing `path` atomically.
fn write_atomic(path: &Path, format: CacheFormat, payload: &[u8]) -> UptimeResult<()> {
    let io_err = |source: std::io::Error| UptimeError::CacheIo {
        source,
        context: ErrorContext::for_path(path),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = temp_path_for(path);
    {
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&CACHE_MAGIC).map_err(io_err)?;
        file.write_all(&[format.tag()]).map_err(io_err)?;
        file.write_all(payload).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(e)
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `record` in an explicit format.
pub fn write_cache_with(
    path: &Path,
    record: &CacheRecord,
    format: CacheFormat,
) -> UptimeResult<()> {
    let payload = match format {
        CacheFormat::Current => encode_current(record)?,
        CacheFormat::Legacy => encode_legacy(record)?,
    };
    write_atomic(path, format, &payload)?;
    log::debug!(
        "Wrote {} projects to {} (format v{})",
        record.projects.len(),
        path.display(),
        format.tag()
    );
    Ok(())
}

/// Write `record` in the current format, falling back to the legacy one if
/// the current encoding fails.
pub fn write_cache(path: &Path, record: &CacheRecord) -> UptimeResult<CacheFormat> {
    match write_cache_with(path, record, CacheFormat::Current) {
        Ok(()) => Ok(CacheFormat::Current),
        Err(UptimeError::CacheEncode(message)) => {
            log::warn!(
                "Encoding {} in the current cache format failed ({}); writing legacy format",
                path.display(),
                message
            );
            write_cache_with(path, record, CacheFormat::Legacy)?;
            Ok(CacheFormat::Legacy)
        }
        Err(e) => Err(e),
    }
}

/// Read the format tag of a cache file without decoding the payload.
pub fn read_format_tag(path: &Path) -> UptimeResult<CacheFormat> {
    let bytes = fs::read(path).map_err(|source| UptimeError::CacheIo {
        source,
        context: ErrorContext::for_path(path),
    })?;
    parse_header(&bytes, path)
}

fn parse_header(bytes: &[u8], path: &Path) -> UptimeResult<CacheFormat> {
    let bad = |message: String| UptimeError::CacheFormat {
        message,
        context: ErrorContext::for_path(path),
    };
    if bytes.len() < HEADER_LEN {
        return Err(bad(format!("file too short ({} bytes)", bytes.len())));
    }
    if bytes[..CACHE_MAGIC.len()] != CACHE_MAGIC {
        return Err(bad("bad magic".to_string()));
    }
    let tag = bytes[CACHE_MAGIC.len()];
    CacheFormat::from_tag(tag).ok_or_else(|| bad(format!("unknown version {}", tag)))
}

fn decode_payload<T: serde::de::DeserializeOwned>(payload: &[u8], path: &Path) -> UptimeResult<T> {
    let bad = |message: String| UptimeError::CacheDecode {
        message,
        context: ErrorContext::for_path(path),
    };
    let (decoded, read) = bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .map_err(|e| bad(e.to_string()))?;
    if read != payload.len() {
        return Err(bad(format!(
            "{} trailing bytes after payload",
            payload.len() - read
        )));
    }
    Ok(decoded)
}

/// Read a cache file.
///
/// `grid` is the grid the caller is working with. It is only consulted for
/// legacy files, which do not record one: their matrices are tagged with
/// `grid` when the shapes agree.
pub fn read_cache(path: &Path, grid: &GridSpec) -> UptimeResult<CacheRecord> {
    let bytes = fs::read(path).map_err(|source| UptimeError::CacheIo {
        source,
        context: ErrorContext::for_path(path),
    })?;
    let format = parse_header(&bytes, path)?;
    let payload = &bytes[HEADER_LEN..];
    log::debug!("Reading {} (format v{})", path.display(), format.tag());

    match format {
        CacheFormat::Current => {
            let decoded: CurrentPayload = decode_payload(payload, path)?;
            Ok(CacheRecord {
                grid: decoded.grid,
                catalog_checksum: decoded.catalog_checksum,
                projects: decoded.projects,
            })
        }
        CacheFormat::Legacy => {
            let decoded: Vec<LegacyProject> = decode_payload(payload, path)?;
            let projects = decoded
                .into_iter()
                .map(|p| {
                    let targets = p
                        .targets
                        .into_iter()
                        .map(|t| t.into_target(grid, path))
                        .collect::<UptimeResult<Vec<_>>>()?;
                    Ok(Project::with_targets(decode_text(&p.id), targets))
                })
                .collect::<UptimeResult<Vec<_>>>()?;
            Ok(CacheRecord {
                grid: None,
                catalog_checksum: None,
                projects,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn spec() -> GridSpec {
        GridSpec {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            day_count: 2,
            hours_per_night: 1,
            subdivisions_per_hour: 1,
            nightly_start_offset_seconds: 10800,
            site: crate::models::Observatory::LMT,
        }
    }

    fn record() -> CacheRecord {
        let coord = SkyCoordinate::equatorial(Degrees::new(83.6), Degrees::new(22.0)).unwrap();
        let mut target = Target::new(
            "Crab",
            coord,
            "MX-01",
            "Pérez",
            Instrument::Toltec,
            Hours::new(1.5),
            Rank::B,
            "2",
        );
        let mut hist = [0.0; LST_BUCKETS];
        hist[5] = 1.0;
        target.set_uptime(Uptime {
            grid: spec(),
            azimuth: array![[10.0, 20.0]],
            elevation: array![[30.0, 85.0]],
            visible: array![[1, 0]],
            lst_histogram: hist,
        });
        CacheRecord {
            grid: Some(spec()),
            catalog_checksum: Some("abc".to_string()),
            projects: vec![Project::with_targets("MX-01", vec![target])],
        }
    }

    #[test]
    fn test_current_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.cache");
        assert_eq!(write_cache(&path, &record()).unwrap(), CacheFormat::Current);
        assert_eq!(read_format_tag(&path).unwrap(), CacheFormat::Current);

        let back = read_cache(&path, &spec()).unwrap();
        assert_eq!(back.grid, Some(spec()));
        assert_eq!(back.catalog_checksum.as_deref(), Some("abc"));
        let target = &back.projects[0].targets()[0];
        assert_eq!(target.pi_name, "Pérez");
        assert_eq!(target.uptime(), record().projects[0].targets()[0].uptime());
        assert!(!dir.path().join("targets.cache.tmp").exists());
    }

    #[test]
    fn test_legacy_decodes_to_same_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.cache");
        write_cache_with(&path, &record(), CacheFormat::Legacy).unwrap();
        assert_eq!(read_format_tag(&path).unwrap(), CacheFormat::Legacy);

        let back = read_cache(&path, &spec()).unwrap();
        assert_eq!(back.grid, None);
        assert_eq!(back.catalog_checksum, None);
        let original = record().projects[0].targets()[0].clone();
        let target = &back.projects[0].targets()[0];
        assert_eq!(back.projects[0].id, "MX-01");
        assert_eq!(target.name, original.name);
        assert_eq!(target.pi_name, original.pi_name);
        assert_eq!(target.instrument, Instrument::Toltec);
        assert_eq!(target.rank, Rank::B);
        assert_eq!(target.uptime_for(&spec()), original.uptime());
    }

    #[test]
    fn test_legacy_with_other_shape_drops_uptime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.cache");
        write_cache_with(&path, &record(), CacheFormat::Legacy).unwrap();

        let mut other = spec();
        other.day_count = 3;
        let back = read_cache(&path, &other).unwrap();
        assert!(back.projects[0].targets()[0].uptime().is_none());
    }

    #[test]
    fn test_latin1_text() {
        assert_eq!(decode_text(b"Perez"), "Perez");
        assert_eq!(decode_text("Pérez".as_bytes()), "Pérez");
        assert_eq!(decode_text(&[b'P', 0xE9, b'r']), "Pér");
    }

    #[test]
    fn test_unknown_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.cache");
        fs::write(&path, b"UPTM\x07rest").unwrap();
        assert!(matches!(
            read_cache(&path, &spec()),
            Err(UptimeError::CacheFormat { .. })
        ));

        fs::write(&path, b"PK\x03\x04\x02").unwrap();
        assert!(matches!(
            read_format_tag(&path),
            Err(UptimeError::CacheFormat { .. })
        ));

        fs::write(&path, b"UP").unwrap();
        assert!(matches!(
            read_format_tag(&path),
            Err(UptimeError::CacheFormat { .. })
        ));
    }

    #[test]
    fn test_corrupt_payload_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.cache");
        fs::write(&path, b"UPTM\x02\xff\xff\xff").unwrap();
        let err = read_cache(&path, &spec()).unwrap_err();
        assert!(matches!(err, UptimeError::CacheDecode { .. }), "{err:?}");
        assert!(err.is_cache_error());
    }
}
