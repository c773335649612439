//! Target catalog reader.
//!
//! Catalogs are comma separated with a header row. Every column is read as
//! text by the polars CSV reader and then validated row by row into a
//! [`CatalogRow`], so a malformed value fails with its row number instead of
//! turning into a null or NaN further down. Blank cells are accepted only in
//! the free-text columns (`name_pi`, `source`, `priority`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use qtty::{Degrees, Hours};

use crate::error::{ErrorContext, UptimeError, UptimeResult};
use crate::models::coordinates::{parse_angle, CoordinateFrame, SkyCoordinate};
use crate::models::{Instrument, Project, Rank, Target};

/// Columns every catalog must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "proposal_id",
    "name_pi",
    "source",
    "ra",
    "dec",
    "system",
    "instrument",
    "time",
    "priority",
];

/// Rank columns in order of preference.
pub const RANK_COLUMNS: [&str; 2] = ["rank", "ranking"];

/// One validated catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub proposal_id: String,
    pub pi_name: String,
    pub source: String,
    pub ra: Degrees,
    pub dec: Degrees,
    pub frame: CoordinateFrame,
    pub instrument: Instrument,
    pub integration_time: Hours,
    pub priority: String,
    pub rank: Rank,
}

impl CatalogRow {
    pub fn into_target(self) -> UptimeResult<Target> {
        let coordinate = SkyCoordinate::new(self.ra, self.dec, self.frame)?;
        Ok(Target::new(
            self.source,
            coordinate,
            self.proposal_id,
            self.pi_name,
            self.instrument,
            self.integration_time,
            self.rank,
            self.priority,
        ))
    }
}

/// Projects parsed from one catalog file, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub projects: Vec<Project>,
}

impl Catalog {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    /// All targets, project by project.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.projects.iter().flat_map(|p| p.targets().iter())
    }

    pub fn target_count(&self) -> usize {
        self.projects.iter().map(Project::len).sum()
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Zero-pad the number following a hyphen when it is a single digit.
///
/// Only the first hyphen directly followed by a digit counts: `"MX-1"`
/// becomes `"MX-01"` and `"2024-MX-1"` becomes `"2024-MX-01"`, while
/// `"MX-12"` and `"MX"` are returned as given.
pub fn normalize_proposal_id(id: &str) -> String {
    let id = id.trim();
    let number_start = id
        .match_indices('-')
        .map(|(i, _)| i + 1)
        .find(|&start| id[start..].starts_with(|c: char| c.is_ascii_digit()));
    let Some(start) = number_start else {
        return id.to_string();
    };
    let digits = id[start..].chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 1 {
        format!("{}0{}", &id[..start], &id[start..])
    } else {
        id.to_string()
    }
}

/// Read a catalog into a DataFrame with every column as text.
pub fn read_catalog_frame(path: &Path) -> UptimeResult<DataFrame> {
    let context = || ErrorContext::for_path(path);
    if !path.is_file() {
        return Err(UptimeError::CatalogRead {
            message: "file not found".to_string(),
            context: context(),
        });
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_encoding(CsvEncoding::LossyUtf8))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
        .map_err(|e| UptimeError::CatalogRead {
            message: e.to_string(),
            context: context(),
        })
}

/// Text columns of a catalog, looked up by trimmed, case-insensitive header.
struct CatalogColumns<'a> {
    required: HashMap<&'static str, &'a StringChunked>,
    rank: Option<&'a StringChunked>,
}

impl<'a> CatalogColumns<'a> {
    fn resolve(df: &'a DataFrame, path: &Path) -> UptimeResult<Self> {
        let headers: HashMap<String, String> = df
            .get_column_names()
            .iter()
            .map(|name| (name.trim().to_ascii_lowercase(), name.to_string()))
            .collect();

        let text_column = |wanted: &str| -> UptimeResult<Option<&'a StringChunked>> {
            let Some(actual) = headers.get(wanted) else {
                return Ok(None);
            };
            let column = df
                .column(actual)
                .and_then(|c| c.str())
                .map_err(|e| UptimeError::CatalogRead {
                    message: e.to_string(),
                    context: ErrorContext::for_path(path).with_details(wanted.to_string()),
                })?;
            Ok(Some(column))
        };

        let mut required = HashMap::new();
        for name in REQUIRED_COLUMNS {
            let column = text_column(name)?.ok_or_else(|| UptimeError::MissingColumn {
                column: name.to_string(),
                context: ErrorContext::for_path(path),
            })?;
            required.insert(name, column);
        }

        let mut rank = None;
        for name in RANK_COLUMNS {
            if let Some(column) = text_column(name)? {
                log::debug!("Reading rank from column '{}'", name);
                rank = Some(column);
                break;
            }
        }

        Ok(Self { required, rank })
    }

    fn text(&self, name: &'static str, row: usize, path: &Path) -> UptimeResult<String> {
        self.required
            .get(name)
            .and_then(|column| column.get(row))
            .map(|value| value.trim().to_string())
            .ok_or_else(|| UptimeError::InvalidRow {
                message: format!("missing value for '{}'", name),
                context: ErrorContext::for_path(path).with_row(row),
            })
    }

    /// Free-text value where a blank cell reads as an empty string.
    fn free_text(&self, name: &'static str, row: usize) -> String {
        self.required
            .get(name)
            .and_then(|column| column.get(row))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }
}

fn parse_row(columns: &CatalogColumns<'_>, row: usize, path: &Path) -> UptimeResult<CatalogRow> {
    let invalid = |message: String| UptimeError::InvalidRow {
        message,
        context: ErrorContext::for_path(path).with_row(row),
    };

    let ra = parse_angle(&columns.text("ra", row, path)?)
        .map_err(|e| invalid(format!("ra: {}", e)))?;
    let dec = parse_angle(&columns.text("dec", row, path)?)
        .map_err(|e| invalid(format!("dec: {}", e)))?;

    let instrument = columns
        .text("instrument", row, path)?
        .parse::<Instrument>()
        .map_err(invalid)?;

    let time_text = columns.text("time", row, path)?;
    let hours = time_text
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite() && *h >= 0.0)
        .ok_or_else(|| invalid(format!("invalid integration time '{}'", time_text)))?;

    let rank = match columns.rank.and_then(|c| c.get(row)).map(str::trim) {
        Some(value) if !value.is_empty() => value.parse::<Rank>().map_err(invalid)?,
        _ => Rank::default(),
    };

    Ok(CatalogRow {
        proposal_id: normalize_proposal_id(&columns.text("proposal_id", row, path)?),
        pi_name: columns.free_text("name_pi", row),
        source: columns.free_text("source", row),
        ra,
        dec,
        frame: CoordinateFrame::from_catalog(&columns.text("system", row, path)?),
        instrument,
        integration_time: Hours::new(hours),
        priority: columns.free_text("priority", row),
        rank,
    })
}

/// Validate every row of a catalog DataFrame.
pub fn dataframe_to_rows(df: &DataFrame, path: &Path) -> UptimeResult<Vec<CatalogRow>> {
    let columns = CatalogColumns::resolve(df, path)?;
    (0..df.height())
        .map(|row| parse_row(&columns, row, path))
        .collect()
}

/// Group targets under the given project ids.
///
/// Projects keep the order of `project_ids`; each takes, in order, the
/// targets whose proposal id equals its id. Targets matching no project are
/// dropped and only reported at debug level.
pub fn group_into_projects(project_ids: &[String], targets: Vec<Target>) -> Vec<Project> {
    let mut projects: Vec<Project> = project_ids.iter().map(Project::new).collect();
    let index: HashMap<&str, usize> = project_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut dropped = 0usize;
    for target in targets {
        match index.get(target.proposal_id.as_str()) {
            Some(&i) => projects[i].push_target(target),
            None => {
                log::debug!(
                    "Dropping target '{}': no project '{}'",
                    target.name,
                    target.proposal_id
                );
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        log::debug!("{} targets matched no project", dropped);
    }
    projects
}

/// Parse a catalog file into projects and targets.
pub fn parse_catalog(path: &Path) -> UptimeResult<Catalog> {
    let df = read_catalog_frame(path)?;
    let rows = dataframe_to_rows(&df, path)?;

    let mut project_ids: Vec<String> = Vec::new();
    for row in &rows {
        if !project_ids.contains(&row.proposal_id) {
            project_ids.push(row.proposal_id.clone());
        }
    }

    let targets = rows
        .into_iter()
        .map(CatalogRow::into_target)
        .collect::<UptimeResult<Vec<_>>>()?;

    log::info!(
        "Parsed {} targets in {} projects from {}",
        targets.len(),
        project_ids.len(),
        path.display()
    );

    Ok(Catalog::new(group_into_projects(&project_ids, targets)))
}
