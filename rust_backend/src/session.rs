//! Per-session state: the observing context, the loaded project groups and
//! the paged window over a project's sources.
//!
//! Every session owns its own state, so concurrent sessions never share
//! mutable data.

use std::fmt;
use std::ops::Range;

use crate::config::AvailabilityConfig;
use crate::io::store::{cache_path_for, load_or_compute};
use crate::models::{Project, Rank};
use crate::parsing::catalog::Catalog;
use crate::services::pressure::{compute_pressure, PressureProfile, PressureSettings};
use crate::services::season::{compute_season, SeasonMatrix};
use crate::services::uptimes::{project_uptime_curves, uber_up_heatmap, UberUpHeatmap, UptimeCurves};
use crate::time::ObservingContext;

/// Sources shown per page.
pub const SOURCE_PAGE: usize = 6;

/// Paged range over the sources of the selected project.
///
/// Mirrors the dashboard's All / Prev / Next buttons: paging is a no-op
/// when a project has fewer sources than a page, `prev` from the first page
/// and `next` from the last page pin the window to that page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceWindow {
    start: usize,
    end: usize,
    source_count: usize,
    message: String,
}

impl Default for SourceWindow {
    fn default() -> Self {
        Self::new(SOURCE_PAGE)
    }
}

impl SourceWindow {
    /// First page over `source_count` sources.
    pub fn new(source_count: usize) -> Self {
        let mut window = Self {
            start: 0,
            end: SOURCE_PAGE,
            source_count,
            message: String::new(),
        };
        window.message = window.range_message();
        window
    }

    /// Track a new source count, keeping the current page.
    pub fn set_source_count(&mut self, source_count: usize) {
        self.source_count = source_count;
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }

    /// Range to slice the source list with, clamped to the source count.
    pub fn range(&self) -> Range<usize> {
        let end = self.end.min(self.source_count);
        self.start.min(end)..end
    }

    /// Status line describing the window.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn range_message(&self) -> String {
        format!("Source {} to {}", self.start + 1, self.end)
    }

    fn short_list_message(&self) -> String {
        format!("source 1 to {}", self.source_count)
    }

    /// Show every source.
    pub fn all(&mut self) -> &str {
        self.start = 0;
        self.end = self.source_count;
        self.message = format!("Total source(s): {}", self.source_count);
        &self.message
    }

    pub fn prev(&mut self) -> &str {
        if self.source_count < SOURCE_PAGE {
            self.message = self.short_list_message();
            return &self.message;
        }
        if self.start == 0 {
            self.end = SOURCE_PAGE;
        } else {
            self.start = self.start.saturating_sub(SOURCE_PAGE);
            self.end = self.end.saturating_sub(SOURCE_PAGE);
        }
        self.message = self.range_message();
        &self.message
    }

    pub fn next(&mut self) -> &str {
        if self.source_count < SOURCE_PAGE {
            self.message = self.short_list_message();
            return &self.message;
        }
        if self.end >= self.source_count - SOURCE_PAGE {
            self.start = self.source_count - SOURCE_PAGE;
            self.end = self.source_count;
        } else {
            self.start += SOURCE_PAGE;
            self.end += SOURCE_PAGE;
        }
        self.message = self.range_message();
        &self.message
    }
}

/// A catalog loaded for one project group.
#[derive(Debug, Clone)]
pub struct GroupCatalog {
    pub group: String,
    pub catalog: Catalog,
}

/// State of one dashboard session.
pub struct Session {
    ctx: ObservingContext,
    groups: Vec<GroupCatalog>,
    pub window: SourceWindow,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("grid", self.ctx.grid().spec())
            .field(
                "groups",
                &self.groups.iter().map(|g| g.group.as_str()).collect::<Vec<_>>(),
            )
            .field("window", &self.window)
            .finish()
    }
}

impl Session {
    pub fn new(ctx: ObservingContext) -> Self {
        Self {
            ctx,
            groups: Vec::new(),
            window: SourceWindow::default(),
        }
    }

    /// Session over the grid described by `config`, with its default groups loaded.
    pub fn from_config(config: &AvailabilityConfig) -> crate::error::UptimeResult<Self> {
        let mut session = Self::new(config.build_context()?);
        session.load_groups(config, &config.project.prjs);
        Ok(session)
    }

    pub fn context(&self) -> &ObservingContext {
        &self.ctx
    }

    /// Replace the loaded catalogs with those of `groups`.
    ///
    /// Each group's catalog goes through the cache next to it. Groups with no
    /// catalog configured, or whose catalog or cache fails to load, are
    /// logged and skipped.
    pub fn load_groups<S: AsRef<str>>(&mut self, config: &AvailabilityConfig, groups: &[S]) {
        self.groups.clear();
        for group in groups {
            let group = group.as_ref().trim().to_uppercase();
            let Some(catalog_path) = config.catalog_path(&group) else {
                log::warn!("No catalog configured for group '{}'", group);
                continue;
            };
            let cache_path = cache_path_for(&catalog_path);
            match load_or_compute(Some(&cache_path), &catalog_path, &self.ctx) {
                Ok(catalog) => {
                    log::info!(
                        "Loaded group {}: {} projects, {} targets",
                        group,
                        catalog.projects.len(),
                        catalog.target_count()
                    );
                    self.groups.push(GroupCatalog { group, catalog });
                }
                Err(e) => log::error!("Skipping group {}: {}", group, e),
            }
        }
    }

    /// Add an already loaded catalog under `group`.
    pub fn insert_group(&mut self, group: impl Into<String>, catalog: Catalog) {
        self.groups.push(GroupCatalog {
            group: group.into(),
            catalog,
        });
    }

    /// Codes of the loaded groups, in load order.
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.group.clone()).collect()
    }

    /// Every loaded project, group by group.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.groups.iter().flat_map(|g| g.catalog.projects.iter())
    }

    /// Non-empty projects whose first target's rank is selected.
    pub fn select_projects(&self, ranks: &[Rank]) -> Vec<&Project> {
        self.projects().filter(|p| is_selected(p, ranks)).collect()
    }

    /// Pressure profile of the selected projects against the loaded groups.
    pub fn pressure(
        &self,
        ranks: &[Rank],
        settings: &PressureSettings,
        day_start: usize,
        day_end: usize,
    ) -> PressureProfile {
        compute_pressure(
            self.select_projects(ranks),
            ranks,
            &self.group_names(),
            settings,
            day_start,
            day_end,
            &self.ctx,
        )
    }

    pub fn season(&mut self, ranks: &[Rank], day_start: usize, day_end: usize) -> SeasonMatrix {
        compute_season(
            &self.ctx,
            selected_mut(&mut self.groups, ranks),
            day_start,
            day_end,
        )
    }

    /// Elevation curves of the `project_index`-th selected project on night
    /// `day`, over the current source window.
    pub fn uptime_curves(
        &mut self,
        ranks: &[Rank],
        project_index: usize,
        day: usize,
    ) -> Option<UptimeCurves> {
        let project = *self.select_projects(ranks).get(project_index)?;
        let source_count = project.len();
        let mut window = self.window.clone();
        window.set_source_count(source_count);
        let curves = project_uptime_curves(project, &self.ctx, day, window.range());
        self.window = window;
        Some(curves)
    }

    pub fn uber_up(
        &mut self,
        ranks: &[Rank],
        project_index: usize,
        day_start: usize,
        day_end: usize,
    ) -> Option<UberUpHeatmap> {
        let project = selected_mut(&mut self.groups, ranks).nth(project_index)?;
        Some(uber_up_heatmap(project, &self.ctx, day_start, day_end))
    }
}

fn is_selected(project: &Project, ranks: &[Rank]) -> bool {
    project.leading_rank().is_some_and(|r| ranks.contains(&r))
}

fn selected_mut<'a>(
    groups: &'a mut [GroupCatalog],
    ranks: &'a [Rank],
) -> impl Iterator<Item = &'a mut Project> + 'a {
    groups
        .iter_mut()
        .flat_map(|g| g.catalog.projects.iter_mut())
        .filter(move |p| is_selected(p, ranks))
}
