use crate::chart::Chart;
use crate::config::Config;
use crate::data::{Preview, Table};
use crate::dispatch::{dispatch, PlotRequest};
use crate::error::IngestError;
use crate::export;
use crate::ingest::{self, FailedAttempt, FileKind};
use anyhow::{anyhow, Result};

/// State for one user's upload-select-generate cycle.
///
/// Holds at most one table and one chart. Nothing here is shared; callers
/// own the session and pass it where it is needed.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: Config,
    table: Option<Table>,
    chart: Option<Chart>,
}

/// What the user sees after an upload
#[derive(Debug, Clone)]
pub struct Loaded {
    pub preview: Preview,
    /// Configurations that failed before one succeeded, for display
    pub failed_attempts: Vec<FailedAttempt>,
}

/// Result of a successful "generate" action
#[derive(Debug, Clone)]
pub struct Generated {
    pub png: Vec<u8>,
    pub download_link: String,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            table: None,
            chart: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }

    /// Resolve an uploaded file and make it the current table.
    ///
    /// `header_row` falls back to the configured default. On failure the
    /// previous table and chart are discarded.
    pub fn load(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        header_row: Option<usize>,
    ) -> Result<Loaded, IngestError> {
        self.table = None;
        self.chart = None;

        let kind = FileKind::from_file_name(file_name)?;
        let header_row = header_row.unwrap_or(self.config.header_row);
        let resolution = ingest::resolve(bytes, header_row, kind)?;

        let preview = resolution.table.preview(self.config.preview_rows);
        self.table = Some(resolution.table);

        Ok(Loaded {
            preview,
            failed_attempts: resolution.failed_attempts,
        })
    }

    pub fn preview(&self) -> Option<Preview> {
        self.table
            .as_ref()
            .map(|t| t.preview(self.config.preview_rows))
    }

    /// Build, render and export a chart from the current table.
    ///
    /// A rejected request clears the current chart.
    pub fn generate(&mut self, request: &PlotRequest) -> Result<Generated> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| anyhow!("No table loaded; upload a file first"))?;

        let chart = match dispatch(table, request) {
            Ok(chart) => chart,
            Err(e) => {
                self.chart = None;
                return Err(e.into());
            }
        };

        let chart = self.chart.insert(chart);
        let png = export::export(chart, &self.config.render)?;
        let download_link = export::download_link(&png);

        Ok(Generated { png, download_link })
    }
}
