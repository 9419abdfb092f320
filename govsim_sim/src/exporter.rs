//! Result table exporters.
//!
//! The table is written once, after every run has committed. CSV is the
//! spreadsheet-importable form; JSON additionally carries run metadata and
//! the per-generation summary.

use govsim_core::{summarize, GenerationSummary, RunRecord, COLUMNS};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while persisting the table.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize table: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Consumer of the finished, ordered record sequence.
pub trait PersistenceSink {
    /// Writes all records in order.
    fn write_table(&mut self, records: &[RunRecord]) -> Result<(), ExportError>;
}

/// Table file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// Infers the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn create_file(path: &Path) -> Result<File, ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

/// Writes the table as comma-separated values with a header row.
pub struct CsvTableSink {
    path: PathBuf,
}

impl CsvTableSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Renders the table without touching the filesystem.
    pub fn render(records: &[RunRecord]) -> String {
        let mut out = COLUMNS.join(",");
        out.push('\n');
        for record in records {
            out.push_str(&record.cells().join(","));
            out.push('\n');
        }
        out
    }
}

impl PersistenceSink for CsvTableSink {
    fn write_table(&mut self, records: &[RunRecord]) -> Result<(), ExportError> {
        let mut file = create_file(&self.path)?;
        file.write_all(Self::render(records).as_bytes())?;
        Ok(())
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Seed used
    pub seed: u64,

    /// Number of runs
    pub total_runs: u64,

    /// Samples that hit the rejection cap
    pub clamped_draws: u64,

    /// Column headers in table order
    pub columns: Vec<String>,

    /// All rows
    pub records: Vec<RunRecord>,

    /// Per-generation aggregates
    pub summary: Vec<GenerationSummary>,
}

impl SimExport {
    pub fn new(seed: u64, clamped_draws: u64, records: &[RunRecord]) -> Self {
        Self {
            seed,
            total_runs: records.len() as u64,
            clamped_draws,
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            records: records.to_vec(),
            summary: summarize(records),
        }
    }
}

/// Writes the table as a JSON document with run metadata.
pub struct JsonTableSink {
    path: PathBuf,
    seed: u64,
    clamped_draws: u64,
}

impl JsonTableSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed: 0,
            clamped_draws: 0,
        }
    }

    /// Attaches run metadata to the document.
    pub fn with_metadata(mut self, seed: u64, clamped_draws: u64) -> Self {
        self.seed = seed;
        self.clamped_draws = clamped_draws;
        self
    }
}

impl PersistenceSink for JsonTableSink {
    fn write_table(&mut self, records: &[RunRecord]) -> Result<(), ExportError> {
        let export = SimExport::new(self.seed, self.clamped_draws, records);
        let json = serde_json::to_string_pretty(&export)?;
        let mut file = create_file(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Builds the sink for a format.
pub fn sink_for(
    format: OutputFormat,
    path: &Path,
    seed: u64,
    clamped_draws: u64,
) -> Box<dyn PersistenceSink> {
    match format {
        OutputFormat::Csv => Box::new(CsvTableSink::new(path)),
        OutputFormat::Json => Box::new(JsonTableSink::new(path).with_metadata(seed, clamped_draws)),
    }
}
