pub mod csv;
pub mod rows;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::ingest::{ingest_draft, IngestOutcome};
use crate::scoring::ScoringConfig;
use crate::store::Database;

pub use rows::{parse_timestamp, rows_to_drafts, ParsedRows, OPTIONAL_COLUMNS, REQUIRED_COLUMNS};

/// Tally of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub added: usize,
    pub corroborated: usize,
    pub duplicates: usize,
    /// Rows that were inserted but could not be scored
    pub unscored: usize,
    /// Row-level problems, prefixed with the file name
    pub errors: Vec<String>,
}

/// Expand glob patterns into a sorted, de-duplicated list of files.
/// A pattern that is a plain existing path is taken as-is.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern '{}'", pattern))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "unreadable path while expanding pattern");
                    None
                }
            })
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            bail!("No files match '{}'", pattern);
        }
        files.extend(matches);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Read and parse one CSV file into drafts.
pub fn read_csv_file(path: &Path) -> Result<ParsedRows> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records = csv::parse_rows(&text);
    rows_to_drafts(&records).with_context(|| format!("Failed to import {}", path.display()))
}

/// Push parsed drafts through duplicate detection into the database.
pub fn apply_rows(
    db: &mut Database,
    file_label: &str,
    parsed: ParsedRows,
    calibration: &ScoringConfig,
    now: DateTime<Utc>,
    report: &mut ImportReport,
) {
    report
        .errors
        .extend(parsed.errors.into_iter().map(|e| format!("{}: {}", file_label, e)));

    for (row, draft) in parsed.drafts {
        match ingest_draft(db, &draft, calibration, now) {
            Ok((outcome, summary)) => {
                report.unscored += summary.unscored.len();
                match outcome {
                    IngestOutcome::New(_) => report.added += 1,
                    IngestOutcome::Corroborated(_) => report.corroborated += 1,
                    IngestOutcome::Duplicate(reason) => {
                        debug!(file = file_label, row, %reason, "duplicate row");
                        report.duplicates += 1;
                    }
                }
            }
            Err(e) => {
                warn!(file = file_label, row, error = %e, "row rejected");
                report.errors.push(format!("{}: Row {}: {:#}", file_label, row, e));
            }
        }
    }
}

/// Import every file matched by `patterns`.
///
/// A file that cannot be read or lacks required columns aborts the import;
/// bad rows are reported and skipped.
pub fn import_files(
    db: &mut Database,
    patterns: &[String],
    calibration: &ScoringConfig,
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    let files = expand_patterns(patterns)?;
    let mut report = ImportReport::default();
    for path in files {
        let parsed = read_csv_file(&path)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        apply_rows(db, &label, parsed, calibration, now, &mut report);
    }
    Ok(report)
}
