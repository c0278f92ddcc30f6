use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::ingest::RumourDraft;
use crate::model::{Position, SourceKind};

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "player_name",
    "position",
    "current_club",
    "target_club",
    "league",
    "source_name",
    "source_type",
];

pub const OPTIONAL_COLUMNS: [&str; 9] = [
    "age",
    "nationality",
    "reported_fee",
    "contract_years_left",
    "source_url",
    "source_claim",
    "reported_at",
    "corroboration",
    "contradicted",
];

/// Drafts read from one CSV file, with the rows that were rejected.
#[derive(Debug, Default)]
pub struct ParsedRows {
    /// (row number, draft); the header is row 1
    pub drafts: Vec<(usize, RumourDraft)>,
    /// One `Row N: ...` message per rejected row
    pub errors: Vec<String>,
}

/// Column lookup built from the header row.
struct Header {
    index: HashMap<String, usize>,
}

impl Header {
    fn parse(row: &[String]) -> Result<Self> {
        let index: HashMap<String, usize> = row
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !index.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            bail!("Missing required columns: {}", missing.join(", "));
        }
        Ok(Self { index })
    }

    /// Trimmed cell for a column; empty cells read as absent.
    fn get<'a>(&self, record: &'a [String], column: &str) -> Option<&'a str> {
        self.index
            .get(column)
            .and_then(|&i| record.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Map CSV records to drafts. The first record is the header.
///
/// A header without the required columns fails the whole file; a bad data row
/// is reported and skipped.
pub fn rows_to_drafts(records: &[Vec<String>]) -> Result<ParsedRows> {
    let Some((header_row, data)) = records.split_first() else {
        bail!("File is empty");
    };
    let header = Header::parse(header_row)?;

    let mut parsed = ParsedRows::default();
    for (i, record) in data.iter().enumerate() {
        let row_number = i + 2;
        match record_to_draft(&header, record) {
            Ok(draft) => parsed.drafts.push((row_number, draft)),
            Err(e) => parsed.errors.push(format!("Row {}: {}", row_number, e)),
        }
    }
    Ok(parsed)
}

fn record_to_draft(header: &Header, record: &[String]) -> Result<RumourDraft> {
    let required = |column: &str| -> Result<String> {
        header
            .get(record, column)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("{} is required", column))
    };

    let position: Position = required("position")?.parse()?;
    let source_kind: SourceKind = required("source_type")?.parse()?;

    let draft = RumourDraft {
        player_name: required("player_name")?,
        position,
        age: parse_optional(header.get(record, "age"), "age")?,
        nationality: header.get(record, "nationality").map(str::to_string),
        current_club: required("current_club")?,
        target_club: required("target_club")?,
        league: required("league")?,
        source_name: required("source_name")?,
        source_kind,
        source_url: header.get(record, "source_url").map(str::to_string),
        fee: parse_optional(header.get(record, "reported_fee"), "reported_fee")?,
        contract_years_left: parse_optional(
            header.get(record, "contract_years_left"),
            "contract_years_left",
        )?,
        claim: header.get(record, "source_claim").map(str::to_string),
        reported_at: header
            .get(record, "reported_at")
            .map(parse_timestamp)
            .transpose()?,
        corroboration: parse_optional(header.get(record, "corroboration"), "corroboration")?
            .unwrap_or(0),
        contradicted: header
            .get(record, "contradicted")
            .map(parse_bool)
            .transpose()?
            .unwrap_or(false),
    };

    if let Err(errors) = draft.validate() {
        bail!("{}", errors.join("; "));
    }
    Ok(draft)
}

fn parse_optional<T: std::str::FromStr>(value: Option<&str>, column: &str) -> Result<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| anyhow!("invalid {} '{}'", column, v))
        })
        .transpose()
}

/// RFC 3339, or a bare date taken as midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("invalid reported_at '{}', expected RFC 3339 or YYYY-MM-DD", value))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => bail!("invalid contradicted '{}', expected true or false", other),
    }
}
