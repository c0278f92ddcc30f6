pub mod dedupe;

use chrono::{DateTime, Utc};

use crate::model::{Position, SourceKind};

pub use dedupe::{find_duplicate, ingest_draft, DuplicateMatch, IngestOutcome, DEDUPE_WINDOW_HOURS};

/// A rumour as submitted, before players and sources are resolved to ids.
#[derive(Debug, Clone, PartialEq)]
pub struct RumourDraft {
    pub player_name: String,
    pub position: Position,
    pub age: Option<u32>,
    pub nationality: Option<String>,
    pub current_club: String,
    pub target_club: String,
    pub league: String,
    pub source_name: String,
    pub source_kind: SourceKind,
    pub source_url: Option<String>,
    /// Reported fee in millions of euros
    pub fee: Option<f64>,
    pub contract_years_left: Option<f64>,
    pub claim: Option<String>,
    /// Defaults to the time of insertion
    pub reported_at: Option<DateTime<Utc>>,
    pub corroboration: u32,
    pub contradicted: bool,
}

pub const MIN_PLAYER_AGE: u32 = 16;
pub const MAX_PLAYER_AGE: u32 = 45;

impl RumourDraft {
    /// Check the draft, collecting every problem by field name.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("player_name", &self.player_name),
            ("current_club", &self.current_club),
            ("target_club", &self.target_club),
            ("league", &self.league),
            ("source_name", &self.source_name),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{} is required", field));
            }
        }

        if !self.target_club.trim().is_empty()
            && self.current_club.trim().eq_ignore_ascii_case(self.target_club.trim())
        {
            errors.push("target_club must differ from current_club".to_string());
        }

        if let Some(age) = self.age {
            if !(MIN_PLAYER_AGE..=MAX_PLAYER_AGE).contains(&age) {
                errors.push(format!(
                    "age must be between {} and {}, got {}",
                    MIN_PLAYER_AGE, MAX_PLAYER_AGE, age
                ));
            }
        }

        if let Some(fee) = self.fee {
            if !fee.is_finite() || fee < 0.0 {
                errors.push(format!("reported_fee must be a non-negative number, got {}", fee));
            }
        }

        if let Some(years) = self.contract_years_left {
            if !years.is_finite() || years < 0.0 {
                errors.push(format!(
                    "contract_years_left must be a non-negative number, got {}",
                    years
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
