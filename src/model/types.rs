use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Playing position, as used for club needs and value curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    GK,
    CB,
    LB,
    RB,
    DM,
    CM,
    AM,
    LW,
    RW,
    ST,
}

impl Position {
    pub const ALL: [Position; 10] = [
        Position::GK,
        Position::CB,
        Position::LB,
        Position::RB,
        Position::DM,
        Position::CM,
        Position::AM,
        Position::LW,
        Position::RW,
        Position::ST,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::GK => "GK",
            Position::CB => "CB",
            Position::LB => "LB",
            Position::RB => "RB",
            Position::DM => "DM",
            Position::CM => "CM",
            Position::AM => "AM",
            Position::LW => "LW",
            Position::RW => "RW",
            Position::ST => "ST",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        for position in Position::ALL {
            if position.as_str().eq_ignore_ascii_case(s) {
                return Ok(position);
            }
        }
        bail!(
            "Unknown position '{}' (expected one of GK, CB, LB, RB, DM, CM, AM, LW, RW, ST)",
            s
        )
    }
}

/// Reputation tier assigned to a source by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationTier {
    Trusted,
    #[default]
    Neutral,
    Unreliable,
}

impl ReputationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReputationTier::Trusted => "trusted",
            ReputationTier::Neutral => "neutral",
            ReputationTier::Unreliable => "unreliable",
        }
    }
}

impl fmt::Display for ReputationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReputationTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trusted" => Ok(ReputationTier::Trusted),
            "neutral" => Ok(ReputationTier::Neutral),
            "unreliable" => Ok(ReputationTier::Unreliable),
            other => bail!(
                "Unknown reputation tier '{}' (expected trusted, neutral or unreliable)",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Journalist,
    Club,
    #[default]
    Outlet,
    Aggregator,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Journalist => "journalist",
            SourceKind::Club => "club",
            SourceKind::Outlet => "outlet",
            SourceKind::Aggregator => "aggregator",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "journalist" => Ok(SourceKind::Journalist),
            "club" => Ok(SourceKind::Club),
            "outlet" => Ok(SourceKind::Outlet),
            "aggregator" => Ok(SourceKind::Aggregator),
            other => bail!(
                "Unknown source type '{}' (expected journalist, club, outlet or aggregator)",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tier: ReputationTier,
    #[serde(default)]
    pub correct_calls: u32,
    #[serde(default)]
    pub incorrect_calls: u32,
    /// Manually pinned accuracy; wins over the call record when set.
    #[serde(default)]
    pub accuracy_override: Option<f64>,
}

impl Source {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SourceKind::default(),
            url: None,
            tier: ReputationTier::default(),
            correct_calls: 0,
            incorrect_calls: 0,
            accuracy_override: None,
        }
    }

    /// Historical accuracy in [0, 1], or None when nothing has been resolved yet.
    pub fn historical_accuracy(&self) -> Option<f64> {
        if let Some(pinned) = self.accuracy_override {
            return Some(pinned.clamp(0.0, 1.0));
        }
        let total = self.resolved_calls();
        if total == 0 {
            None
        } else {
            Some(self.correct_calls as f64 / total as f64)
        }
    }

    pub fn resolved_calls(&self) -> u32 {
        self.correct_calls.saturating_add(self.incorrect_calls)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub nationality: Option<String>,
    pub current_club: String,
}

/// Positional need intensities (0-100) for a destination club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubNeeds {
    pub club: String,
    #[serde(default)]
    pub needs: BTreeMap<Position, u8>,
}

impl ClubNeeds {
    pub fn new(club: impl Into<String>) -> Self {
        Self {
            club: club.into(),
            needs: BTreeMap::new(),
        }
    }

    pub fn need_for(&self, position: Position) -> Option<u8> {
        self.needs.get(&position).copied()
    }

    pub fn matches_club(&self, club: &str) -> bool {
        self.club.trim().eq_ignore_ascii_case(club.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RumourStatus {
    #[default]
    Open,
    Confirmed,
    Denied,
}

impl RumourStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, RumourStatus::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RumourStatus::Open => "open",
            RumourStatus::Confirmed => "confirmed",
            RumourStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for RumourStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rumour {
    pub id: u64,
    pub player_id: u64,
    pub position: Position,
    pub from_club: String,
    pub to_club: String,
    pub league: String,
    pub source_id: u64,
    /// Reported fee in millions of euros.
    #[serde(default)]
    pub fee: Option<f64>,
    #[serde(default)]
    pub contract_years_left: Option<f64>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub claim: Option<String>,
    pub reported_at: DateTime<Utc>,
    #[serde(default)]
    pub corroboration: u32,
    /// Sources whose reports have already been counted as corroboration
    #[serde(default)]
    pub corroborating_sources: BTreeSet<u64>,
    #[serde(default)]
    pub contradicted: bool,
    #[serde(default)]
    pub status: RumourStatus,
    /// Reader ratings, 1 to 5 stars, one per rater
    #[serde(default)]
    pub ratings: BTreeMap<String, u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rumour {
    /// Time since the rumour was first reported, never negative.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.reported_at).max(chrono::Duration::zero())
    }

    pub fn headline(&self, player_name: &str) -> String {
        format!(
            "{} ({}) {} -> {}",
            player_name, self.position, self.from_club, self.to_club
        )
    }

    /// Whether a report from this source already counts for the rumour.
    pub fn reported_by(&self, source_id: u64) -> bool {
        self.source_id == source_id || self.corroborating_sources.contains(&source_id)
    }

    pub fn average_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let total: u32 = self.ratings.values().map(|&r| r as u32).sum();
        Some(total as f64 / self.ratings.len() as f64)
    }
}
