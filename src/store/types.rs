use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{ClubNeeds, Player, Rumour, Score, Source};
use crate::scoring::ScoringWeights;

pub const DATABASE_VERSION: u32 = 1;

/// Administrator-controlled Settings, persisted with the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub weights: ScoringWeights,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            updated_at: None,
        }
    }
}

/// The whole rumour database as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub version: u32,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub club_needs: Vec<ClubNeeds>,
    #[serde(default)]
    pub rumours: Vec<Rumour>,
    /// Score cache keyed by rumour id
    #[serde(default)]
    pub scores: BTreeMap<u64, Score>,
    #[serde(default)]
    pub next_id: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            version: DATABASE_VERSION,
            settings: Settings::default(),
            sources: Vec::new(),
            players: Vec::new(),
            club_needs: Vec::new(),
            rumours: Vec::new(),
            scores: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> u64 {
        let floor = self
            .sources
            .iter()
            .map(|s| s.id)
            .chain(self.players.iter().map(|p| p.id))
            .chain(self.rumours.iter().map(|r| r.id))
            .max()
            .unwrap_or(0)
            + 1;
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }

    pub fn source(&self, id: u64) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn source_by_name(&self, name: &str) -> Option<&Source> {
        let name = name.trim();
        self.sources.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn player(&self, id: u64) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn rumour(&self, id: u64) -> Option<&Rumour> {
        self.rumours.iter().find(|r| r.id == id)
    }

    pub fn needs_for(&self, club: &str) -> Option<&ClubNeeds> {
        self.club_needs.iter().find(|n| n.matches_club(club))
    }

    pub fn score(&self, rumour_id: u64) -> Option<&Score> {
        self.scores.get(&rumour_id)
    }

    /// Name of the rumoured player, or a placeholder when the record is gone.
    pub fn player_name(&self, rumour: &Rumour) -> String {
        self.player(rumour.player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("player #{}", rumour.player_id))
    }

    pub fn source_name(&self, rumour: &Rumour) -> String {
        self.source(rumour.source_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("source #{}", rumour.source_id))
    }
}
