use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::ScoringWeights;

/// Derived scores for one rumour. Always recomputed, never edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub rumour_id: u64,
    pub credibility: u8,
    pub fit: u8,
    pub value: u8,
    pub momentum: u8,
    pub overall: u8,
    /// Weights in force when this score was computed
    pub weights: ScoringWeights,
    pub computed_at: DateTime<Utc>,
}

impl Score {
    /// Value for a named sort column, if the column is score-backed.
    pub fn component(&self, name: &str) -> Option<u8> {
        match name {
            "overall" => Some(self.overall),
            "credibility" => Some(self.credibility),
            "fit" => Some(self.fit),
            "value" => Some(self.value),
            "momentum" => Some(self.momentum),
            _ => None,
        }
    }
}
