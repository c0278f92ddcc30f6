pub mod detail;
pub mod filter;
pub mod rankings;

use clap::ValueEnum;
use std::cmp::Ordering;

use crate::model::{Position, Rumour, Score, SourceKind};

pub use detail::{
    find_players, player_detail, source_detail, PlayerDetail, SourceDetail, RECENT_DAYS,
};
pub use filter::{leaderboard, ranked_entries};
pub use rankings::{source_rankings, SourceRanking};

pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    #[default]
    Overall,
    Credibility,
    Fit,
    Value,
    Momentum,
    Fee,
    Date,
}

impl SortKey {
    /// Score column backing this key, if any.
    pub fn score_column(&self) -> Option<&'static str> {
        match self {
            SortKey::Overall => Some("overall"),
            SortKey::Credibility => Some("credibility"),
            SortKey::Fit => Some("fit"),
            SortKey::Value => Some("value"),
            SortKey::Momentum => Some("momentum"),
            SortKey::Fee | SortKey::Date => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Filters, sort and paging for a leaderboard view.
#[derive(Debug, Clone)]
pub struct LeaderboardQuery {
    /// Substring of player name, current club or destination club
    pub search: Option<String>,
    pub league: Option<String>,
    pub position: Option<Position>,
    pub source_kind: Option<SourceKind>,
    pub min_fee: Option<f64>,
    pub max_fee: Option<f64>,
    /// Also show confirmed and denied rumours
    pub include_resolved: bool,
    pub sort: SortKey,
    pub order: SortOrder,
    pub page: usize,
    pub per_page: usize,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            search: None,
            league: None,
            position: None,
            source_kind: None,
            min_fee: None,
            max_fee: None,
            include_resolved: false,
            sort: SortKey::default(),
            order: SortOrder::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// A rumour as shown on the leaderboard.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry<'a> {
    /// 1-based position in the full filtered ranking
    pub rank: usize,
    pub rumour: &'a Rumour,
    /// None when the rumour is unscored
    pub score: Option<&'a Score>,
    pub player_name: String,
    pub source_name: String,
}

#[derive(Debug)]
pub struct Page<'a> {
    pub entries: Vec<LeaderboardEntry<'a>>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}
