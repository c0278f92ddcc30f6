pub mod score;
pub mod types;

pub use score::Score;
pub use types::{
    ClubNeeds, Player, Position, ReputationTier, Rumour, RumourStatus, Source, SourceKind,
};
