pub mod config;
pub mod engine;
pub mod error;
pub mod factors;
pub mod market;
pub mod validation;

pub use config::*;
pub use engine::{calculate_score, FactorContribution, ScoreBreakdown, ScoreInput, ScoreResult};
pub use error::ScoringError;
pub use factors::{Effect, RangeOp};
pub use validation::{validate_scoring, validate_weights};
