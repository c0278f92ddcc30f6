use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// A required reference (the source) is missing or does not belong to the rumour
    InvalidInput(String),
    /// Weights or calibration are malformed; carries every problem found
    Configuration(Vec<String>),
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringError::InvalidInput(msg) => write!(f, "Invalid scoring input: {}", msg),
            ScoringError::Configuration(errors) => {
                write!(f, "Invalid scoring configuration: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ScoringError {}
