use serde::{Deserialize, Serialize};

use crate::model::ReputationTier;

/// Settings weights for the overall score. Must sum to 1.0.
///
/// Stored in the database and edited by an administrator; every scoring call
/// receives the current value explicitly.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringWeights {
    pub credibility: f64,
    pub fit: f64,
    pub value: f64,
    pub momentum: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            credibility: 0.4,
            fit: 0.3,
            value: 0.2,
            momentum: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.credibility + self.fit + self.value + self.momentum
    }

    pub fn as_pairs(&self) -> [(&'static str, f64); 4] {
        [
            ("credibility", self.credibility),
            ("fit", self.fit),
            ("value", self.value),
            ("momentum", self.momentum),
        ]
    }
}

/// Full scoring configuration: weights plus the calibration of each factor.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   weights: { credibility: 0.4, fit: 0.3, value: 0.2, momentum: 0.1 }
///   credibility:
///     trusted: 85
///     neutral: 55
///     unreliable: 25
///   momentum:
///     contradiction: "x0.5"
///     decay: "x0.95 per 1d"
///     grace: "14d"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,

    #[serde(default)]
    pub credibility: CredibilityConfig,

    #[serde(default)]
    pub fit: FitConfig,

    #[serde(default)]
    pub value: ValueConfig,

    #[serde(default)]
    pub momentum: MomentumConfig,
}

impl ScoringConfig {
    /// Same calibration, different weights.
    pub fn with_weights(&self, weights: ScoringWeights) -> Self {
        Self {
            weights,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CredibilityConfig {
    pub trusted: f64,
    pub neutral: f64,
    pub unreliable: f64,
    /// Share of the tier base in the blend; the rest comes from historical accuracy
    pub tier_share: f64,
    /// Accuracy assumed for sources with no resolved calls
    pub default_accuracy: f64,
}

impl Default for CredibilityConfig {
    fn default() -> Self {
        Self {
            trusted: 85.0,
            neutral: 55.0,
            unreliable: 25.0,
            tier_share: 0.6,
            default_accuracy: 0.5,
        }
    }
}

impl CredibilityConfig {
    pub fn base_for(&self, tier: ReputationTier) -> f64 {
        match tier {
            ReputationTier::Trusted => self.trusted,
            ReputationTier::Neutral => self.neutral,
            ReputationTier::Unreliable => self.unreliable,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct FitConfig {
    /// Used when the club has no need recorded for the position
    pub default_need: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self { default_need: 50.0 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ValueConfig {
    /// Score for rumours without a reported fee
    pub neutral: f64,
    /// Points lost per 1.0 of relative deviation from the expected fee
    pub falloff: f64,
    /// Contract adjustments keyed by whole months left on the deal
    pub contract: Vec<ContractBucket>,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            neutral: 50.0,
            falloff: 60.0,
            contract: vec![
                ContractBucket {
                    months: "<6".to_string(),
                    effect: "x0.3".to_string(),
                },
                ContractBucket {
                    months: "6-11".to_string(),
                    effect: "x0.6".to_string(),
                },
                ContractBucket {
                    months: ">36".to_string(),
                    effect: "x1.2".to_string(),
                },
            ],
        }
    }
}

/// Contract bucket: months-left range mapped to an effect on the expected fee.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ContractBucket {
    pub months: String,
    pub effect: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct MomentumConfig {
    /// Momentum of an uncorroborated, fresh rumour
    pub baseline: f64,
    /// Points per natural-log unit of (1 + corroboration)
    pub corroboration_boost: f64,
    /// Applied when the rumour has been contradicted
    pub contradiction: String,
    /// Applied per elapsed period once the grace period is over
    pub decay: String,
    pub grace: String,
    /// Lowest multiplier decay can reach
    pub decay_floor: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            baseline: 30.0,
            corroboration_boost: 20.0,
            contradiction: "x0.5".to_string(),
            decay: "x0.95 per 1d".to_string(),
            grace: "14d".to_string(),
            decay_floor: 0.3,
        }
    }
}
