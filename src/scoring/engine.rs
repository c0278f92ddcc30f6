use chrono::{DateTime, Utc};
use tracing::debug;

use super::config::{CredibilityConfig, FitConfig, MomentumConfig, ScoringConfig, ValueConfig};
use super::error::ScoringError;
use super::factors::{apply_first_bucket, Effect};
use super::market::expected_fee;
use super::validation::validate_scoring;
use crate::model::{ClubNeeds, Player, Rumour, RumourStatus, Score, Source};

/// Everything the engine reads about one rumour. The caller loads the records.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub rumour: &'a Rumour,
    pub source: Option<&'a Source>,
    pub club_needs: Option<&'a ClubNeeds>,
    pub player: Option<&'a Player>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorContribution {
    pub label: String,       // "Credibility", "Fit", ...
    pub description: String, // how the value was reached
    pub value: f64,          // unrounded sub-score
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub factors: Vec<FactorContribution>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub score: Score,
    pub breakdown: ScoreBreakdown,
}

/// Compute all four sub-scores and the weighted overall score for a rumour.
///
/// The configuration is validated first, so malformed weights fail before any
/// factor is evaluated. A missing source is the only missing input that fails;
/// everything else falls back to a documented default. `now` is the evaluation
/// time for momentum decay, so identical inputs always give identical output.
pub fn calculate_score(
    input: &ScoreInput<'_>,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> Result<ScoreResult, ScoringError> {
    validate_scoring(config).map_err(ScoringError::Configuration)?;

    let rumour = input.rumour;
    let source = input.source.ok_or_else(|| {
        ScoringError::InvalidInput(format!(
            "rumour {} references source {} which does not exist",
            rumour.id, rumour.source_id
        ))
    })?;
    if source.id != rumour.source_id {
        return Err(ScoringError::InvalidInput(format!(
            "rumour {} belongs to source {}, got source {}",
            rumour.id, rumour.source_id, source.id
        )));
    }
    if let Some(fee) = rumour.fee {
        if !fee.is_finite() || fee < 0.0 {
            return Err(ScoringError::InvalidInput(format!(
                "rumour {} has an invalid fee {}",
                rumour.id, fee
            )));
        }
    }

    let credibility = credibility_factor(source, &config.credibility);
    let fit = fit_factor(rumour, input.club_needs, &config.fit);
    let value = value_factor(rumour, input.player, &config.value);
    let momentum = momentum_factor(rumour, &config.momentum, now);

    let credibility_score = to_score(credibility.value);
    let fit_score = to_score(fit.value);
    let value_score = to_score(value.value);
    let momentum_score = to_score(momentum.value);

    let weights = config.weights;
    let overall = to_score(
        weights.credibility * credibility_score as f64
            + weights.fit * fit_score as f64
            + weights.value * value_score as f64
            + weights.momentum * momentum_score as f64,
    );

    debug!(
        rumour = rumour.id,
        credibility = credibility_score,
        fit = fit_score,
        value = value_score,
        momentum = momentum_score,
        overall,
        "scored rumour"
    );

    Ok(ScoreResult {
        score: Score {
            rumour_id: rumour.id,
            credibility: credibility_score,
            fit: fit_score,
            value: value_score,
            momentum: momentum_score,
            overall,
            weights,
            computed_at: now,
        },
        breakdown: ScoreBreakdown {
            factors: vec![credibility, fit, value, momentum],
        },
    })
}

fn to_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

/// Tier base blended with historical accuracy.
pub fn credibility_factor(source: &Source, config: &CredibilityConfig) -> FactorContribution {
    let base = config.base_for(source.tier);
    let (accuracy, accuracy_note) = match source.historical_accuracy() {
        Some(acc) => (acc, format!("accuracy {:.0}%", acc * 100.0)),
        None => (
            config.default_accuracy,
            format!("no resolved calls, assumed {:.0}%", config.default_accuracy * 100.0),
        ),
    };
    let value = base * config.tier_share + accuracy * 100.0 * (1.0 - config.tier_share);

    FactorContribution {
        label: "Credibility".to_string(),
        description: format!("{} source (base {}), {}", source.tier, base, accuracy_note),
        value: value.clamp(0.0, 100.0),
    }
}

/// Destination club's need for the rumoured position.
pub fn fit_factor(
    rumour: &Rumour,
    club_needs: Option<&ClubNeeds>,
    config: &FitConfig,
) -> FactorContribution {
    let need = club_needs.and_then(|needs| needs.need_for(rumour.position));
    let (value, description) = match need {
        Some(n) => (
            (n as f64).min(100.0),
            format!("{} need {} at {}", rumour.to_club, n, rumour.position),
        ),
        None => (
            config.default_need,
            format!("no {} need recorded for {}, default", rumour.position, rumour.to_club),
        ),
    };

    FactorContribution {
        label: "Fit".to_string(),
        description,
        value,
    }
}

/// Plausibility of the reported fee against the expected market value.
pub fn value_factor(
    rumour: &Rumour,
    player: Option<&Player>,
    config: &ValueConfig,
) -> FactorContribution {
    let Some(fee) = rumour.fee else {
        return FactorContribution {
            label: "Value".to_string(),
            description: "no fee reported, neutral".to_string(),
            value: config.neutral,
        };
    };

    let age = player.and_then(|p| p.age);
    let mut expected = expected_fee(rumour.position, age);
    let mut contract_note = String::new();
    if let Some(years) = rumour.contract_years_left {
        let months = (years.max(0.0) * 12.0).floor() as u64;
        let adjusted = apply_first_bucket(
            expected,
            months,
            &config.contract,
            |b| &b.months,
            |b| &b.effect,
        );
        if let (Some(range), Some(effect)) = (adjusted.matched_range, adjusted.matched_effect) {
            contract_note = format!(", {} months left matched '{}' -> {}", months, range, effect);
        }
        expected = adjusted.value;
    }

    let value = if expected > 0.0 {
        let deviation = (fee - expected).abs() / expected;
        100.0 - (config.falloff * deviation).min(100.0)
    } else {
        config.neutral
    };

    FactorContribution {
        label: "Value".to_string(),
        description: format!(
            "fee €{:.1}M vs expected €{:.1}M{}",
            fee, expected, contract_note
        ),
        value: value.clamp(0.0, 100.0),
    }
}

/// Corroboration strength, dampened by contradiction and decayed by age.
pub fn momentum_factor(
    rumour: &Rumour,
    config: &MomentumConfig,
    now: DateTime<Utc>,
) -> FactorContribution {
    let corroboration = rumour.corroboration as f64;
    let mut value =
        (config.baseline + config.corroboration_boost * (1.0 + corroboration).ln()).min(100.0);
    let mut notes = vec![format!("{} corroborating", rumour.corroboration)];

    if rumour.contradicted {
        if let Ok(effect) = Effect::parse(&config.contradiction) {
            value = effect.apply(value, 1);
            notes.push(format!("contradicted {}", effect));
        }
    }

    if rumour.status != RumourStatus::Confirmed {
        let grace = humantime::parse_duration(config.grace.trim())
            .ok()
            .and_then(|g| chrono::Duration::from_std(g).ok())
            .unwrap_or_else(chrono::Duration::zero);
        let age = rumour.age(now);
        if age > grace {
            if let Ok(effect) = Effect::parse(&config.decay) {
                let units = effect.units_in(age - grace);
                let factor = effect.apply(1.0, units).max(config.decay_floor);
                if units > 0 {
                    value *= factor;
                    notes.push(format!("decayed x{:.2} ({} periods)", factor, units));
                }
            }
        }
    }

    FactorContribution {
        label: "Momentum".to_string(),
        description: notes.join(", "),
        value: value.clamp(0.0, 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Position, ReputationTier};
    use crate::scoring::ScoringWeights;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-08-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn trusted_source() -> Source {
        let mut source = Source::new(7, "David Ornstein");
        source.tier = ReputationTier::Trusted;
        source.accuracy_override = Some(0.8);
        source
    }

    fn sample_rumour(corroboration: u32, contradicted: bool, age_days: i64) -> Rumour {
        Rumour {
            id: 1,
            player_id: 3,
            position: Position::ST,
            from_club: "Sporting CP".to_string(),
            to_club: "Arsenal".to_string(),
            league: "Premier League".to_string(),
            source_id: 7,
            fee: None,
            contract_years_left: None,
            source_url: None,
            claim: None,
            reported_at: now() - Duration::days(age_days),
            corroboration,
            corroborating_sources: Default::default(),
            contradicted,
            status: RumourStatus::Open,
            ratings: Default::default(),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn arsenal_needs() -> ClubNeeds {
        let mut needs = ClubNeeds::new("Arsenal");
        needs.needs.insert(Position::ST, 70);
        needs
    }

    fn score(rumour: &Rumour, source: &Source, config: &ScoringConfig) -> Score {
        let needs = arsenal_needs();
        let input = ScoreInput {
            rumour,
            source: Some(source),
            club_needs: Some(&needs),
            player: None,
        };
        calculate_score(&input, config, now()).unwrap().score
    }

    #[test]
    fn test_worked_example() {
        let rumour = sample_rumour(3, false, 0);
        let result = score(&rumour, &trusted_source(), &ScoringConfig::default());

        assert_eq!(result.credibility, 83);
        assert_eq!(result.fit, 70);
        assert_eq!(result.value, 50);

        let zero = score(&sample_rumour(0, false, 0), &trusted_source(), &ScoringConfig::default());
        assert!(result.momentum > zero.momentum);
        assert!(result.momentum <= 100);

        let expected =
            (0.4 * 83.0 + 0.3 * 70.0 + 0.2 * 50.0 + 0.1 * result.momentum as f64).round();
        assert_eq!(result.overall as f64, expected);
    }

    #[test]
    fn test_missing_source_is_invalid_input() {
        let rumour = sample_rumour(0, false, 0);
        let input = ScoreInput {
            rumour: &rumour,
            source: None,
            club_needs: None,
            player: None,
        };
        let err = calculate_score(&input, &ScoringConfig::default(), now()).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
    }

    #[test]
    fn test_mismatched_source_is_invalid_input() {
        let rumour = sample_rumour(0, false, 0);
        let other = Source::new(99, "Someone Else");
        let input = ScoreInput {
            rumour: &rumour,
            source: Some(&other),
            club_needs: None,
            player: None,
        };
        let err = calculate_score(&input, &ScoringConfig::default(), now()).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
    }

    #[test]
    fn test_bad_weights_fail_before_source_check() {
        let rumour = sample_rumour(0, false, 0);
        let config = ScoringConfig::default().with_weights(ScoringWeights {
            credibility: 0.4,
            fit: 0.3,
            value: 0.1,
            momentum: 0.1,
        });
        let input = ScoreInput {
            rumour: &rumour,
            source: None,
            club_needs: None,
            player: None,
        };
        let err = calculate_score(&input, &config, now()).unwrap_err();
        assert!(matches!(err, ScoringError::Configuration(_)));
    }

    #[test]
    fn test_negative_fee_is_invalid_input() {
        let mut rumour = sample_rumour(0, false, 0);
        rumour.fee = Some(-3.0);
        let source = trusted_source();
        let input = ScoreInput {
            rumour: &rumour,
            source: Some(&source),
            club_needs: None,
            player: None,
        };
        assert!(calculate_score(&input, &ScoringConfig::default(), now()).is_err());
    }

    #[test]
    fn test_missing_needs_default_fit() {
        let rumour = sample_rumour(0, false, 0);
        let result = fit_factor(&rumour, None, &FitConfig::default());
        assert_eq!(result.value, 50.0);

        let mut rumour = sample_rumour(0, false, 0);
        rumour.position = Position::GK;
        let needs = arsenal_needs();
        assert_eq!(fit_factor(&rumour, Some(&needs), &FitConfig::default()).value, 50.0);
    }

    #[test]
    fn test_fee_at_expected_value_scores_full() {
        let mut rumour = sample_rumour(0, false, 0);
        rumour.fee = Some(100.0); // peak striker
        let result = value_factor(&rumour, None, &ValueConfig::default());
        assert_eq!(result.value, 100.0);
    }

    #[test]
    fn test_value_falls_off_symmetrically() {
        let config = ValueConfig::default();
        let mut over = sample_rumour(0, false, 0);
        over.fee = Some(150.0);
        let mut under = sample_rumour(0, false, 0);
        under.fee = Some(50.0);

        let over_value = value_factor(&over, None, &config).value;
        let under_value = value_factor(&under, None, &config).value;
        assert!((over_value - 70.0).abs() < 1e-9);
        assert!((over_value - under_value).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_fee_bottoms_out_at_zero() {
        let mut rumour = sample_rumour(0, false, 0);
        rumour.fee = Some(900.0);
        assert_eq!(value_factor(&rumour, None, &ValueConfig::default()).value, 0.0);
    }

    #[test]
    fn test_expiring_contract_lowers_expected_fee() {
        let mut rumour = sample_rumour(0, false, 0);
        rumour.fee = Some(30.0);
        rumour.contract_years_left = Some(0.25);
        let result = value_factor(&rumour, None, &ValueConfig::default());
        // expected 100 * 0.3 = 30 -> perfect match
        assert!((result.value - 100.0).abs() < 1e-6);
        assert!(result.description.contains("3 months left"));
    }

    #[test]
    fn test_player_age_feeds_expected_fee() {
        let mut rumour = sample_rumour(0, false, 0);
        rumour.fee = Some(70.0);
        let player = Player {
            id: 3,
            name: "Viktor Gyokeres".to_string(),
            position: Position::ST,
            age: Some(31),
            nationality: None,
            current_club: "Sporting CP".to_string(),
        };
        let result = value_factor(&rumour, Some(&player), &ValueConfig::default());
        assert!((result.value - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_momentum_grows_with_corroboration() {
        let config = MomentumConfig::default();
        let mut previous = -1.0;
        for n in 0..20 {
            let value = momentum_factor(&sample_rumour(n, false, 0), &config, now()).value;
            assert!(value >= previous);
            assert!(value <= 100.0);
            previous = value;
        }
    }

    #[test]
    fn test_contradiction_never_raises_momentum() {
        let config = MomentumConfig::default();
        for n in [0, 1, 5, 50] {
            let clean = momentum_factor(&sample_rumour(n, false, 3), &config, now()).value;
            let contradicted = momentum_factor(&sample_rumour(n, true, 3), &config, now()).value;
            assert!(contradicted <= clean);
        }
    }

    #[test]
    fn test_momentum_decays_after_grace_to_floor() {
        let config = MomentumConfig::default();
        let fresh = momentum_factor(&sample_rumour(2, false, 10), &config, now()).value;
        let stale = momentum_factor(&sample_rumour(2, false, 30), &config, now()).value;
        let ancient = momentum_factor(&sample_rumour(2, false, 400), &config, now()).value;

        assert!(stale < fresh);
        assert!((ancient - fresh * config.decay_floor).abs() < 1e-9);
    }

    #[test]
    fn test_confirmed_rumour_does_not_decay() {
        let config = MomentumConfig::default();
        let mut rumour = sample_rumour(2, false, 60);
        let open = momentum_factor(&rumour, &config, now()).value;
        rumour.status = RumourStatus::Confirmed;
        let confirmed = momentum_factor(&rumour, &config, now()).value;
        assert!(confirmed > open);
    }

    #[test]
    fn test_higher_accuracy_never_lowers_credibility() {
        let config = CredibilityConfig::default();
        let mut source = trusted_source();
        let mut previous = -1.0;
        for step in 0..=10 {
            source.accuracy_override = Some(step as f64 / 10.0);
            let value = credibility_factor(&source, &config).value;
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn test_unresolved_source_uses_default_accuracy() {
        let source = Source::new(7, "New Blog");
        let value = credibility_factor(&source, &CredibilityConfig::default()).value;
        // neutral 55 * 0.6 + 50 * 0.4
        assert!((value - 53.0).abs() < 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let rumour = sample_rumour(4, true, 20);
        let source = trusted_source();
        let first = score(&rumour, &source, &ScoringConfig::default());
        let second = score(&rumour, &source, &ScoringConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_breakdown_lists_four_factors() {
        let rumour = sample_rumour(1, false, 0);
        let source = trusted_source();
        let input = ScoreInput {
            rumour: &rumour,
            source: Some(&source),
            club_needs: None,
            player: None,
        };
        let result = calculate_score(&input, &ScoringConfig::default(), now()).unwrap();
        let labels: Vec<_> = result.breakdown.factors.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Credibility", "Fit", "Value", "Momentum"]);
    }
}
