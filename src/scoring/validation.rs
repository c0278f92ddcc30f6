use super::config::{ScoringConfig, ScoringWeights};
use super::factors::{Effect, RangeOp};

/// Tolerance on the sum of the four weights.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validate Settings weights. Returns all problems at once.
pub fn validate_weights(weights: &ScoringWeights) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (name, weight) in weights.as_pairs() {
        if !weight.is_finite() {
            errors.push(format!("scoring.weights.{}: must be a finite number", name));
        } else if !(0.0..=1.0).contains(&weight) {
            errors.push(format!(
                "scoring.weights.{}: {} is outside 0.0-1.0",
                name, weight
            ));
        }
    }

    let sum = weights.sum();
    if sum.is_finite() && (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        errors.push(format!("scoring.weights: must sum to 1.0 (got {})", sum));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the full scoring configuration (weights and calibration).
/// Returns all problems at once, with dotted paths into the YAML.
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = match validate_weights(&config.weights) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    let in_range = |errors: &mut Vec<String>, path: &str, value: f64, low: f64, high: f64| {
        if !value.is_finite() || value < low || value > high {
            errors.push(format!("{}: {} is outside {}-{}", path, value, low, high));
        }
    };

    // Credibility
    let cred = &config.credibility;
    in_range(&mut errors, "scoring.credibility.trusted", cred.trusted, 0.0, 100.0);
    in_range(&mut errors, "scoring.credibility.neutral", cred.neutral, 0.0, 100.0);
    in_range(&mut errors, "scoring.credibility.unreliable", cred.unreliable, 0.0, 100.0);
    in_range(&mut errors, "scoring.credibility.tier_share", cred.tier_share, 0.0, 1.0);
    in_range(
        &mut errors,
        "scoring.credibility.default_accuracy",
        cred.default_accuracy,
        0.0,
        1.0,
    );

    // Fit
    in_range(&mut errors, "scoring.fit.default_need", config.fit.default_need, 0.0, 100.0);

    // Value
    let value = &config.value;
    in_range(&mut errors, "scoring.value.neutral", value.neutral, 0.0, 100.0);
    if !value.falloff.is_finite() || value.falloff < 0.0 {
        errors.push("scoring.value.falloff: must be non-negative".to_string());
    }
    for (i, bucket) in value.contract.iter().enumerate() {
        if let Err(e) = RangeOp::parse(&bucket.months) {
            errors.push(format!(
                "scoring.value.contract[{}].months: invalid '{}' - {}",
                i, bucket.months, e
            ));
        }
        match Effect::parse(&bucket.effect) {
            Ok(Effect::Multiply(n)) if n >= 0.0 => {}
            Ok(_) => errors.push(format!(
                "scoring.value.contract[{}].effect: '{}' must be a non-negative flat multiplier (xN)",
                i, bucket.effect
            )),
            Err(e) => errors.push(format!(
                "scoring.value.contract[{}].effect: invalid '{}' - {}",
                i, bucket.effect, e
            )),
        }
    }

    // Momentum
    let momentum = &config.momentum;
    if !momentum.baseline.is_finite() || momentum.baseline < 0.0 {
        errors.push("scoring.momentum.baseline: must be non-negative".to_string());
    }
    if !momentum.corroboration_boost.is_finite() || momentum.corroboration_boost < 0.0 {
        errors.push("scoring.momentum.corroboration_boost: must be non-negative".to_string());
    }
    match Effect::parse(&momentum.contradiction) {
        Ok(effect) if effect.unit_duration().is_some() => errors.push(format!(
            "scoring.momentum.contradiction: '{}' must be a flat effect",
            momentum.contradiction
        )),
        Ok(effect) if !effect.never_increases() => errors.push(format!(
            "scoring.momentum.contradiction: '{}' would raise momentum",
            momentum.contradiction
        )),
        Ok(_) => {}
        Err(e) => errors.push(format!(
            "scoring.momentum.contradiction: invalid '{}' - {}",
            momentum.contradiction, e
        )),
    }
    match Effect::parse(&momentum.decay) {
        Ok(Effect::MultiplyPerUnit(n, _)) if (0.0..=1.0).contains(&n) => {}
        Ok(_) => errors.push(format!(
            "scoring.momentum.decay: '{}' must be 'xN per <duration>' with N in 0.0-1.0",
            momentum.decay
        )),
        Err(e) => errors.push(format!(
            "scoring.momentum.decay: invalid '{}' - {}",
            momentum.decay, e
        )),
    }
    if let Err(e) = humantime::parse_duration(momentum.grace.trim()) {
        errors.push(format!(
            "scoring.momentum.grace: invalid '{}' - {}",
            momentum.grace, e
        ));
    }
    in_range(&mut errors, "scoring.momentum.decay_floor", momentum.decay_floor, 0.0, 1.0);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ContractBucket;

    fn weights(c: f64, f: f64, v: f64, m: f64) -> ScoringWeights {
        ScoringWeights {
            credibility: c,
            fit: f,
            value: v,
            momentum: m,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_scoring(&ScoringConfig::default()).is_ok());
    }

    #[test]
    fn test_weights_summing_to_point_nine_rejected() {
        let errors = validate_weights(&weights(0.4, 0.3, 0.1, 0.1)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("must sum to 1.0"));
    }

    #[test]
    fn test_weights_within_tolerance_accepted() {
        assert!(validate_weights(&weights(0.4, 0.3, 0.2, 0.1 + 5e-7)).is_ok());
        assert!(validate_weights(&weights(0.4, 0.3, 0.2, 0.1 + 5e-6)).is_err());
    }

    #[test]
    fn test_negative_weight_reported_by_name() {
        let errors = validate_weights(&weights(1.2, -0.2, 0.0, 0.0)).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("scoring.weights.credibility")));
        assert!(errors.iter().any(|e| e.contains("scoring.weights.fit")));
    }

    #[test]
    fn test_nan_weight_rejected() {
        let errors = validate_weights(&weights(f64::NAN, 0.3, 0.2, 0.1)).unwrap_err();
        assert!(errors[0].contains("finite"));
    }

    #[test]
    fn test_contradiction_must_not_raise_momentum() {
        let mut config = ScoringConfig::default();
        config.momentum.contradiction = "x1.5".to_string();
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.momentum.contradiction"));
    }

    #[test]
    fn test_decay_must_be_per_duration_multiplier() {
        let mut config = ScoringConfig::default();
        config.momentum.decay = "x0.9".to_string();
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.momentum.decay"));
    }

    #[test]
    fn test_invalid_contract_bucket() {
        let mut config = ScoringConfig::default();
        config.value.contract = vec![ContractBucket {
            months: "soon".to_string(),
            effect: "+5".to_string(),
        }];
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("scoring.value.contract[0].months"));
        assert!(errors[1].contains("scoring.value.contract[0].effect"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ScoringConfig::default();
        config.weights = weights(0.5, 0.5, 0.5, 0.5); // sum
        config.credibility.trusted = 140.0; // range
        config.momentum.grace = "fortnight".to_string(); // duration
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
