use anyhow::{bail, Context, Result};
use std::fmt;
use std::time::Duration;

/// Integer range matcher used by bucketed calibration (e.g. contract months left).
#[derive(Debug, Clone, PartialEq)]
pub enum RangeOp {
    LessThan(u64),
    LessEqual(u64),
    GreaterThan(u64),
    GreaterEqual(u64),
    Equal(u64),
    Between(u64, u64), // inclusive
}

impl RangeOp {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let num = |v: &str| -> Result<u64> {
            v.trim()
                .parse()
                .with_context(|| format!("'{}' is not a whole number", v.trim()))
        };

        if let Some(val) = s.strip_prefix(">=") {
            Ok(RangeOp::GreaterEqual(num(val)?))
        } else if let Some(val) = s.strip_prefix("<=") {
            Ok(RangeOp::LessEqual(num(val)?))
        } else if let Some(val) = s.strip_prefix('>') {
            Ok(RangeOp::GreaterThan(num(val)?))
        } else if let Some(val) = s.strip_prefix('<') {
            Ok(RangeOp::LessThan(num(val)?))
        } else if let Some((low, high)) = s.split_once('-') {
            if low.trim().is_empty() {
                bail!("Invalid range format: {}", s);
            }
            let (low, high) = (num(low)?, num(high)?);
            if low > high {
                bail!("Range start {} is above range end {}", low, high);
            }
            Ok(RangeOp::Between(low, high))
        } else {
            Ok(RangeOp::Equal(num(s)?))
        }
    }

    pub fn matches(&self, value: u64) -> bool {
        match self {
            RangeOp::LessThan(n) => value < *n,
            RangeOp::LessEqual(n) => value <= *n,
            RangeOp::GreaterThan(n) => value > *n,
            RangeOp::GreaterEqual(n) => value >= *n,
            RangeOp::Equal(n) => value == *n,
            RangeOp::Between(low, high) => value >= *low && value <= *high,
        }
    }
}

/// Score adjustment written as `+N`, `xN`, `+N per <duration>` or `xN per <duration>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Add(f64),
    Multiply(f64),
    AddPerUnit(f64, Duration),
    MultiplyPerUnit(f64, Duration),
}

impl Effect {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some((effect_part, per_part)) = s.split_once(" per ") {
            let duration = humantime::parse_duration(per_part.trim())
                .with_context(|| format!("invalid duration '{}'", per_part.trim()))?;
            if duration.is_zero() {
                bail!("Effect duration must be greater than zero: {}", s);
            }
            match Self::parse_flat(effect_part)? {
                Effect::Add(n) => Ok(Effect::AddPerUnit(n, duration)),
                Effect::Multiply(n) => Ok(Effect::MultiplyPerUnit(n, duration)),
                _ => unreachable!("parse_flat only yields flat effects"),
            }
        } else {
            Self::parse_flat(s)
        }
    }

    fn parse_flat(s: &str) -> Result<Self> {
        let s = s.trim();
        let value = |v: &str| -> Result<f64> {
            let n: f64 = v
                .trim()
                .parse()
                .with_context(|| format!("'{}' is not a number", v.trim()))?;
            if !n.is_finite() {
                bail!("Effect value must be finite: {}", s);
            }
            Ok(n)
        };

        if let Some(val) = s.strip_prefix('+') {
            Ok(Effect::Add(value(val)?))
        } else if let Some(val) = s.strip_prefix('x') {
            Ok(Effect::Multiply(value(val)?))
        } else {
            bail!("Effect must start with + or x: {}", s)
        }
    }

    /// Apply the effect. `units` counts whole periods for per-unit effects and is
    /// ignored by flat effects.
    pub fn apply(&self, score: f64, units: u64) -> f64 {
        match self {
            Effect::Add(n) => score + n,
            Effect::Multiply(n) => score * n,
            Effect::AddPerUnit(n, _) => score + n * units as f64,
            Effect::MultiplyPerUnit(n, _) => score * n.powf(units as f64),
        }
    }

    pub fn unit_duration(&self) -> Option<Duration> {
        match self {
            Effect::AddPerUnit(_, d) | Effect::MultiplyPerUnit(_, d) => Some(*d),
            _ => None,
        }
    }

    /// Whole periods of `elapsed` for per-unit effects; 1 for flat effects.
    pub fn units_in(&self, elapsed: chrono::Duration) -> u64 {
        match self.unit_duration() {
            Some(unit) => {
                let elapsed_ms = elapsed.num_milliseconds().max(0) as u128;
                let unit_ms = unit.as_millis();
                if unit_ms == 0 {
                    0
                } else {
                    (elapsed_ms / unit_ms) as u64
                }
            }
            None => 1,
        }
    }

    /// True when applying the effect to a non-negative score can never raise it.
    pub fn never_increases(&self) -> bool {
        match self {
            Effect::Add(n) | Effect::AddPerUnit(n, _) => *n <= 0.0,
            Effect::Multiply(n) | Effect::MultiplyPerUnit(n, _) => (0.0..=1.0).contains(n),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Add(n) => write!(f, "{:+}", n),
            Effect::Multiply(n) => write!(f, "x{}", n),
            Effect::AddPerUnit(n, d) => write!(f, "{:+} per {}", n, humantime::format_duration(*d)),
            Effect::MultiplyPerUnit(n, d) => {
                write!(f, "x{} per {}", n, humantime::format_duration(*d))
            }
        }
    }
}

/// Outcome of running a value through a bucket list.
#[derive(Debug, Clone)]
pub struct BucketMatch {
    pub value: f64,
    pub matched_range: Option<String>,
    pub matched_effect: Option<String>,
}

/// Apply the effect of the first bucket whose range matches `key`.
/// Buckets that fail to parse are skipped; validation reports them separately.
pub fn apply_first_bucket<T, F1, F2>(
    value: f64,
    key: u64,
    buckets: &[T],
    get_range: F1,
    get_effect: F2,
) -> BucketMatch
where
    F1: Fn(&T) -> &str,
    F2: Fn(&T) -> &str,
{
    for bucket in buckets {
        let range_str = get_range(bucket);
        let effect_str = get_effect(bucket);
        let Ok(range) = RangeOp::parse(range_str) else {
            continue;
        };
        if !range.matches(key) {
            continue;
        }
        if let Ok(effect) = Effect::parse(effect_str) {
            return BucketMatch {
                value: effect.apply(value, 1),
                matched_range: Some(range_str.to_string()),
                matched_effect: Some(effect_str.to_string()),
            };
        }
    }
    BucketMatch {
        value,
        matched_range: None,
        matched_effect: None,
    }
}
