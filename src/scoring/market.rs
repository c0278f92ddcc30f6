//! Static market-value heuristic used as the expected-fee reference.
//!
//! Every position has a peak value (in €M), the age at which it peaks, a
//! multiplier for teenage players and the age where decline begins.

use crate::model::Position;

/// Fees never estimate below this (€M).
pub const MIN_EXPECTED_FEE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueCurve {
    pub peak_age: u32,
    pub peak_value: f64,
    pub youth_multiplier: f64,
    pub decline_start: u32,
}

pub fn curve_for(position: Position) -> ValueCurve {
    let (peak_age, peak_value, youth_multiplier, decline_start) = match position {
        Position::GK => (30, 35.0, 0.4, 32),
        Position::CB => (28, 50.0, 0.4, 30),
        Position::LB | Position::RB => (27, 45.0, 0.4, 29),
        Position::DM => (28, 55.0, 0.45, 30),
        Position::CM => (27, 65.0, 0.45, 29),
        Position::AM => (26, 75.0, 0.5, 28),
        Position::LW | Position::RW => (26, 85.0, 0.5, 28),
        Position::ST => (27, 100.0, 0.5, 29),
    };
    ValueCurve {
        peak_age,
        peak_value,
        youth_multiplier,
        decline_start,
    }
}

impl ValueCurve {
    /// Share of peak value a player of `age` commands.
    pub fn age_factor(&self, age: u32) -> f64 {
        let age_f = age as f64;
        if age <= 19 {
            self.youth_multiplier * (1.0 + (age_f - 16.0) * 0.2)
        } else if age <= self.peak_age {
            let span = (self.peak_age as f64 - 20.0).max(1.0);
            self.youth_multiplier + (1.0 - self.youth_multiplier) * ((age_f - 20.0) / span)
        } else if age <= self.decline_start {
            1.0
        } else if age <= 35 {
            1.0 - (age - self.decline_start) as f64 * 0.15
        } else {
            0.2
        }
    }
}

/// Expected fee (€M) for a player at `position`. Unknown age means peak age.
pub fn expected_fee(position: Position, age: Option<u32>) -> f64 {
    let curve = curve_for(position);
    let age = age.unwrap_or(curve.peak_age);
    (curve.peak_value * curve.age_factor(age)).max(MIN_EXPECTED_FEE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_striker() {
        assert_eq!(expected_fee(Position::ST, Some(27)), 100.0);
        assert_eq!(expected_fee(Position::ST, None), 100.0);
    }

    #[test]
    fn test_plateau_before_decline() {
        assert_eq!(expected_fee(Position::LW, Some(28)), 85.0);
    }

    #[test]
    fn test_decline_phase() {
        // 31-year-old striker: two years past decline start -> 70% of peak
        assert!((expected_fee(Position::ST, Some(31)) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_veteran_and_floor() {
        assert!((expected_fee(Position::ST, Some(37)) - 20.0).abs() < 1e-9);
        // 35-year-old keeper: 1 - 3*0.15 = 0.55 -> 19.25
        assert!((expected_fee(Position::GK, Some(35)) - 19.25).abs() < 1e-9);
        // 35-year-old full-back: 0.1 of 45 falls under the floor
        assert_eq!(expected_fee(Position::LB, Some(35)), MIN_EXPECTED_FEE);
    }

    #[test]
    fn test_teenager_curve() {
        // 18-year-old winger: 0.5 * (1 + 2*0.2) = 0.7 of 85
        assert!((expected_fee(Position::RW, Some(18)) - 59.5).abs() < 1e-9);
    }

    #[test]
    fn test_never_below_minimum() {
        for position in Position::ALL {
            for age in 16..=45 {
                assert!(expected_fee(position, Some(age)) >= MIN_EXPECTED_FEE);
            }
        }
    }
}
