use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::types::Database;
use crate::ingest::RumourDraft;
use crate::model::{
    ClubNeeds, Player, Position, ReputationTier, Rumour, RumourStatus, Source, SourceKind,
};
use crate::scoring::{
    calculate_score, validate_scoring, validate_weights, ScoreInput, ScoringConfig, ScoringError,
    ScoringWeights,
};

/// Result of a recompute pass.
#[derive(Debug, Default)]
pub struct RecomputeSummary {
    pub scored: usize,
    /// Rumours that could not be scored; their stale scores were dropped
    pub unscored: Vec<(u64, ScoringError)>,
}

/// Ratings are whole stars in this range.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Outcome of a reader rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    /// The rater's earlier rating, when this one replaced it
    pub previous: Option<u8>,
    pub average: f64,
    pub count: usize,
}

impl Database {
    /// Calibration from the config file combined with the stored weights.
    pub fn effective_config(&self, calibration: &ScoringConfig) -> ScoringConfig {
        calibration.with_weights(self.settings.weights)
    }

    fn rumour_index(&self, id: u64) -> Result<usize> {
        self.rumours
            .iter()
            .position(|r| r.id == id)
            .with_context(|| format!("No rumour with id {}", id))
    }

    fn source_index(&self, id: u64) -> Result<usize> {
        self.sources
            .iter()
            .position(|s| s.id == id)
            .with_context(|| format!("No source with id {}", id))
    }

    pub fn find_or_create_source(
        &mut self,
        name: &str,
        kind: SourceKind,
        url: Option<&str>,
    ) -> u64 {
        if let Some(existing) = self.source_by_name(name) {
            return existing.id;
        }
        let id = self.allocate_id();
        let mut source = Source::new(id, name.trim());
        source.kind = kind;
        source.url = url.map(str::to_string).filter(|u| !u.trim().is_empty());
        debug!(source = id, name = %source.name, "created source");
        self.sources.push(source);
        id
    }

    /// Players are matched on name and current club, like the submission form does.
    pub fn find_or_create_player(
        &mut self,
        name: &str,
        position: Position,
        age: Option<u32>,
        nationality: Option<&str>,
        current_club: &str,
    ) -> u64 {
        let (name, current_club) = (name.trim(), current_club.trim());
        if let Some(existing) = self.players.iter_mut().find(|p| {
            p.name.eq_ignore_ascii_case(name) && p.current_club.eq_ignore_ascii_case(current_club)
        }) {
            if existing.age.is_none() {
                existing.age = age;
            }
            return existing.id;
        }
        let id = self.allocate_id();
        self.players.push(Player {
            id,
            name: name.to_string(),
            position,
            age,
            nationality: nationality.map(str::to_string),
            current_club: current_club.to_string(),
        });
        id
    }

    /// Insert a new rumour from a draft and score it straight away.
    pub fn add_rumour(
        &mut self,
        draft: &RumourDraft,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<(u64, RecomputeSummary)> {
        if let Err(errors) = draft.validate() {
            bail!("Invalid rumour: {}", errors.join("; "));
        }

        let source_id = self.find_or_create_source(
            &draft.source_name,
            draft.source_kind,
            draft.source_url.as_deref(),
        );
        let player_id = self.find_or_create_player(
            &draft.player_name,
            draft.position,
            draft.age,
            draft.nationality.as_deref(),
            &draft.current_club,
        );

        let id = self.allocate_id();
        self.rumours.push(Rumour {
            id,
            player_id,
            position: draft.position,
            from_club: draft.current_club.trim().to_string(),
            to_club: draft.target_club.trim().to_string(),
            league: draft.league.trim().to_string(),
            source_id,
            fee: draft.fee,
            contract_years_left: draft.contract_years_left,
            source_url: draft.source_url.clone().filter(|u| !u.trim().is_empty()),
            claim: draft.claim.clone(),
            reported_at: draft.reported_at.unwrap_or(now),
            corroboration: draft.corroboration,
            corroborating_sources: BTreeSet::new(),
            contradicted: draft.contradicted,
            status: RumourStatus::Open,
            ratings: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        });
        info!(rumour = id, player = %draft.player_name, to = %draft.target_club, "added rumour");

        let summary = self.recompute_where(calibration, now, |r| r.id == id)?;
        Ok((id, summary))
    }

    /// Register `count` additional sources reporting the same rumour.
    pub fn corroborate(
        &mut self,
        id: u64,
        count: u32,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        let idx = self.rumour_index(id)?;
        let rumour = &mut self.rumours[idx];
        rumour.corroboration = rumour.corroboration.saturating_add(count);
        rumour.updated_at = now;
        Ok(self.recompute_where(calibration, now, |r| r.id == id)?)
    }

    /// Count a report from `source_id` as corroboration, once per source.
    /// The rumour's own source and sources already counted are rejected.
    pub fn add_corroborating_source(
        &mut self,
        id: u64,
        source_id: u64,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        let idx = self.rumour_index(id)?;
        let rumour = &mut self.rumours[idx];
        if rumour.reported_by(source_id) {
            bail!("Source #{} already counts for rumour #{}", source_id, id);
        }
        rumour.corroborating_sources.insert(source_id);
        rumour.corroboration = rumour.corroboration.saturating_add(1);
        rumour.updated_at = now;
        Ok(self.recompute_where(calibration, now, |r| r.id == id)?)
    }

    /// Record a reader's 1-5 star rating. A second rating from the same
    /// rater replaces the first. Ratings never feed the score.
    pub fn rate_rumour(
        &mut self,
        id: u64,
        rater: &str,
        stars: u8,
        now: DateTime<Utc>,
    ) -> Result<RatingUpdate> {
        if !RATING_RANGE.contains(&stars) {
            bail!("Rating must be between 1 and 5 stars, got {}", stars);
        }
        let rater = rater.trim().to_lowercase();
        if rater.is_empty() {
            bail!("Rater name cannot be empty");
        }
        let idx = self.rumour_index(id)?;
        let rumour = &mut self.rumours[idx];
        let previous = rumour.ratings.insert(rater, stars);
        rumour.updated_at = now;
        debug!(rumour = id, stars, replaced = previous.is_some(), "rated rumour");
        Ok(RatingUpdate {
            previous,
            average: rumour.average_rating().unwrap_or(stars as f64),
            count: rumour.ratings.len(),
        })
    }

    pub fn set_contradicted(
        &mut self,
        id: u64,
        contradicted: bool,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        let idx = self.rumour_index(id)?;
        let rumour = &mut self.rumours[idx];
        rumour.contradicted = contradicted;
        rumour.updated_at = now;
        Ok(self.recompute_where(calibration, now, |r| r.id == id)?)
    }

    /// Mark a rumour confirmed, denied or open again. The source's call record
    /// follows, so every rumour from that source is rescored.
    pub fn resolve(
        &mut self,
        id: u64,
        outcome: RumourStatus,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        let idx = self.rumour_index(id)?;
        let previous = self.rumours[idx].status;
        let source_id = self.rumours[idx].source_id;
        self.rumours[idx].status = outcome;
        self.rumours[idx].updated_at = now;

        if previous != outcome {
            if let Some(source) = self.sources.iter_mut().find(|s| s.id == source_id) {
                match previous {
                    RumourStatus::Confirmed => {
                        source.correct_calls = source.correct_calls.saturating_sub(1)
                    }
                    RumourStatus::Denied => {
                        source.incorrect_calls = source.incorrect_calls.saturating_sub(1)
                    }
                    RumourStatus::Open => {}
                }
                match outcome {
                    RumourStatus::Confirmed => {
                        source.correct_calls = source.correct_calls.saturating_add(1)
                    }
                    RumourStatus::Denied => {
                        source.incorrect_calls = source.incorrect_calls.saturating_add(1)
                    }
                    RumourStatus::Open => {}
                }
            }
        }

        Ok(self.recompute_where(calibration, now, |r| r.source_id == source_id)?)
    }

    /// Remove a rumour together with its score.
    pub fn delete_rumour(&mut self, id: u64) -> Result<Rumour> {
        let idx = self.rumour_index(id)?;
        let rumour = self.rumours.remove(idx);
        self.scores.remove(&id);
        info!(rumour = id, "deleted rumour");
        Ok(rumour)
    }

    pub fn set_source_reputation(
        &mut self,
        source_id: u64,
        tier: ReputationTier,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        let idx = self.source_index(source_id)?;
        self.sources[idx].tier = tier;
        Ok(self.recompute_where(calibration, now, |r| r.source_id == source_id)?)
    }

    pub fn set_source_accuracy(
        &mut self,
        source_id: u64,
        accuracy: Option<f64>,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        if let Some(acc) = accuracy {
            if !(0.0..=1.0).contains(&acc) {
                bail!("Accuracy must be between 0.0 and 1.0, got {}", acc);
            }
        }
        let idx = self.source_index(source_id)?;
        self.sources[idx].accuracy_override = accuracy;
        Ok(self.recompute_where(calibration, now, |r| r.source_id == source_id)?)
    }

    /// Set (or clear with `None`) a club's need for a position.
    pub fn set_club_need(
        &mut self,
        club: &str,
        position: Position,
        need: Option<u8>,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        if let Some(n) = need {
            if n > 100 {
                bail!("Need must be between 0 and 100, got {}", n);
            }
        }
        let club = club.trim();
        if club.is_empty() {
            bail!("Club name cannot be empty");
        }

        let idx = match self.club_needs.iter().position(|n| n.matches_club(club)) {
            Some(idx) => idx,
            None => {
                self.club_needs.push(ClubNeeds::new(club));
                self.club_needs.len() - 1
            }
        };
        match need {
            Some(n) => {
                self.club_needs[idx].needs.insert(position, n);
            }
            None => {
                self.club_needs[idx].needs.remove(&position);
            }
        }

        let club = club.to_string();
        Ok(self.recompute_where(calibration, now, |r| {
            r.to_club.trim().eq_ignore_ascii_case(&club)
        })?)
    }

    pub fn clear_club_need(
        &mut self,
        club: &str,
        position: Position,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        self.set_club_need(club, position, None, calibration, now)
    }

    /// Replace the Settings weights and rescore every rumour.
    /// Malformed weights are rejected before anything changes.
    pub fn set_weights(
        &mut self,
        weights: ScoringWeights,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary, ScoringError> {
        validate_weights(&weights).map_err(ScoringError::Configuration)?;
        validate_scoring(&calibration.with_weights(weights)).map_err(ScoringError::Configuration)?;

        self.settings.weights = weights;
        self.settings.updated_at = Some(now);
        info!(
            credibility = weights.credibility,
            fit = weights.fit,
            value = weights.value,
            momentum = weights.momentum,
            "updated weights"
        );
        self.recompute_where(calibration, now, |_| true)
    }

    pub fn recompute_all(
        &mut self,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary, ScoringError> {
        self.recompute_where(calibration, now, |_| true)
    }

    /// Rescore every rumour matching `filter`.
    ///
    /// A bad configuration aborts the pass before any score is touched. A rumour
    /// that fails on its own loses its stale score, so no cached score survives
    /// its inputs going bad.
    fn recompute_where<F>(
        &mut self,
        calibration: &ScoringConfig,
        now: DateTime<Utc>,
        filter: F,
    ) -> Result<RecomputeSummary, ScoringError>
    where
        F: Fn(&Rumour) -> bool,
    {
        let config = self.effective_config(calibration);
        validate_scoring(&config).map_err(ScoringError::Configuration)?;

        let results: Vec<_> = self
            .rumours
            .iter()
            .filter(|r| filter(*r))
            .map(|rumour| {
                let input = ScoreInput {
                    rumour,
                    source: self.source(rumour.source_id),
                    club_needs: self.needs_for(&rumour.to_club),
                    player: self.player(rumour.player_id),
                };
                (rumour.id, calculate_score(&input, &config, now))
            })
            .collect();

        let mut summary = RecomputeSummary::default();
        for (id, result) in results {
            match result {
                Ok(result) => {
                    self.scores.insert(id, result.score);
                    summary.scored += 1;
                }
                Err(e) => {
                    warn!(rumour = id, error = %e, "rumour left unscored");
                    self.scores.remove(&id);
                    summary.unscored.push((id, e));
                }
            }
        }
        debug!(scored = summary.scored, unscored = summary.unscored.len(), "recompute pass");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-07-15T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn draft(player: &str, to: &str, source: &str) -> RumourDraft {
        RumourDraft {
            player_name: player.to_string(),
            position: Position::ST,
            age: Some(26),
            nationality: Some("Sweden".to_string()),
            current_club: "Sporting CP".to_string(),
            target_club: to.to_string(),
            league: "Premier League".to_string(),
            source_name: source.to_string(),
            source_kind: SourceKind::Journalist,
            source_url: None,
            fee: Some(70.0),
            contract_years_left: None,
            claim: None,
            reported_at: Some(now() - Duration::hours(2)),
            corroboration: 0,
            contradicted: false,
        }
    }

    fn seeded() -> (Database, u64) {
        let mut db = Database::new();
        let config = ScoringConfig::default();
        let (id, summary) = db
            .add_rumour(
                &draft("Viktor Gyokeres", "Arsenal", "Fabrizio Romano"),
                &config,
                now(),
            )
            .unwrap();
        assert_eq!(summary.scored, 1);
        (db, id)
    }

    #[test]
    fn test_add_scores_immediately() {
        let (db, id) = seeded();
        let score = db.score(id).unwrap();
        assert_eq!(score.rumour_id, id);
        assert_eq!(score.computed_at, now());
    }

    #[test]
    fn test_add_reuses_source_and_player() {
        let (mut db, _) = seeded();
        let config = ScoringConfig::default();
        db.add_rumour(
            &draft("viktor gyokeres", "Chelsea", "fabrizio romano"),
            &config,
            now(),
        )
        .unwrap();
        assert_eq!(db.sources.len(), 1);
        assert_eq!(db.players.len(), 1);
        assert_eq!(db.rumours.len(), 2);
    }

    #[test]
    fn test_add_rejects_invalid_draft() {
        let mut db = Database::new();
        let mut bad = draft("", "Arsenal", "Sky Sports");
        bad.fee = Some(-1.0);
        let err = db.add_rumour(&bad, &ScoringConfig::default(), now()).unwrap_err();
        assert!(err.to_string().contains("player_name"));
        assert!(db.rumours.is_empty());
    }

    #[test]
    fn test_delete_removes_score() {
        let (mut db, id) = seeded();
        db.delete_rumour(id).unwrap();
        assert!(db.rumour(id).is_none());
        assert!(db.score(id).is_none());
        assert!(db.delete_rumour(id).is_err());
    }

    #[test]
    fn test_reputation_change_rescores() {
        let (mut db, id) = seeded();
        let before = db.score(id).unwrap().credibility;
        let source_id = db.rumour(id).unwrap().source_id;

        let config = ScoringConfig::default();
        db.set_source_reputation(source_id, ReputationTier::Trusted, &config, now())
            .unwrap();
        assert!(db.score(id).unwrap().credibility > before);
    }

    #[test]
    fn test_club_need_change_rescores_destination_only() {
        let (mut db, id) = seeded();
        let config = ScoringConfig::default();
        let (other, _) = db
            .add_rumour(&draft("Benjamin Sesko", "Newcastle", "Sky Sports"), &config, now())
            .unwrap();
        let other_fit = db.score(other).unwrap().fit;

        let summary = db
            .set_club_need("arsenal", Position::ST, Some(95), &ScoringConfig::default(), now())
            .unwrap();
        assert_eq!(summary.scored, 1);
        assert_eq!(db.score(id).unwrap().fit, 95);
        assert_eq!(db.score(other).unwrap().fit, other_fit);

        db.clear_club_need("Arsenal", Position::ST, &ScoringConfig::default(), now())
            .unwrap();
        assert_eq!(db.score(id).unwrap().fit, 50);
    }

    #[test]
    fn test_set_weights_rescores_all() {
        let (mut db, id) = seeded();
        let weights = ScoringWeights {
            credibility: 1.0,
            fit: 0.0,
            value: 0.0,
            momentum: 0.0,
        };
        let summary = db.set_weights(weights, &ScoringConfig::default(), now()).unwrap();
        assert_eq!(summary.scored, 1);
        let score = db.score(id).unwrap();
        assert_eq!(score.overall, score.credibility);
        assert_eq!(score.weights, weights);
        assert_eq!(db.settings.updated_at, Some(now()));
    }

    #[test]
    fn test_malformed_weights_change_nothing() {
        let (mut db, id) = seeded();
        let before = db.score(id).cloned();
        let err = db
            .set_weights(
                ScoringWeights {
                    credibility: 0.4,
                    fit: 0.3,
                    value: 0.1,
                    momentum: 0.1,
                },
                &ScoringConfig::default(),
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, ScoringError::Configuration(_)));
        assert_eq!(db.settings.weights, ScoringWeights::default());
        assert_eq!(db.score(id).cloned(), before);
    }

    #[test]
    fn test_missing_source_leaves_rumour_unscored() {
        let (mut db, id) = seeded();
        db.sources.clear();
        let summary = db.recompute_all(&ScoringConfig::default(), now()).unwrap();
        assert_eq!(summary.scored, 0);
        assert_eq!(summary.unscored.len(), 1);
        assert!(matches!(summary.unscored[0].1, ScoringError::InvalidInput(_)));
        assert!(db.score(id).is_none());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (mut db, id) = seeded();
        db.recompute_all(&ScoringConfig::default(), now()).unwrap();
        let first = db.score(id).cloned();
        db.recompute_all(&ScoringConfig::default(), now()).unwrap();
        assert_eq!(db.score(id).cloned(), first);
    }

    #[test]
    fn test_corroborate_and_contradict() {
        let (mut db, id) = seeded();
        let base = db.score(id).unwrap().momentum;

        db.corroborate(id, 3, &ScoringConfig::default(), now())
            .unwrap();
        let corroborated = db.score(id).unwrap().momentum;
        assert!(corroborated > base);
        assert_eq!(db.rumour(id).unwrap().corroboration, 3);

        db.set_contradicted(id, true, &ScoringConfig::default(), now())
            .unwrap();
        assert!(db.score(id).unwrap().momentum < corroborated);
    }

    #[test]
    fn test_resolve_updates_source_record() {
        let (mut db, id) = seeded();
        let source_id = db.rumour(id).unwrap().source_id;

        db.resolve(id, RumourStatus::Denied, &ScoringConfig::default(), now())
            .unwrap();
        assert_eq!(db.source(source_id).unwrap().incorrect_calls, 1);

        // Flipping the outcome moves the call rather than double counting it
        db.resolve(id, RumourStatus::Confirmed, &ScoringConfig::default(), now())
            .unwrap();
        let source = db.source(source_id).unwrap();
        assert_eq!(source.correct_calls, 1);
        assert_eq!(source.incorrect_calls, 0);
        assert_eq!(source.historical_accuracy(), Some(1.0));
    }

    #[test]
    fn test_accuracy_bounds_checked() {
        let (mut db, id) = seeded();
        let source_id = db.rumour(id).unwrap().source_id;
        assert!(db
            .set_source_accuracy(source_id, Some(1.5), &ScoringConfig::default(), now())
            .is_err());
        db.set_source_accuracy(source_id, Some(0.9), &ScoringConfig::default(), now())
            .unwrap();
        assert_eq!(db.source(source_id).unwrap().accuracy_override, Some(0.9));
    }

    #[test]
    fn test_resolve_saturates_call_counts() {
        let (mut db, id) = seeded();
        let source_id = db.rumour(id).unwrap().source_id;
        db.sources[0].correct_calls = u32::MAX;

        db.resolve(id, RumourStatus::Confirmed, &ScoringConfig::default(), now())
            .unwrap();
        assert_eq!(db.source(source_id).unwrap().correct_calls, u32::MAX);
    }

    #[test]
    fn test_corroborating_source_counted_once() {
        let (mut db, id) = seeded();
        let config = ScoringConfig::default();
        let original = db.rumour(id).unwrap().source_id;
        let sky = db.find_or_create_source("Sky Sports", SourceKind::Outlet, None);

        db.add_corroborating_source(id, sky, &config, now()).unwrap();
        assert!(db.add_corroborating_source(id, sky, &config, now()).is_err());
        assert!(db
            .add_corroborating_source(id, original, &config, now())
            .is_err());
        assert_eq!(db.rumour(id).unwrap().corroboration, 1);
    }

    #[test]
    fn test_rating_replaces_previous_from_same_rater() {
        let (mut db, id) = seeded();
        let before = db.score(id).cloned();

        let first = db.rate_rumour(id, "alice", 4, now()).unwrap();
        assert_eq!(first.previous, None);
        db.rate_rumour(id, "bob", 2, now()).unwrap();
        let update = db.rate_rumour(id, " Alice ", 5, now()).unwrap();
        assert_eq!(update.previous, Some(4));
        assert_eq!(update.count, 2);
        assert_eq!(update.average, 3.5);
        assert_eq!(db.score(id).cloned(), before);
    }

    #[test]
    fn test_rating_bounds() {
        let (mut db, id) = seeded();
        assert!(db.rate_rumour(id, "alice", 0, now()).is_err());
        assert!(db.rate_rumour(id, "alice", 6, now()).is_err());
        assert!(db.rate_rumour(id, "  ", 3, now()).is_err());
        assert!(db.rate_rumour(id + 100, "alice", 3, now()).is_err());
        assert!(db.rumour(id).unwrap().ratings.is_empty());
    }
}
