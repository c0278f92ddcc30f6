use std::cmp::Ordering;

use crate::model::{ReputationTier, Source, SourceKind};
use crate::store::Database;

/// Aggregate standing of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRanking {
    pub source_id: u64,
    pub name: String,
    pub kind: SourceKind,
    pub tier: ReputationTier,
    pub rumour_count: usize,
    /// Averages over scored rumours only
    pub avg_overall: Option<f64>,
    pub avg_credibility: Option<f64>,
    pub accuracy: Option<f64>,
    pub resolved_calls: u32,
}

fn average(values: &[u8]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64)
}

fn rank_source(db: &Database, source: &Source) -> SourceRanking {
    let scores: Vec<_> = db
        .rumours
        .iter()
        .filter(|r| r.source_id == source.id)
        .map(|r| db.score(r.id))
        .collect();
    let overall: Vec<u8> = scores.iter().flatten().map(|s| s.overall).collect();
    let credibility: Vec<u8> = scores.iter().flatten().map(|s| s.credibility).collect();

    SourceRanking {
        source_id: source.id,
        name: source.name.clone(),
        kind: source.kind,
        tier: source.tier,
        rumour_count: scores.len(),
        avg_overall: average(&overall),
        avg_credibility: average(&credibility),
        accuracy: source.historical_accuracy(),
        resolved_calls: source.resolved_calls(),
    }
}

/// Every source, trusted tiers first, then by average overall score.
pub fn source_rankings(db: &Database) -> Vec<SourceRanking> {
    let mut rankings: Vec<SourceRanking> = db.sources.iter().map(|s| rank_source(db, s)).collect();
    rankings.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| match (a.avg_overall, b.avg_overall) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    rankings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RumourDraft;
    use crate::model::Position;
    use crate::scoring::ScoringConfig;
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-31T23:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn draft(player: &str, source: &str) -> RumourDraft {
        RumourDraft {
            player_name: player.to_string(),
            position: Position::CM,
            age: None,
            nationality: None,
            current_club: "Real Betis".to_string(),
            target_club: "Atletico Madrid".to_string(),
            league: "La Liga".to_string(),
            source_name: source.to_string(),
            source_kind: SourceKind::Outlet,
            source_url: None,
            fee: None,
            contract_years_left: None,
            claim: None,
            reported_at: Some(now()),
            corroboration: 0,
            contradicted: false,
        }
    }

    #[test]
    fn test_rankings_order_by_tier_then_average() {
        let mut db = Database::new();
        let config = ScoringConfig::default();
        db.add_rumour(&draft("Johnny Cardoso", "Marca"), &config, now()).unwrap();
        db.add_rumour(&draft("Isco", "Marca"), &config, now()).unwrap();
        db.add_rumour(&draft("Pablo Fornals", "Relevo"), &config, now()).unwrap();
        db.find_or_create_source("Silent Blog", SourceKind::Aggregator, None);

        let relevo = db.source_by_name("Relevo").unwrap().id;
        db.set_source_reputation(relevo, ReputationTier::Trusted, &config, now())
            .unwrap();

        let rankings = source_rankings(&db);
        assert_eq!(rankings.len(), 3);
        assert_eq!(rankings[0].name, "Relevo");
        assert_eq!(rankings[1].name, "Marca");
        assert_eq!(rankings[1].rumour_count, 2);
        assert!(rankings[1].avg_overall.is_some());
        assert_eq!(rankings[2].name, "Silent Blog");
        assert_eq!(rankings[2].avg_overall, None);
        assert_eq!(rankings[2].accuracy, None);
    }
}
