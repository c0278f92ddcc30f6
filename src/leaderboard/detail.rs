use chrono::{DateTime, Duration, Utc};

use super::filter::rank_where;
use super::{LeaderboardEntry, SortKey, SortOrder};
use crate::model::{Player, Source};
use crate::store::Database;

/// Window for a source's recent activity count.
pub const RECENT_DAYS: i64 = 30;

/// Every rumour about one player, best overall score first.
#[derive(Debug)]
pub struct PlayerDetail<'a> {
    pub player: &'a Player,
    pub rumours: Vec<LeaderboardEntry<'a>>,
}

/// One source with its rumours, newest report first.
#[derive(Debug)]
pub struct SourceDetail<'a> {
    pub source: &'a Source,
    pub rumours: Vec<LeaderboardEntry<'a>>,
    /// Rumours reported within the last RECENT_DAYS
    pub recent: usize,
}

/// Players matching a numeric id or a case-insensitive name. The same name
/// can belong to several players at different clubs.
pub fn find_players<'a>(db: &'a Database, key: &str) -> Vec<&'a Player> {
    if let Some(player) = key.trim().parse::<u64>().ok().and_then(|id| db.player(id)) {
        return vec![player];
    }
    let key = key.trim();
    db.players
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(key))
        .collect()
}

pub fn player_detail<'a>(db: &'a Database, player: &'a Player) -> PlayerDetail<'a> {
    PlayerDetail {
        player,
        rumours: rank_where(
            db,
            |r| r.player_id == player.id,
            SortKey::Overall,
            SortOrder::Desc,
        ),
    }
}

pub fn source_detail<'a>(
    db: &'a Database,
    source: &'a Source,
    now: DateTime<Utc>,
) -> SourceDetail<'a> {
    let rumours = rank_where(db, |r| r.source_id == source.id, SortKey::Date, SortOrder::Desc);
    let cutoff = now - Duration::days(RECENT_DAYS);
    let recent = rumours
        .iter()
        .filter(|e| e.rumour.reported_at >= cutoff)
        .count();
    SourceDetail {
        source,
        rumours,
        recent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RumourDraft;
    use crate::model::{Position, RumourStatus, SourceKind};
    use crate::scoring::ScoringConfig;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn draft(player: &str, from: &str, to: &str, source: &str, days_ago: i64) -> RumourDraft {
        RumourDraft {
            player_name: player.to_string(),
            position: Position::AM,
            age: Some(22),
            nationality: None,
            current_club: from.to_string(),
            target_club: to.to_string(),
            league: "Bundesliga".to_string(),
            source_name: source.to_string(),
            source_kind: SourceKind::Journalist,
            source_url: None,
            fee: Some(40.0),
            contract_years_left: None,
            claim: None,
            reported_at: Some(now() - Duration::days(days_ago)),
            corroboration: 0,
            contradicted: false,
        }
    }

    fn seeded() -> Database {
        let mut db = Database::new();
        let config = ScoringConfig::default();
        for d in [
            draft("Xavi Simons", "RB Leipzig", "Bayern Munich", "Florian Plettenberg", 2),
            draft("Xavi Simons", "RB Leipzig", "Chelsea", "Florian Plettenberg", 40),
            draft("Xavi Simons", "RB Leipzig", "Tottenham", "Sky Sports", 1),
            draft("Xavi Simons", "PSV", "Arsenal", "Sky Sports", 400),
        ] {
            db.add_rumour(&d, &config, now()).unwrap();
        }
        db
    }

    #[test]
    fn test_find_players_by_id_or_name() {
        let db = seeded();
        let players = find_players(&db, "xavi simons");
        assert_eq!(players.len(), 2);

        let id = players[0].id;
        let by_id = find_players(&db, &id.to_string());
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, id);
        assert!(find_players(&db, "Florian Wirtz").is_empty());
    }

    #[test]
    fn test_player_detail_sorted_by_overall() {
        let mut db = seeded();
        let config = ScoringConfig::default();
        db.set_club_need("Chelsea", Position::AM, Some(100), &config, now())
            .unwrap();
        let player = find_players(&db, "Xavi Simons")
            .into_iter()
            .find(|p| p.current_club == "RB Leipzig")
            .unwrap();

        let detail = player_detail(&db, player);
        assert_eq!(detail.rumours.len(), 3);
        assert_eq!(detail.rumours[0].rumour.to_club, "Chelsea");
        let overall: Vec<u8> = detail
            .rumours
            .iter()
            .map(|e| e.score.unwrap().overall)
            .collect();
        assert!(overall.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_player_detail_includes_resolved() {
        let mut db = seeded();
        let id = db.rumours[0].id;
        db.resolve(id, RumourStatus::Denied, &ScoringConfig::default(), now())
            .unwrap();
        let player = db.player(db.rumours[0].player_id).unwrap();
        assert_eq!(player_detail(&db, player).rumours.len(), 3);
    }

    #[test]
    fn test_source_detail_counts_recent() {
        let db = seeded();
        let sky = db.source_by_name("Sky Sports").unwrap();
        let detail = source_detail(&db, sky, now());
        assert_eq!(detail.rumours.len(), 2);
        assert_eq!(detail.recent, 1);
        assert_eq!(detail.rumours[0].rumour.to_club, "Tottenham");

        let plettenberg = db.source_by_name("florian plettenberg").unwrap();
        let detail = source_detail(&db, plettenberg, now());
        assert_eq!(detail.recent, 1);
        assert_eq!(detail.rumours[1].rumour.to_club, "Chelsea");
    }
}
