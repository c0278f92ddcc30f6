use std::cmp::Ordering;

use super::{LeaderboardEntry, LeaderboardQuery, Page, SortKey, SortOrder, MAX_PER_PAGE};
use crate::model::Rumour;
use crate::store::Database;

/// Whether a rumour passes every filter in the query.
pub fn matches(db: &Database, rumour: &Rumour, query: &LeaderboardQuery) -> bool {
    if !query.include_resolved && rumour.status.is_resolved() {
        return false;
    }

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let term = term.to_lowercase();
        let player = db.player_name(rumour).to_lowercase();
        if !player.contains(&term)
            && !rumour.from_club.to_lowercase().contains(&term)
            && !rumour.to_club.to_lowercase().contains(&term)
        {
            return false;
        }
    }

    if let Some(league) = &query.league {
        if !rumour.league.trim().eq_ignore_ascii_case(league.trim()) {
            return false;
        }
    }

    if query.position.is_some_and(|p| p != rumour.position) {
        return false;
    }

    if let Some(kind) = query.source_kind {
        if db.source(rumour.source_id).map(|s| s.kind) != Some(kind) {
            return false;
        }
    }

    // A fee bound excludes rumours without a reported fee
    if let Some(min) = query.min_fee {
        if !rumour.fee.is_some_and(|f| f >= min) {
            return false;
        }
    }
    if let Some(max) = query.max_fee {
        if !rumour.fee.is_some_and(|f| f <= max) {
            return false;
        }
    }

    true
}

/// Compare two entries for the requested sort. Missing values (unscored
/// rumours, absent fees) go last in either direction; ties fall back to the
/// older report, then the lower id.
pub fn compare_entries(
    a: &LeaderboardEntry<'_>,
    b: &LeaderboardEntry<'_>,
    key: SortKey,
    order: SortOrder,
) -> Ordering {
    let primary = match key {
        SortKey::Fee => {
            compare_present(a.rumour.fee, b.rumour.fee, order, |x, y| x.total_cmp(y))
        }
        SortKey::Date => order.apply(a.rumour.reported_at.cmp(&b.rumour.reported_at)),
        _ => {
            let column = key.score_column().unwrap_or("overall");
            compare_present(
                a.score.and_then(|s| s.component(column)),
                b.score.and_then(|s| s.component(column)),
                order,
                |x, y| x.cmp(y),
            )
        }
    };

    primary
        .then_with(|| a.rumour.reported_at.cmp(&b.rumour.reported_at))
        .then_with(|| a.rumour.id.cmp(&b.rumour.id))
}

fn compare_present<T>(
    a: Option<T>,
    b: Option<T>,
    order: SortOrder,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => order.apply(cmp(&x, &y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter, sort and rank every rumour in the database.
pub fn ranked_entries<'a>(db: &'a Database, query: &LeaderboardQuery) -> Vec<LeaderboardEntry<'a>> {
    rank_where(db, |r| matches(db, r, query), query.sort, query.order)
}

/// Rank the rumours `keep` accepts, numbering them from 1.
pub(super) fn rank_where<'a>(
    db: &'a Database,
    keep: impl Fn(&Rumour) -> bool,
    key: SortKey,
    order: SortOrder,
) -> Vec<LeaderboardEntry<'a>> {
    let mut entries: Vec<LeaderboardEntry<'a>> = db
        .rumours
        .iter()
        .filter(|r| keep(*r))
        .map(|rumour| LeaderboardEntry {
            rank: 0,
            rumour,
            score: db.score(rumour.id),
            player_name: db.player_name(rumour),
            source_name: db.source_name(rumour),
        })
        .collect();

    entries.sort_by(|a, b| compare_entries(a, b, key, order));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

/// One page of the leaderboard. Pages are 1-based; `per_page` is clamped to
/// 1..=MAX_PER_PAGE. A page past the end is empty rather than an error.
pub fn leaderboard<'a>(db: &'a Database, query: &LeaderboardQuery) -> Page<'a> {
    let per_page = query.per_page.clamp(1, MAX_PER_PAGE);
    let page = query.page.max(1);

    let entries = ranked_entries(db, query);
    let total = entries.len();
    let total_pages = total.div_ceil(per_page).max(1);

    let entries = entries
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    Page {
        entries,
        page,
        per_page,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RumourDraft;
    use crate::model::{Position, RumourStatus, SourceKind};
    use crate::scoring::ScoringConfig;
    use chrono::{DateTime, Duration, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-08-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn draft(
        player: &str,
        position: Position,
        to: &str,
        league: &str,
        fee: Option<f64>,
        hours_ago: i64,
    ) -> RumourDraft {
        RumourDraft {
            player_name: player.to_string(),
            position,
            age: Some(24),
            nationality: None,
            current_club: "Somewhere FC".to_string(),
            target_club: to.to_string(),
            league: league.to_string(),
            source_name: "Gianluca Di Marzio".to_string(),
            source_kind: SourceKind::Journalist,
            source_url: None,
            fee,
            contract_years_left: None,
            claim: None,
            reported_at: Some(now() - Duration::hours(hours_ago)),
            corroboration: 0,
            contradicted: false,
        }
    }

    fn seeded() -> Database {
        let mut db = Database::new();
        let config = ScoringConfig::default();
        for d in [
            draft("Ademola Lookman", Position::LW, "Inter", "Serie A", Some(45.0), 5),
            draft("Jonathan David", Position::ST, "Juventus", "Serie A", None, 10),
            draft("Jadon Sancho", Position::RW, "Juventus", "Serie A", Some(20.0), 20),
            draft("Nico Williams", Position::LW, "Barcelona", "La Liga", Some(58.0), 30),
        ] {
            db.add_rumour(&d, &config, now()).unwrap();
        }
        db
    }

    #[test]
    fn test_default_sort_is_overall_desc() {
        let db = seeded();
        let entries = ranked_entries(&db, &LeaderboardQuery::default());
        assert_eq!(entries.len(), 4);
        let overall: Vec<u8> = entries.iter().map(|e| e.score.unwrap().overall).collect();
        let mut sorted = overall.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(overall, sorted);
        assert_eq!(entries[0].rank, 1);
    }

    #[test]
    fn test_filters() {
        let db = seeded();
        let query = LeaderboardQuery {
            league: Some("serie a".to_string()),
            ..Default::default()
        };
        assert_eq!(ranked_entries(&db, &query).len(), 3);

        let query = LeaderboardQuery {
            search: Some("juve".to_string()),
            ..Default::default()
        };
        assert_eq!(ranked_entries(&db, &query).len(), 2);

        let query = LeaderboardQuery {
            position: Some(Position::LW),
            min_fee: Some(50.0),
            ..Default::default()
        };
        let entries = ranked_entries(&db, &query);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].player_name, "Nico Williams");

        let query = LeaderboardQuery {
            source_kind: Some(SourceKind::Club),
            ..Default::default()
        };
        assert!(ranked_entries(&db, &query).is_empty());
    }

    #[test]
    fn test_max_fee_excludes_unknown_fee() {
        let db = seeded();
        let query = LeaderboardQuery {
            max_fee: Some(50.0),
            ..Default::default()
        };
        let names: Vec<String> = ranked_entries(&db, &query)
            .into_iter()
            .map(|e| e.player_name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(!names.contains(&"Jonathan David".to_string()));
    }

    #[test]
    fn test_fee_sort_puts_missing_last_both_ways() {
        let db = seeded();
        for order in [SortOrder::Desc, SortOrder::Asc] {
            let query = LeaderboardQuery {
                sort: SortKey::Fee,
                order,
                ..Default::default()
            };
            let entries = ranked_entries(&db, &query);
            assert_eq!(entries.last().unwrap().player_name, "Jonathan David");
        }
        let query = LeaderboardQuery {
            sort: SortKey::Fee,
            order: SortOrder::Asc,
            ..Default::default()
        };
        assert_eq!(ranked_entries(&db, &query)[0].rumour.fee, Some(20.0));
    }

    #[test]
    fn test_date_sort() {
        let db = seeded();
        let query = LeaderboardQuery {
            sort: SortKey::Date,
            ..Default::default()
        };
        assert_eq!(ranked_entries(&db, &query)[0].player_name, "Ademola Lookman");
    }

    #[test]
    fn test_unscored_sorts_last() {
        let mut db = seeded();
        let id = db.rumours[0].id;
        db.scores.remove(&id);
        let entries = ranked_entries(&db, &LeaderboardQuery::default());
        assert_eq!(entries.last().unwrap().rumour.id, id);
        assert!(entries.last().unwrap().score.is_none());
    }

    #[test]
    fn test_resolved_hidden_by_default() {
        let mut db = seeded();
        let id = db.rumours[0].id;
        db.resolve(id, RumourStatus::Confirmed, &ScoringConfig::default(), now())
            .unwrap();
        assert_eq!(ranked_entries(&db, &LeaderboardQuery::default()).len(), 3);

        let query = LeaderboardQuery {
            include_resolved: true,
            ..Default::default()
        };
        assert_eq!(ranked_entries(&db, &query).len(), 4);
    }

    #[test]
    fn test_pagination() {
        let db = seeded();
        let query = LeaderboardQuery {
            per_page: 3,
            page: 2,
            ..Default::default()
        };
        let page = leaderboard(&db, &query);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].rank, 4);

        let query = LeaderboardQuery {
            per_page: 500,
            page: 9,
            ..Default::default()
        };
        let page = leaderboard(&db, &query);
        assert_eq!(page.per_page, MAX_PER_PAGE);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn test_page_far_past_end_is_empty() {
        let db = seeded();
        let query = LeaderboardQuery {
            page: usize::MAX,
            ..Default::default()
        };
        let page = leaderboard(&db, &query);
        assert_eq!(page.page, usize::MAX);
        assert_eq!(page.total, 4);
        assert!(page.entries.is_empty());
    }
}
