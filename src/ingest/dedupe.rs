use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::RumourDraft;
use crate::model::RumourStatus;
use crate::scoring::ScoringConfig;
use crate::store::{Database, RecomputeSummary};

/// Reports of the same move closer together than this are one story.
pub const DEDUPE_WINDOW_HOURS: i64 = 48;

/// What happened to an incoming draft.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Inserted as a new rumour with this id
    New(u64),
    /// Counted as corroboration of an existing rumour
    Corroborated(u64),
    /// Dropped; carries the reason
    Duplicate(String),
}

/// An existing rumour that an incoming draft collides with.
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateMatch {
    SameUrl(u64),
    /// `already_counted` is set when the draft's source reported the
    /// rumour first or has corroborated it before
    SameStory {
        rumour_id: u64,
        already_counted: bool,
    },
}

/// Look for an existing rumour the draft repeats.
///
/// A matching source URL always wins. Otherwise an open rumour about the same
/// player moving to the same club, reported within the window, is the same story.
pub fn find_duplicate(
    db: &Database,
    draft: &RumourDraft,
    now: DateTime<Utc>,
) -> Option<DuplicateMatch> {
    if let Some(url) = draft
        .source_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    {
        if let Some(existing) = db
            .rumours
            .iter()
            .find(|r| r.source_url.as_deref().map(str::trim) == Some(url))
        {
            return Some(DuplicateMatch::SameUrl(existing.id));
        }
    }

    let reported_at = draft.reported_at.unwrap_or(now);
    let window = Duration::hours(DEDUPE_WINDOW_HOURS);
    let draft_source = db.source_by_name(&draft.source_name).map(|s| s.id);

    db.rumours
        .iter()
        .filter(|r| r.status == RumourStatus::Open)
        .filter(|r| r.to_club.trim().eq_ignore_ascii_case(draft.target_club.trim()))
        .filter(|r| {
            db.player(r.player_id)
                .is_some_and(|p| p.name.eq_ignore_ascii_case(draft.player_name.trim()))
        })
        .filter(|r| (r.reported_at - reported_at).abs() <= window)
        .min_by_key(|r| (r.reported_at - reported_at).abs())
        .map(|r| DuplicateMatch::SameStory {
            rumour_id: r.id,
            already_counted: draft_source.is_some_and(|id| r.reported_by(id)),
        })
}

/// Insert a draft unless it repeats a known rumour.
///
/// A repeat from a source new to the story corroborates the existing rumour.
/// A repeat from a source already counted for it, or a known URL, is skipped.
pub fn ingest_draft(
    db: &mut Database,
    draft: &RumourDraft,
    calibration: &ScoringConfig,
    now: DateTime<Utc>,
) -> Result<(IngestOutcome, RecomputeSummary)> {
    match find_duplicate(db, draft, now) {
        Some(DuplicateMatch::SameUrl(id)) => {
            debug!(rumour = id, "skipping draft with known source url");
            Ok((
                IngestOutcome::Duplicate(format!("source URL already recorded on rumour #{}", id)),
                RecomputeSummary::default(),
            ))
        }
        Some(DuplicateMatch::SameStory {
            rumour_id,
            already_counted: true,
        }) => {
            debug!(rumour = rumour_id, "skipping repeat from a counted source");
            Ok((
                IngestOutcome::Duplicate(format!(
                    "{} already reported this as rumour #{}",
                    draft.source_name.trim(),
                    rumour_id
                )),
                RecomputeSummary::default(),
            ))
        }
        Some(DuplicateMatch::SameStory {
            rumour_id,
            already_counted: false,
        }) => {
            let source_id = db.find_or_create_source(
                &draft.source_name,
                draft.source_kind,
                draft.source_url.as_deref(),
            );
            let summary = db.add_corroborating_source(rumour_id, source_id, calibration, now)?;
            info!(rumour = rumour_id, source = %draft.source_name, "corroborated existing rumour");
            Ok((IngestOutcome::Corroborated(rumour_id), summary))
        }
        None => {
            let (id, summary) = db.add_rumour(draft, calibration, now)?;
            Ok((IngestOutcome::New(id), summary))
        }
    }
}
