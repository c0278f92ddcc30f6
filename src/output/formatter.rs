use chrono::{DateTime, Duration, Utc};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::leaderboard::{
    LeaderboardEntry, Page, PlayerDetail, SourceDetail, SourceRanking, RECENT_DAYS,
};
use crate::model::{ClubNeeds, Rumour, Score};
use crate::scoring::ScoreBreakdown;
use crate::store::{RecomputeSummary, Settings};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, accounting for Unicode
pub fn truncate_title(title: &str, max_width: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_width {
        title.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Score as shown in tables; "--" marks an unscored rumour
pub fn format_score(score: Option<u8>) -> String {
    match score {
        Some(s) => s.to_string(),
        None => "--".to_string(),
    }
}

/// Fee in millions of euros ("€45M", "€12.5M"), "-" when unreported
pub fn format_fee(fee: Option<f64>) -> String {
    match fee {
        Some(f) => {
            let formatted = format!("€{:.1}M", f);
            formatted.replace(".0M", "M")
        }
        None => "-".to_string(),
    }
}

/// Format a duration into a human-readable age string
/// "2h" for hours, "3d" for days, "1w" for weeks
pub fn format_age(duration: Duration) -> String {
    let hours = duration.num_hours();
    let days = duration.num_days();
    let weeks = days / 7;

    if weeks >= 1 {
        format!("{}w", weeks)
    } else if days >= 1 {
        format!("{}d", days)
    } else if hours >= 1 {
        format!("{}h", hours)
    } else {
        let minutes = duration.num_minutes();
        if minutes >= 1 {
            format!("{}m", minutes)
        } else {
            "now".to_string()
        }
    }
}

fn headline(entry: &LeaderboardEntry<'_>) -> String {
    format!(
        "{} {} -> {}",
        entry.player_name, entry.rumour.position, entry.rumour.to_club
    )
}

/// One table row: rank, overall, C/F/V/M sub-scores, headline, fee, age, source.
fn format_entry(
    entry: &LeaderboardEntry<'_>,
    now: DateTime<Utc>,
    use_colors: bool,
    term_width: Option<usize>,
) -> String {
    let separator = "  ";
    // rank(4) overall(3) subs(15) fee(8) age(4) + separators
    let fixed_width = 4 + 1 + 3 + separator.len() + 15 + separator.len() * 3 + 8 + 4;

    let rank = format!("{:>3}.", entry.rank);
    let overall = format!("{:>3}", format_score(entry.score.map(|s| s.overall)));
    let subs = match entry.score {
        Some(s) => format!(
            "{:>3} {:>3} {:>3} {:>3}",
            s.credibility, s.fit, s.value, s.momentum
        ),
        None => format!("{:>15}", "unscored"),
    };
    let fee = format!("{:>8}", format_fee(entry.rumour.fee));
    let age = format!("{:>4}", format_age(entry.rumour.age(now)));
    let source_len = entry.source_name.chars().count();

    let title = headline(entry);
    let title = match term_width {
        Some(width) if width > fixed_width + source_len + 20 => {
            truncate_title(&title, width - fixed_width - source_len - separator.len())
        }
        Some(_) => truncate_title(&title, 30),
        None => title,
    };

    if use_colors {
        format!(
            "{} {}{}{}{}{}{}{}{}{}{}{}",
            rank.dimmed(),
            overall.bold(),
            separator,
            subs.dimmed(),
            separator,
            title,
            separator,
            fee.green(),
            separator,
            age.dimmed(),
            separator,
            entry.source_name.cyan()
        )
    } else {
        format!(
            "{} {}{}{}{}{}{}{}{}{}{}{}",
            rank, overall, separator, subs, separator, title, separator, fee, separator, age,
            separator, entry.source_name
        )
    }
}

/// Format a leaderboard page as a table.
///
/// Columns: rank, overall, C/F/V/M sub-scores, headline, fee, age, source.
/// The headline is truncated to fit the terminal; pipes get it whole.
pub fn format_leaderboard(page: &Page<'_>, now: DateTime<Utc>, use_colors: bool) -> String {
    format_leaderboard_with_width(page, now, use_colors, get_terminal_width())
}

fn format_leaderboard_with_width(
    page: &Page<'_>,
    now: DateTime<Utc>,
    use_colors: bool,
    term_width: Option<usize>,
) -> String {
    if page.entries.is_empty() {
        return "No rumours found.".to_string();
    }

    let mut lines: Vec<String> = page
        .entries
        .iter()
        .map(|entry| format_entry(entry, now, use_colors, term_width))
        .collect();

    if page.total_pages > 1 {
        lines.push(format!(
            "Page {} of {} ({} rumours)",
            page.page, page.total_pages, page.total
        ));
    }
    lines.join("\n")
}

/// Tab-separated values for scripting, no headers or colors.
/// Columns: rank, id, overall, credibility, fit, value, momentum, player,
/// position, from, to, league, fee, source, reported_at
pub fn format_tsv(entries: &[LeaderboardEntry<'_>]) -> String {
    entries
        .iter()
        .map(|entry| {
            let score = |f: fn(&Score) -> u8| {
                entry.score.map(|s| f(s).to_string()).unwrap_or_default()
            };
            let r = entry.rumour;
            [
                entry.rank.to_string(),
                r.id.to_string(),
                score(|s| s.overall),
                score(|s| s.credibility),
                score(|s| s.fit),
                score(|s| s.value),
                score(|s| s.momentum),
                entry.player_name.clone(),
                r.position.to_string(),
                r.from_club.clone(),
                r.to_club.clone(),
                r.league.clone(),
                r.fee.map(|f| f.to_string()).unwrap_or_default(),
                entry.source_name.clone(),
                r.reported_at.to_rfc3339(),
            ]
            .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line detail view of one rumour with its score breakdown.
pub fn format_rumour_detail(
    rumour: &Rumour,
    player_name: &str,
    source_name: &str,
    score: Option<&Score>,
    breakdown: Option<&ScoreBreakdown>,
    now: DateTime<Utc>,
    use_colors: bool,
) -> String {
    let title = rumour.headline(player_name);
    let mut lines = vec![if use_colors {
        title.bold().to_string()
    } else {
        title
    }];

    lines.push(format!("  Id: {}", rumour.id));
    lines.push(format!("  League: {}", rumour.league));
    lines.push(format!("  Position: {}", rumour.position));
    lines.push(format!("  Fee: {}", format_fee(rumour.fee)));
    if let Some(years) = rumour.contract_years_left {
        lines.push(format!("  Contract left: {:.1}y", years));
    }
    lines.push(format!("  Source: {}", source_name));
    lines.push(format!(
        "  Reported: {} ({} ago)",
        rumour.reported_at.format("%Y-%m-%d %H:%M"),
        format_age(rumour.age(now))
    ));
    lines.push(format!(
        "  Corroboration: {}{}",
        rumour.corroboration,
        if rumour.contradicted { ", contradicted" } else { "" }
    ));
    lines.push(format!("  Status: {}", rumour.status));
    if let Some(average) = rumour.average_rating() {
        lines.push(format!(
            "  Reader rating: {}",
            format_rating(average, rumour.ratings.len())
        ));
    }
    if let Some(claim) = &rumour.claim {
        lines.push(format!("  Claim: {}", claim));
    }
    if let Some(url) = &rumour.source_url {
        let url = if use_colors {
            url.underline().to_string()
        } else {
            url.clone()
        };
        lines.push(format!("  URL: {}", url));
    }

    lines.push(String::new());
    match score {
        Some(s) => {
            let overall = format!("Overall: {}", s.overall);
            lines.push(if use_colors {
                overall.bold().to_string()
            } else {
                overall
            });
            let w = s.weights;
            for (label, value, weight) in [
                ("Credibility", s.credibility, w.credibility),
                ("Fit", s.fit, w.fit),
                ("Value", s.value, w.value),
                ("Momentum", s.momentum, w.momentum),
            ] {
                let description = breakdown
                    .and_then(|b| b.factors.iter().find(|f| f.label == label))
                    .map(|f| format!("  {}", f.description))
                    .unwrap_or_default();
                lines.push(format!(
                    "  {:<12} {:>3}  x{:.2}{}",
                    label, value, weight, description
                ));
            }
            lines.push(format!(
                "  Computed {}",
                s.computed_at.format("%Y-%m-%d %H:%M")
            ));
        }
        None => lines.push("Unscored (run `transfer-rank recompute` for details)".to_string()),
    }

    lines.join("\n")
}

/// Source rankings table: tier, name, kind, rumours, averages, accuracy.
pub fn format_source_rankings(rankings: &[SourceRanking], use_colors: bool) -> String {
    if rankings.is_empty() {
        return "No sources found.".to_string();
    }

    let name_width = rankings
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(32);

    rankings
        .iter()
        .map(|r| {
            let avg = |v: Option<f64>| {
                v.map(|a| format!("{:.1}", a))
                    .unwrap_or_else(|| "-".to_string())
            };
            let accuracy = r
                .accuracy
                .map(|a| format!("{:.0}% ({})", a * 100.0, r.resolved_calls))
                .unwrap_or_else(|| "-".to_string());
            let name = format!("{:<width$}", truncate_title(&r.name, 32), width = name_width);
            let tier = format!("{:<10}", r.tier.as_str());
            let line_rest = format!(
                "{:>4}  {:<10}  {:>3} rumours  avg {:>5}  cred {:>5}  acc {}",
                r.source_id,
                r.kind.as_str(),
                r.rumour_count,
                avg(r.avg_overall),
                avg(r.avg_credibility),
                accuracy
            );
            if use_colors {
                format!("{} {} {}", tier.dimmed(), name.cyan(), line_rest)
            } else {
                format!("{} {} {}", tier, name, line_rest)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Average stars with the rating count, e.g. "3.5/5 (2 ratings)".
pub fn format_rating(average: f64, count: usize) -> String {
    format!(
        "{:.1}/5 ({} rating{})",
        average,
        count,
        if count == 1 { "" } else { "s" }
    )
}

fn bold_if(text: String, use_colors: bool) -> String {
    if use_colors {
        text.bold().to_string()
    } else {
        text
    }
}

fn entry_rows(
    entries: &[LeaderboardEntry<'_>],
    now: DateTime<Utc>,
    use_colors: bool,
    term_width: Option<usize>,
) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No rumours recorded.".to_string()];
    }
    entries
        .iter()
        .map(|entry| format_entry(entry, now, use_colors, term_width))
        .collect()
}

/// A player's profile followed by their rumours.
pub fn format_player_detail(
    detail: &PlayerDetail<'_>,
    now: DateTime<Utc>,
    use_colors: bool,
) -> String {
    format_player_detail_with_width(detail, now, use_colors, get_terminal_width())
}

fn format_player_detail_with_width(
    detail: &PlayerDetail<'_>,
    now: DateTime<Utc>,
    use_colors: bool,
    term_width: Option<usize>,
) -> String {
    let player = detail.player;
    let mut lines = vec![bold_if(player.name.clone(), use_colors)];
    lines.push(format!("  Id: {}", player.id));
    lines.push(format!("  Position: {}", player.position));
    if let Some(age) = player.age {
        lines.push(format!("  Age: {}", age));
    }
    if let Some(nationality) = &player.nationality {
        lines.push(format!("  Nationality: {}", nationality));
    }
    lines.push(format!("  Club: {}", player.current_club));
    lines.push(format!("  Rumours: {}", detail.rumours.len()));
    lines.push(String::new());
    lines.extend(entry_rows(&detail.rumours, now, use_colors, term_width));
    lines.join("\n")
}

/// A source's record followed by its rumours, newest first.
pub fn format_source_detail(
    detail: &SourceDetail<'_>,
    now: DateTime<Utc>,
    use_colors: bool,
) -> String {
    format_source_detail_with_width(detail, now, use_colors, get_terminal_width())
}

fn format_source_detail_with_width(
    detail: &SourceDetail<'_>,
    now: DateTime<Utc>,
    use_colors: bool,
    term_width: Option<usize>,
) -> String {
    let source = detail.source;
    let mut lines = vec![bold_if(source.name.clone(), use_colors)];
    lines.push(format!("  Id: {}", source.id));
    lines.push(format!("  Type: {}", source.kind));
    lines.push(format!("  Reputation: {}", source.tier));
    if let Some(url) = &source.url {
        lines.push(format!("  URL: {}", url));
    }
    let accuracy = source
        .historical_accuracy()
        .map(|a| format!("{:.0}% ({} resolved)", a * 100.0, source.resolved_calls()))
        .unwrap_or_else(|| "-".to_string());
    lines.push(format!("  Accuracy: {}", accuracy));
    lines.push(format!(
        "  Rumours: {} ({} in the last {} days)",
        detail.rumours.len(),
        detail.recent,
        RECENT_DAYS
    ));
    lines.push(String::new());
    lines.extend(entry_rows(&detail.rumours, now, use_colors, term_width));
    lines.join("\n")
}

pub fn format_weights(settings: &Settings) -> String {
    let mut lines: Vec<String> = settings
        .weights
        .as_pairs()
        .iter()
        .map(|(name, weight)| format!("{:<12} {:.2}", name, weight))
        .collect();
    match settings.updated_at {
        Some(ts) => lines.push(format!("Updated {}", ts.format("%Y-%m-%d %H:%M"))),
        None => lines.push("Defaults (never changed)".to_string()),
    }
    lines.join("\n")
}

pub fn format_club_needs(needs: &ClubNeeds) -> String {
    if needs.needs.is_empty() {
        return format!("{}: no needs recorded", needs.club);
    }
    let mut lines = vec![needs.club.clone()];
    lines.extend(
        needs
            .needs
            .iter()
            .map(|(position, need)| format!("  {:<3} {:>3}", position.as_str(), need)),
    );
    lines.join("\n")
}

/// One line for a recompute pass, plus one per unscored rumour.
pub fn format_recompute_summary(summary: &RecomputeSummary) -> String {
    let mut lines = vec![format!(
        "Scored {} rumour{}",
        summary.scored,
        if summary.scored == 1 { "" } else { "s" }
    )];
    for (id, error) in &summary.unscored {
        lines.push(format!("  #{} unscored: {}", id, error));
    }
    lines.join("\n")
}
