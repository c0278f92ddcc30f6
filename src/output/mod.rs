pub mod formatter;

pub use formatter::{
    format_age, format_club_needs, format_fee, format_leaderboard, format_player_detail,
    format_rating, format_recompute_summary, format_rumour_detail, format_score,
    format_source_detail, format_source_rankings, format_tsv, format_weights, should_use_colors,
    truncate_title,
};
