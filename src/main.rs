use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};

use transfer_rank::auth::{require_admin, AuthError};
use transfer_rank::config::Config;
use transfer_rank::import::parse_timestamp;
use transfer_rank::ingest::{ingest_draft, IngestOutcome, RumourDraft};
use transfer_rank::leaderboard::{
    find_players, leaderboard, player_detail, source_detail, source_rankings, LeaderboardQuery,
    SortKey, SortOrder, DEFAULT_PER_PAGE,
};
use transfer_rank::model::{Position, ReputationTier, RumourStatus, SourceKind};
use transfer_rank::output;
use transfer_rank::scoring::{
    calculate_score, ScoreInput, ScoringConfig, ScoringError, ScoringWeights,
};
use transfer_rank::store::{self, Database, RecomputeSummary};

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_DATA: i32 = 2;
const EXIT_SCORING: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// List rumours ranked by score (default if no subcommand)
    List(ListArgs),
    /// Show one rumour with its score breakdown
    Show { id: u64 },
    /// Open a rumour's source article in the browser
    Open { id: u64 },
    /// Show a player and every rumour about them
    Player {
        /// Player id or name
        player: String,
    },
    /// Rate a rumour from 1 to 5 stars; rating again replaces your rating
    Rate {
        id: u64,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        stars: u8,
        /// Who is rating (defaults to the current user)
        #[arg(long)]
        rater: Option<String>,
    },
    /// Add a rumour
    Add(AddArgs),
    /// Import rumours from CSV files (glob patterns accepted)
    Import {
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Record that more sources report a rumour
    Corroborate {
        id: u64,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    /// Mark a rumour as contradicted
    Contradict {
        id: u64,
        /// Clear the contradiction instead
        #[arg(long)]
        undo: bool,
    },
    /// Resolve a rumour (admin)
    Resolve { id: u64, outcome: Outcome },
    /// Delete a rumour and its score (admin)
    Delete { id: u64 },
    /// Rescore every rumour (admin)
    Recompute,
    /// Show or change the overall score weights
    Weights {
        #[command(subcommand)]
        action: Option<WeightsAction>,
    },
    /// Source rankings and administration
    Source {
        #[command(subcommand)]
        action: Option<SourceAction>,
    },
    /// Club needs by position
    Club {
        #[command(subcommand)]
        action: ClubAction,
    },
    /// Create a config file interactively
    Init,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// Match player, current club or destination club
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long)]
    league: Option<String>,
    #[arg(long)]
    position: Option<Position>,
    #[arg(long)]
    source_type: Option<SourceKind>,
    /// Minimum fee in €M
    #[arg(long)]
    min_fee: Option<f64>,
    /// Maximum fee in €M
    #[arg(long)]
    max_fee: Option<f64>,
    /// Include confirmed and denied rumours
    #[arg(short, long)]
    all: bool,
    #[arg(long, value_enum, default_value_t = SortKey::Overall)]
    sort: SortKey,
    #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
    order: SortOrder,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: usize,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            search: None,
            league: None,
            position: None,
            source_type: None,
            min_fee: None,
            max_fee: None,
            all: false,
            sort: SortKey::Overall,
            order: SortOrder::Desc,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    #[arg(long)]
    player: String,
    #[arg(long)]
    position: Position,
    /// Player's current club
    #[arg(long)]
    from: String,
    /// Rumoured destination club
    #[arg(long)]
    to: String,
    #[arg(long)]
    league: String,
    #[arg(long)]
    source: String,
    #[arg(long, default_value_t = SourceKind::Outlet)]
    source_type: SourceKind,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    nationality: Option<String>,
    /// Reported fee in €M
    #[arg(long)]
    fee: Option<f64>,
    #[arg(long)]
    contract_years: Option<f64>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    claim: Option<String>,
    /// RFC 3339 timestamp or YYYY-MM-DD (default: now)
    #[arg(long)]
    reported_at: Option<String>,
}

#[derive(Subcommand, Debug)]
enum WeightsAction {
    Show,
    /// Set all four weights; they must sum to 1.0 (admin)
    Set {
        credibility: f64,
        fit: f64,
        value: f64,
        momentum: f64,
    },
}

#[derive(Subcommand, Debug)]
enum SourceAction {
    List,
    /// Show one source and its rumours
    Show { source: String },
    /// Set a source's reputation tier (admin)
    Reputation { source: String, tier: ReputationTier },
    /// Override a source's historical accuracy, 0.0 to 1.0, or "clear" (admin)
    Accuracy { source: String, accuracy: String },
}

#[derive(Subcommand, Debug)]
enum ClubAction {
    /// Show needs for one club, or all clubs
    Show { club: Option<String> },
    /// Set a club's need (0-100) for a position, or "clear"
    Need {
        club: String,
        position: Position,
        need: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Outcome {
    Confirmed,
    Denied,
    Open,
}

impl From<Outcome> for RumourStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Confirmed => RumourStatus::Confirmed,
            Outcome::Denied => RumourStatus::Denied,
            Outcome::Open => RumourStatus::Open,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "transfer-rank")]
#[command(about = "Ranks football transfer rumours by credibility, fit, value and momentum")]
#[command(long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/transfer-rank/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Tab-separated output for scripting
    #[arg(long, global = true)]
    tsv: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Everything a command needs, loaded once.
struct AppContext {
    config: Config,
    calibration: ScoringConfig,
    db: Database,
    db_path: PathBuf,
    tsv: bool,
    use_colors: bool,
    now: DateTime<Utc>,
}

fn main() {
    let cli = Cli::parse();
    transfer_rank::logging::init(cli.verbose);
    let command = cli.command.unwrap_or(Commands::List(ListArgs::default()));
    let config_path = cli.config.map(PathBuf::from);

    if let Commands::Init = command {
        if let Err(e) = transfer_rank::config::init::run_init_wizard(config_path) {
            eprintln!("Init failed: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
        std::process::exit(EXIT_SUCCESS);
    }

    let config = match transfer_rank::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate scoring config at startup
    let calibration = config.calibration();
    if let Err(errors) = transfer_rank::scoring::validate_scoring(&calibration) {
        eprintln!("Scoring config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let db_path = cli
        .db
        .or_else(|| config.data_file.clone())
        .unwrap_or_else(store::get_database_path);
    let is_new = !db_path.exists();
    let mut db = match store::load_database(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Database error: {:#}", e);
            std::process::exit(EXIT_DATA);
        }
    };
    if is_new {
        // Config weights seed a fresh database only
        db.settings.weights = calibration.weights;
    }
    debug!(path = %db_path.display(), rumours = db.rumours.len(), "loaded database");

    let mut ctx = AppContext {
        config,
        calibration,
        db,
        db_path,
        tsv: cli.tsv,
        use_colors: output::should_use_colors(),
        now: Utc::now(),
    };

    let result = run(command, &mut ctx).and_then(|modified| {
        if modified {
            store::save_database(&ctx.db_path, &ctx.db)?;
        }
        Ok(())
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code_for(&e));
    }
    std::process::exit(EXIT_SUCCESS);
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<AuthError>().is_some() {
        EXIT_AUTH
    } else if error.downcast_ref::<ScoringError>().is_some() {
        EXIT_SCORING
    } else {
        EXIT_DATA
    }
}

fn admin(ctx: &AppContext) -> Result<()> {
    require_admin(&ctx.config.admin)?;
    info!("admin password accepted");
    Ok(())
}

fn report(summary: &RecomputeSummary) {
    if !summary.unscored.is_empty() {
        eprintln!("{}", output::format_recompute_summary(summary));
    }
}

/// Source id from a numeric id or a name.
fn find_source(db: &Database, key: &str) -> Result<u64> {
    if let Ok(id) = key.parse::<u64>() {
        if db.source(id).is_some() {
            return Ok(id);
        }
    }
    db.source_by_name(key)
        .map(|s| s.id)
        .with_context(|| format!("No source named '{}'", key))
}

/// Rater name for `rate` when none is given.
fn default_rater() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string())
}

fn parse_clearable<T: std::str::FromStr>(value: &str, what: &str) -> Result<Option<T>> {
    if value.eq_ignore_ascii_case("clear") {
        return Ok(None);
    }
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("Invalid {} '{}'", what, value))
}

/// Run one command. Returns whether the database changed.
fn run(command: Commands, ctx: &mut AppContext) -> Result<bool> {
    match command {
        Commands::List(args) => {
            let query = LeaderboardQuery {
                search: args.search,
                league: args.league,
                position: args.position,
                source_kind: args.source_type,
                min_fee: args.min_fee,
                max_fee: args.max_fee,
                include_resolved: args.all,
                sort: args.sort,
                order: args.order,
                page: args.page,
                per_page: args.per_page,
            };
            let page = leaderboard(&ctx.db, &query);
            if ctx.tsv {
                let tsv = output::format_tsv(&page.entries);
                if !tsv.is_empty() {
                    println!("{}", tsv);
                }
            } else {
                println!("{}", output::format_leaderboard(&page, ctx.now, ctx.use_colors));
            }
            Ok(false)
        }
        Commands::Show { id } => {
            let db = &ctx.db;
            let rumour = db.rumour(id).with_context(|| format!("No rumour with id {}", id))?;
            let score = db.score(id);
            // Breakdown as of the stored score, so the numbers agree
            let breakdown = score.and_then(|s| {
                let input = ScoreInput {
                    rumour,
                    source: db.source(rumour.source_id),
                    club_needs: db.needs_for(&rumour.to_club),
                    player: db.player(rumour.player_id),
                };
                let config = ctx.calibration.with_weights(s.weights);
                calculate_score(&input, &config, s.computed_at).ok().map(|r| r.breakdown)
            });
            println!(
                "{}",
                output::format_rumour_detail(
                    rumour,
                    &db.player_name(rumour),
                    &db.source_name(rumour),
                    score,
                    breakdown.as_ref(),
                    ctx.now,
                    ctx.use_colors,
                )
            );
            Ok(false)
        }
        Commands::Open { id } => {
            let rumour = ctx.db.rumour(id).with_context(|| format!("No rumour with id {}", id))?;
            let url = transfer_rank::browser::rumour_url(rumour)?;
            transfer_rank::browser::open_url(url)?;
            println!("Opened {}", url);
            Ok(false)
        }
        Commands::Player { player } => {
            let players = find_players(&ctx.db, &player);
            if players.is_empty() {
                bail!("No player matching '{}'", player);
            }
            let views: Vec<String> = players
                .into_iter()
                .map(|p| {
                    output::format_player_detail(
                        &player_detail(&ctx.db, p),
                        ctx.now,
                        ctx.use_colors,
                    )
                })
                .collect();
            println!("{}", views.join("\n\n"));
            Ok(false)
        }
        Commands::Rate { id, stars, rater } => {
            let rater = rater.unwrap_or_else(default_rater);
            let update = ctx.db.rate_rumour(id, &rater, stars, ctx.now)?;
            let verb = if update.previous.is_some() {
                "Updated"
            } else {
                "Recorded"
            };
            println!(
                "{} {}'s rating for rumour #{}: now {}",
                verb,
                rater.trim(),
                id,
                output::format_rating(update.average, update.count)
            );
            Ok(true)
        }
        Commands::Add(args) => {
            let reported_at = args.reported_at.as_deref().map(parse_timestamp).transpose()?;
            let draft = RumourDraft {
                player_name: args.player,
                position: args.position,
                age: args.age,
                nationality: args.nationality,
                current_club: args.from,
                target_club: args.to,
                league: args.league,
                source_name: args.source,
                source_kind: args.source_type,
                source_url: args.url,
                fee: args.fee,
                contract_years_left: args.contract_years,
                claim: args.claim,
                reported_at,
                corroboration: 0,
                contradicted: false,
            };
            let (outcome, summary) =
                ingest_draft(&mut ctx.db, &draft, &ctx.calibration, ctx.now)?;
            report(&summary);
            match outcome {
                IngestOutcome::New(id) => {
                    let overall = output::format_score(ctx.db.score(id).map(|s| s.overall));
                    println!("Added rumour #{} (overall {})", id, overall);
                    Ok(true)
                }
                IngestOutcome::Corroborated(id) => {
                    println!("Corroborated existing rumour #{}", id);
                    Ok(true)
                }
                IngestOutcome::Duplicate(reason) => {
                    println!("Skipped duplicate: {}", reason);
                    Ok(false)
                }
            }
        }
        Commands::Import { patterns } => {
            let report = transfer_rank::import::import_files(
                &mut ctx.db,
                &patterns,
                &ctx.calibration,
                ctx.now,
            )?;
            for error in &report.errors {
                eprintln!("{}", error);
            }
            println!(
                "Imported {} new, {} corroborated, {} duplicates, {} rejected rows",
                report.added,
                report.corroborated,
                report.duplicates,
                report.errors.len()
            );
            if report.unscored > 0 {
                eprintln!("{} imported rumours could not be scored", report.unscored);
            }
            Ok(report.added + report.corroborated > 0)
        }
        Commands::Corroborate { id, count } => {
            let summary = ctx.db.corroborate(id, count, &ctx.calibration, ctx.now)?;
            report(&summary);
            println!(
                "Rumour #{} now has {} corroborating sources",
                id,
                ctx.db.rumour(id).map_or(0, |r| r.corroboration)
            );
            Ok(true)
        }
        Commands::Contradict { id, undo } => {
            let summary = ctx.db.set_contradicted(id, !undo, &ctx.calibration, ctx.now)?;
            report(&summary);
            println!(
                "Rumour #{} {}",
                id,
                if undo { "no longer contradicted" } else { "marked contradicted" }
            );
            Ok(true)
        }
        Commands::Resolve { id, outcome } => {
            admin(ctx)?;
            let status = RumourStatus::from(outcome);
            let summary = ctx.db.resolve(id, status, &ctx.calibration, ctx.now)?;
            report(&summary);
            println!("Rumour #{} is now {}", id, status);
            Ok(true)
        }
        Commands::Delete { id } => {
            admin(ctx)?;
            let rumour = ctx.db.delete_rumour(id)?;
            println!("Deleted rumour #{} ({} -> {})", rumour.id, rumour.from_club, rumour.to_club);
            Ok(true)
        }
        Commands::Recompute => {
            admin(ctx)?;
            let summary = ctx.db.recompute_all(&ctx.calibration, ctx.now)?;
            println!("{}", output::format_recompute_summary(&summary));
            Ok(true)
        }
        Commands::Weights { action } => match action.unwrap_or(WeightsAction::Show) {
            WeightsAction::Show => {
                println!("{}", output::format_weights(&ctx.db.settings));
                Ok(false)
            }
            WeightsAction::Set {
                credibility,
                fit,
                value,
                momentum,
            } => {
                admin(ctx)?;
                let weights = ScoringWeights {
                    credibility,
                    fit,
                    value,
                    momentum,
                };
                let summary = ctx.db.set_weights(weights, &ctx.calibration, ctx.now)?;
                println!("{}", output::format_weights(&ctx.db.settings));
                println!("{}", output::format_recompute_summary(&summary));
                Ok(true)
            }
        },
        Commands::Source { action } => match action.unwrap_or(SourceAction::List) {
            SourceAction::List => {
                println!(
                    "{}",
                    output::format_source_rankings(&source_rankings(&ctx.db), ctx.use_colors)
                );
                Ok(false)
            }
            SourceAction::Show { source } => {
                let id = find_source(&ctx.db, &source)?;
                let source = ctx
                    .db
                    .source(id)
                    .with_context(|| format!("No source with id {}", id))?;
                let detail = source_detail(&ctx.db, source, ctx.now);
                println!(
                    "{}",
                    output::format_source_detail(&detail, ctx.now, ctx.use_colors)
                );
                Ok(false)
            }
            SourceAction::Reputation { source, tier } => {
                admin(ctx)?;
                let id = find_source(&ctx.db, &source)?;
                let summary = ctx.db.set_source_reputation(id, tier, &ctx.calibration, ctx.now)?;
                println!("Source #{} is now {} ({} rumours rescored)", id, tier, summary.scored);
                report(&summary);
                Ok(true)
            }
            SourceAction::Accuracy { source, accuracy } => {
                admin(ctx)?;
                let id = find_source(&ctx.db, &source)?;
                let accuracy = parse_clearable::<f64>(&accuracy, "accuracy")?;
                let summary = ctx.db.set_source_accuracy(id, accuracy, &ctx.calibration, ctx.now)?;
                match accuracy {
                    Some(a) => println!("Source #{} accuracy set to {:.0}%", id, a * 100.0),
                    None => println!("Source #{} accuracy override cleared", id),
                }
                report(&summary);
                Ok(true)
            }
        },
        Commands::Club { action } => match action {
            ClubAction::Show { club } => {
                let needs: Vec<_> = match club {
                    Some(name) => match ctx.db.needs_for(&name) {
                        Some(needs) => vec![needs],
                        None => bail!("No needs recorded for {}", name),
                    },
                    None => ctx.db.club_needs.iter().collect(),
                };
                if needs.is_empty() {
                    println!("No club needs recorded.");
                }
                for n in needs {
                    println!("{}", output::format_club_needs(n));
                }
                Ok(false)
            }
            ClubAction::Need {
                club,
                position,
                need,
            } => {
                let need = parse_clearable::<u8>(&need, "need")?;
                let summary = match need {
                    Some(_) => {
                        ctx.db
                            .set_club_need(&club, position, need, &ctx.calibration, ctx.now)?
                    }
                    None => {
                        ctx.db
                            .clear_club_need(&club, position, &ctx.calibration, ctx.now)?
                    }
                };
                println!(
                    "{} {} need {} ({} rumours rescored)",
                    club,
                    position,
                    output::format_score(need),
                    summary.scored
                );
                report(&summary);
                Ok(true)
            }
        },
        Commands::Init => unreachable!("init is handled before the database is loaded"),
    }
}
