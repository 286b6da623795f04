use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use petrank_core::{
    FailurePolicy, RankedFeed, Scorer, ScoringConfig, Timestamp, export_ranking, import_snapshot,
    rank_feed,
};

#[derive(Parser)]
#[command(name = "petrank", about = "Petition feed ranking CLI")]
struct Cli {
    /// Scoring config file (TOML). Falls back to $PETRANK_CONFIG, then defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the petitions in a feed snapshot
    Rank {
        /// Feed snapshot file (JSON)
        file: PathBuf,

        /// Rank petitions that fail to score with this total instead of dropping them
        #[arg(long, allow_negative_numbers = true)]
        fallback: Option<f64>,

        /// Print the ranking report as JSON
        #[arg(long)]
        json: bool,

        /// Show at most this many ranked petitions
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the time weight and novelty boost of an instant
    Weight {
        /// ISO-8601 instant, e.g. 2026-01-01T00:00:00Z
        instant: String,
    },

    /// Print the effective scoring config as TOML
    Config,
}

fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(|| {
        std::env::var("PETRANK_CONFIG")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    })
}

fn load_scorer(cli: &Cli) -> Result<Scorer> {
    let config = match config_path(cli) {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config = ScoringConfig::from_toml_str(&content)
                .with_context(|| format!("failed to parse config {}", path.display()))?;
            tracing::debug!("loaded scoring config from {}", path.display());
            config
        }
        None => ScoringConfig::default(),
    };
    Scorer::new(config).context("invalid scoring config")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Rank {
            file,
            fallback,
            json,
            limit,
        } => cmd_rank(&cli, file, *fallback, *json, *limit),
        Commands::Weight { instant } => cmd_weight(&cli, instant),
        Commands::Config => cmd_config(&cli),
    }
}

fn cmd_rank(
    cli: &Cli,
    file: &Path,
    fallback: Option<f64>,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let scorer = load_scorer(cli)?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let snapshot = import_snapshot(&content)
        .with_context(|| format!("failed to load snapshot {}", file.display()))?;

    let policy = match fallback {
        Some(total) => FailurePolicy::fallback(total).context("invalid --fallback score")?,
        None => FailurePolicy::Exclude,
    };

    let mut feed = rank_feed(&scorer, &snapshot.petitions, policy).context("failed to rank feed")?;
    if let Some(limit) = limit {
        feed.ranked.truncate(limit);
    }

    if json {
        let report = export_ranking(&feed).context("failed to serialize ranking")?;
        println!("{report}");
    } else {
        print_feed(&feed);
    }
    Ok(())
}

fn print_feed(feed: &RankedFeed) {
    for (i, r) in feed.ranked.iter().enumerate() {
        let marker = if r.fallback { "*" } else { " " };
        println!(
            "{:>4}{marker} {:>12.6}  novelty={:.6} votes={:.6} comments={:.6}  {}  {}",
            i + 1,
            r.score.total,
            r.score.novelty,
            r.score.votes,
            r.score.comments,
            r.id,
            r.title.as_deref().unwrap_or("-"),
        );
    }
    for u in &feed.unranked {
        println!("unranked {}: petition temporarily unranked", u.id);
    }
    println!(
        "ranked={} unranked={}",
        feed.ranked.len(),
        feed.unranked.len()
    );
}

fn cmd_weight(cli: &Cli, instant: &str) -> Result<()> {
    let scorer = load_scorer(cli)?;
    let t: Timestamp = instant.parse()?;

    let weight = scorer
        .time_weight(t)
        .with_context(|| format!("cannot weigh {t}"))?;
    let boost = scorer.novelty_boost(t)?;

    println!("instant:       {t}");
    println!("age_days:      {}", scorer.age_days(t));
    println!("time_weight:   {weight:.9}");
    println!("novelty_boost: {boost:.9}");
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let scorer = load_scorer(cli)?;
    let toml = scorer
        .config()
        .to_toml_string()
        .context("failed to serialize config")?;
    print!("{toml}");
    Ok(())
}
