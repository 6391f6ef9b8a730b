// Rolling-window leaderboard scraper entry point.
//
// Startup sequence:
// 1. Parse command-line overrides
// 2. Load config (copying defaults on first run)
// 3. Initialize tracing (stderr, or a log file when configured)
// 4. Build the HTTP client
// 5. Run the pipeline: roster, tasks, dispatch, output files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use milbroll_core::config::{self, Config, StatGroup};
use milbroll_scrape::fetch::HttpFetcher;
use milbroll_scrape::pipeline;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "milbroll", about = "Scrape minor-league rolling-window leaderboards")]
struct Args {
    /// Directory holding config/ and defaults/; output paths resolve here too.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Season to request from the leaderboard API.
    #[arg(long)]
    season: Option<u16>,

    /// Stat group: "bat" or "pit".
    #[arg(long)]
    stats: Option<String>,

    /// Number of players scraped concurrently.
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse command-line overrides
    let args = Args::parse();

    // 2. Load config
    let mut config =
        config::load_config_in(&args.base_dir).context("failed to load configuration")?;
    apply_overrides(&mut config, &args)?;

    // 3. Initialize tracing
    init_tracing(&args.base_dir, config.output.log_to_file)?;
    info!(
        season = config.source.season,
        stats = config.source.stats.param(),
        levels = ?config.source.levels,
        workers = config.scrape.workers,
        "milbroll starting"
    );

    // 4. HTTP client
    let fetcher = HttpFetcher::new(&config.source.user_agent, config.scrape.request_timeout())
        .context("failed to build HTTP client")?;

    // 5. Run
    let today = chrono::Local::now().date_naive();
    let summary = pipeline::run(&config, Arc::new(fetcher), today, &args.base_dir).await?;

    info!(
        roster_rows = summary.roster_rows,
        players = summary.players,
        tasks = summary.tasks,
        leaderboard_rows = summary.leaderboard_rows,
        errors = summary.errors,
        "scrape complete"
    );
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) -> anyhow::Result<()> {
    if let Some(season) = args.season {
        config.source.season = season;
    }
    if let Some(stats) = &args.stats {
        config.source.stats = StatGroup::from_param(stats)
            .with_context(|| format!("--stats must be \"bat\" or \"pit\", got {stats:?}"))?;
    }
    if let Some(workers) = args.workers {
        config.scrape.workers = workers;
    }
    config::validate(config).context("invalid command-line override")?;
    Ok(())
}

/// Initialize tracing to stderr, or to `logs/milbroll.log` under `base_dir`.
fn init_tracing(base_dir: &Path, to_file: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("milbroll=info,milbroll_scrape=info,milbroll_core=info,warn")
    });

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true);

    if to_file {
        let log_dir = base_dir.join("logs");
        std::fs::create_dir_all(&log_dir)?;
        let log_file = std::fs::File::create(log_dir.join("milbroll.log"))?;
        let subscriber = builder
            .with_writer(log_file)
            .with_ansi(false)
            .with_thread_ids(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    } else {
        let subscriber = builder.with_writer(std::io::stderr).finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    }

    Ok(())
}
