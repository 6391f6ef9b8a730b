// One full scrape run: roster → tasks → dispatch → output files.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use milbroll_core::config::Config;
use tracing::info;

use crate::dispatch::dispatch;
use crate::fetch::PageFetcher;
use crate::output;
use crate::roster::Roster;
use crate::tasks::build_tasks;
use crate::worker::GameLogSource;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub roster_rows: usize,
    pub players: usize,
    pub tasks: usize,
    pub leaderboard_rows: usize,
    pub errors: usize,
}

/// Run the pipeline against `fetcher`, anchoring every window at `today`.
/// Output paths in `config.output` are resolved against `out_dir`.
///
/// Only roster and output failures are returned as errors; per-task
/// failures end up in the diagnostics file.
pub async fn run<F>(
    config: &Config,
    fetcher: Arc<F>,
    today: NaiveDate,
    out_dir: &Path,
) -> anyhow::Result<RunSummary>
where
    F: PageFetcher + ?Sized + 'static,
{
    let roster = Roster::fetch(&*fetcher, &config.source)
        .await
        .context("failed to load season roster")?;

    output::write_full_season(&out_dir.join(&config.output.full_season), roster.rows())
        .context("failed to write full-season roster")?;

    let metadata = roster.metadata_lookup();
    let players = roster.players();
    let tasks = build_tasks(&players, &metadata, &config.scrape.timeframes, today);
    info!(
        players = players.len(),
        tasks = tasks.len(),
        %today,
        "built scrape tasks"
    );
    let task_count = tasks.len();

    let source = Arc::new(GameLogSource::from_config(&config.source));
    let results = dispatch(fetcher, source, tasks, config.scrape.workers).await;

    let error_count = results.errors.len();
    output::write_errors(&out_dir.join(&config.output.errors), &results.errors)
        .context("failed to write scrape errors")?;
    let leaderboard_rows =
        output::write_leaderboard(&out_dir.join(&config.output.leaderboard), results.summaries)
            .context("failed to write leaderboard")?;

    Ok(RunSummary {
        roster_rows: roster.len(),
        players: players.len(),
        tasks: task_count,
        leaderboard_rows,
        errors: error_count,
    })
}
