// Bounded concurrent dispatch of fetch workers.
//
// Every task is spawned up front and waits on a semaphore permit, so at most
// `width` workers talk to the site at once. Workers report through an mpsc
// channel; a single collector drains it in completion order and sorts each
// outcome into successes or errors. No worker touches shared collections.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use milbroll_core::model::{ErrorRecord, SummaryRecord, Task, TaskOutcome};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::fetch::PageFetcher;
use crate::worker::{run_task, GameLogSource};

/// Default number of tasks in flight.
pub const DEFAULT_WIDTH: usize = 15;

/// Outcomes split by kind. `summaries.len() + errors.len()` always equals
/// the number of dispatched tasks.
#[derive(Debug, Default)]
pub struct Partitioned {
    pub summaries: Vec<SummaryRecord>,
    pub errors: Vec<ErrorRecord>,
}

impl Partitioned {
    pub fn total(&self) -> usize {
        self.summaries.len() + self.errors.len()
    }

    fn push(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Summary(record) => self.summaries.push(record),
            TaskOutcome::Error(record) => self.errors.push(record),
        }
    }
}

fn progress_step(total: usize) -> usize {
    (total / 10).clamp(1, 100)
}

/// Run every task with at most `width` in flight and collect all outcomes.
///
/// Completes only after every task has reported. A worker that panics is
/// recorded as an error for its task rather than dropped.
pub async fn dispatch<F>(
    fetcher: Arc<F>,
    source: Arc<GameLogSource>,
    tasks: Vec<Task>,
    width: usize,
) -> Partitioned
where
    F: PageFetcher + ?Sized + 'static,
{
    let width = width.max(1);
    let total = tasks.len();
    info!(tasks = total, width, "dispatching scrape tasks");

    let semaphore = Arc::new(Semaphore::new(width));
    let (tx, mut rx) = mpsc::channel::<TaskOutcome>(width * 2);

    for task in tasks {
        let fetcher = Arc::clone(&fetcher);
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails if that
            // changes; run the task regardless.
            let _permit = semaphore.acquire_owned().await.ok();

            let fallback = task.clone();
            let outcome = AssertUnwindSafe(run_task(&*fetcher, &source, task))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!(player = %fallback.player.name, "worker panicked");
                    TaskOutcome::Error(ErrorRecord::for_task(&fallback, "worker panicked"))
                });

            let _ = tx.send(outcome).await;
        });
    }

    // Drop our sender so the channel closes once every worker has reported.
    drop(tx);

    let step = progress_step(total);
    let mut results = Partitioned::default();
    while let Some(outcome) = rx.recv().await {
        results.push(outcome);
        let done = results.total();
        if done % step == 0 || done == total {
            info!(
                done,
                total,
                ok = results.summaries.len(),
                errors = results.errors.len(),
                "scrape progress"
            );
        }
    }

    if results.total() != total {
        warn!(
            expected = total,
            received = results.total(),
            "some workers exited without reporting"
        );
    }

    results
}
