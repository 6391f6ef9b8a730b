// Expansion of the roster into (player × timeframe) scrape tasks.

use std::collections::HashMap;

use chrono::NaiveDate;
use milbroll_core::model::{Player, PlayerId, PlayerMetadata, Task, Timeframe};

/// One task per (player, timeframe), ordered by player then timeframe.
/// Every player is scraped; filtering by level or age happens downstream.
/// A player without a metadata entry gets empty metadata.
pub fn build_tasks(
    players: &[Player],
    metadata: &HashMap<PlayerId, PlayerMetadata>,
    timeframes: &[Timeframe],
    today: NaiveDate,
) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(players.len() * timeframes.len());
    for player in players {
        let meta = metadata.get(&player.id).cloned().unwrap_or_default();
        for &timeframe in timeframes {
            tasks.push(Task {
                player: player.clone(),
                timeframe,
                range: timeframe.resolve(today),
                meta: meta.clone(),
            });
        }
    }
    tasks
}
