// Fetch worker: one task in, one outcome out.
//
// Each task needs two game-log pages (standard and advanced) for the same
// player and date range. Both are always requested, even when the first one
// fails, so a failed task reports every problem it hit. Nothing is retried.

use milbroll_core::config::SourceConfig;
use milbroll_core::model::{DateRange, ErrorRecord, RowKind, StatRow, SummaryRecord, Task, TaskOutcome};
use milbroll_core::slug::normalize_name;
use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::{extract_total_row, ExtractError};
use crate::fetch::{FetchError, PageFetcher};

#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Where player game-log pages live and which position view to request.
#[derive(Debug, Clone)]
pub struct GameLogSource {
    pub base_url: String,
    pub position: String,
}

impl GameLogSource {
    pub fn from_config(source: &SourceConfig) -> Self {
        GameLogSource {
            base_url: source.player_base_url.trim_end_matches('/').to_string(),
            position: source.position.clone(),
        }
    }

    /// Game-log URL for one player, date range, and row kind.
    pub fn url(&self, task: &Task, kind: RowKind) -> String {
        let DateRange { start, end } = task.range;
        format!(
            "{base}/{slug}/{id}/game-log?position={pos}&gds={start}&gde={end}&type={ty}",
            base = self.base_url,
            slug = normalize_name(&task.player.name),
            id = task.player.id,
            pos = self.position,
            start = start.format("%Y-%m-%d"),
            end = end.format("%Y-%m-%d"),
            ty = kind.type_param(),
        )
    }
}

/// Fetch one game-log page and extract its Total row.
pub async fn fetch_row<F>(
    fetcher: &F,
    source: &GameLogSource,
    task: &Task,
    kind: RowKind,
) -> Result<StatRow, RowError>
where
    F: PageFetcher + ?Sized,
{
    let url = source.url(task, kind);
    debug!(%url, player = %task.player.name, %kind, "fetching game log");
    let body = fetcher.get_text(&url).await?;
    Ok(extract_total_row(&body, kind)?)
}

/// Run one task to completion. Never fails: any sub-fetch problem becomes an
/// `ErrorRecord` carrying `"<advanced error> | <standard error>"`.
pub async fn run_task<F>(fetcher: &F, source: &GameLogSource, task: Task) -> TaskOutcome
where
    F: PageFetcher + ?Sized,
{
    let advanced = fetch_row(fetcher, source, &task, RowKind::Advanced).await;
    let standard = fetch_row(fetcher, source, &task, RowKind::Standard).await;

    match (standard, advanced) {
        (Ok(mut stats), Ok(advanced)) => {
            stats.merge(advanced);
            TaskOutcome::Summary(SummaryRecord {
                player_id: task.player.id,
                player_name: task.player.name,
                timeframe: task.timeframe,
                meta: task.meta,
                stats,
            })
        }
        (standard, advanced) => {
            let adv_err = advanced.err().map(|e| e.to_string()).unwrap_or_default();
            let std_err = standard.err().map(|e| e.to_string()).unwrap_or_default();
            let message = format!("{adv_err} | {std_err}");
            warn!(
                player = %task.player.name,
                id = %task.player.id,
                timeframe = %task.timeframe,
                error = %message,
                "task failed"
            );
            TaskOutcome::Error(ErrorRecord::for_task(&task, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use milbroll_core::model::{Player, PlayerId, PlayerMetadata, Timeframe};
    use std::sync::Mutex;

    const STANDARD_PAGE: &str = r#"<table>
        <tr><td data-stat="Date">2025-07-01</td><td data-stat="PA">4</td></tr>
        <tr><td data-stat="Date">Total</td><td data-stat="divider"></td><td data-stat="PA">31</td><td data-stat="AVG">.301</td></tr>
    </table>"#;

    const ADVANCED_PAGE: &str = r#"<table>
        <tr><td data-stat="Date">Total</td><td data-stat="BB%">12.9%</td><td data-stat="K%">19.4%</td><td data-stat="wRC+">151</td></tr>
    </table>"#;

    /// Responds by `type=` flag; either side can be forced to fail.
    struct FakeSite {
        standard: Result<&'static str, FetchError>,
        advanced: Result<&'static str, FetchError>,
        calls: Mutex<Vec<String>>,
    }

    fn clone_err(e: &FetchError) -> FetchError {
        match e {
            FetchError::Timeout { url, secs } => FetchError::Timeout {
                url: url.clone(),
                secs: *secs,
            },
            FetchError::Status { url, status } => FetchError::Status {
                url: url.clone(),
                status: *status,
            },
            FetchError::Transport { url, message } => FetchError::Transport {
                url: url.clone(),
                message: message.clone(),
            },
        }
    }

    #[async_trait]
    impl PageFetcher for FakeSite {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            let side = if url.ends_with("type=-2") {
                &self.advanced
            } else {
                &self.standard
            };
            match side {
                Ok(body) => Ok(body.to_string()),
                Err(e) => Err(clone_err(e)),
            }
        }
    }

    fn site(
        standard: Result<&'static str, FetchError>,
        advanced: Result<&'static str, FetchError>,
    ) -> FakeSite {
        FakeSite {
            standard,
            advanced,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn source() -> GameLogSource {
        GameLogSource {
            base_url: "https://stats.test/players".into(),
            position: "OF".into(),
        }
    }

    fn task() -> Task {
        let today = NaiveDate::from_ymd_opt(2025, 7, 20).unwrap();
        Task {
            player: Player {
                id: PlayerId::new("sa3019585"),
                name: "J.J. Wetherholt".into(),
            },
            timeframe: Timeframe::Last15,
            range: Timeframe::Last15.resolve(today),
            meta: PlayerMetadata {
                level: "AA".into(),
                age: "22".into(),
                team: "SPR".into(),
            },
        }
    }

    fn timeout() -> FetchError {
        FetchError::Timeout {
            url: "https://stats.test/x".into(),
            secs: 10,
        }
    }

    #[test]
    fn url_uses_slug_and_date_range() {
        let url = source().url(&task(), RowKind::Advanced);
        assert_eq!(
            url,
            "https://stats.test/players/jj-wetherholt/sa3019585/game-log?position=OF&gds=2025-07-05&gde=2025-07-20&type=-2"
        );
    }

    #[tokio::test]
    async fn success_merges_metadata_standard_advanced() {
        let fake = site(Ok(STANDARD_PAGE), Ok(ADVANCED_PAGE));
        let outcome = run_task(&fake, &source(), task()).await;
        let TaskOutcome::Summary(record) = outcome else {
            panic!("expected summary, got {outcome:?}");
        };
        assert_eq!(record.meta.level, "AA");
        assert_eq!(
            record.stats.keys().collect::<Vec<_>>(),
            vec!["PA", "AVG", "BB%", "K%", "wRC+"]
        );
        let row = record.to_row();
        assert!(!row.contains_key("divider"));
        assert_eq!(row.get("TeamName"), Some("SPR"));
    }

    #[tokio::test]
    async fn advanced_timeout_yields_error_record() {
        let fake = site(Ok(STANDARD_PAGE), Err(timeout()));
        let outcome = run_task(&fake, &source(), task()).await;
        let TaskOutcome::Error(record) = outcome else {
            panic!("expected error, got {outcome:?}");
        };
        assert!(record.error.contains("timed out"));
        assert!(record.error.ends_with(" | "));
        assert_eq!(record.timeframe, Timeframe::Last15);
        assert_eq!(record.meta.team, "SPR");
    }

    #[tokio::test]
    async fn both_fetches_attempted_when_first_fails() {
        let fake = site(
            Err(FetchError::Status {
                url: "u".into(),
                status: 404,
            }),
            Err(timeout()),
        );
        let outcome = run_task(&fake, &source(), task()).await;
        assert_eq!(fake.calls.lock().unwrap().len(), 2);
        let TaskOutcome::Error(record) = outcome else {
            panic!("expected error");
        };
        let (adv, std) = record.error.split_once(" | ").unwrap();
        assert!(adv.contains("timed out"));
        assert!(std.contains("HTTP 404"));
    }

    #[tokio::test]
    async fn missing_total_row_is_error() {
        let fake = site(Ok("<table><tr><td data-stat=\"Date\">2025-07-01</td></tr></table>"), Ok(ADVANCED_PAGE));
        let outcome = run_task(&fake, &source(), task()).await;
        let TaskOutcome::Error(record) = outcome else {
            panic!("expected error");
        };
        assert_eq!(record.error, " | Total row not found (standard)");
    }

    #[tokio::test]
    async fn advanced_wins_on_key_collision() {
        let fake = site(
            Ok(r#"<table><tr><td data-stat="Date">Total</td><td data-stat="HR">5</td></tr></table>"#),
            Ok(r#"<table><tr><td data-stat="Date">Total</td><td data-stat="HR">6</td></tr></table>"#),
        );
        let TaskOutcome::Summary(record) = run_task(&fake, &source(), task()).await else {
            panic!("expected summary");
        };
        assert_eq!(record.stats.get("HR"), Some("6"));
    }
}
