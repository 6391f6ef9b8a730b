// Full-season roster loading from the minor-league leaderboard JSON API.
//
// One request per competition level; rows are concatenated in level order
// and exact duplicates dropped. The result is both the metadata source of
// truth for the rolling-window scrape and the full-season output table.

use std::collections::{BTreeMap, HashMap, HashSet};

use milbroll_core::config::SourceConfig;
use milbroll_core::model::{Player, PlayerId, PlayerMetadata, StatRow};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::fetch::{FetchError, PageFetcher};

/// One leaderboard row exactly as the API returned it.
pub type RosterRow = Map<String, Value>;

// API field names.
const FIELD_NAME: &str = "PlayerName";
const FIELD_ID: &str = "minormasterid";
const FIELD_LEVEL: &str = "aLevel";
const FIELD_AGE: &str = "Age";
const FIELD_TEAM: &str = "TeamName";

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster fetch failed for level {level}: {source}")]
    Fetch { level: u32, source: FetchError },

    #[error("roster response for level {level} is not valid JSON: {source}")]
    Json {
        level: u32,
        source: serde_json::Error,
    },

    #[error("roster response for level {level} is not a JSON array")]
    NotArray { level: u32 },
}

/// Leaderboard API URL for one level.
pub fn roster_url(source: &SourceConfig, level: u32) -> String {
    format!(
        "{base}?pos=all&level={level}&lg={lg}&stats={stats}&qual={qual}&type=0&team=&season={season}&seasonEnd={season}",
        base = source.roster_url,
        lg = source.leagues,
        stats = source.stats.param(),
        qual = source.qual,
        season = source.season,
    )
}

/// Parse one level's response body into rows. Non-object array entries are
/// skipped.
pub fn parse_level(body: &str, level: u32) -> Result<Vec<RosterRow>, RosterError> {
    let value: Value =
        serde_json::from_str(body).map_err(|source| RosterError::Json { level, source })?;
    let Value::Array(items) = value else {
        return Err(RosterError::NotArray { level });
    };

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(row) => rows.push(row),
            other => warn!(level, "skipping non-object roster entry: {other}"),
        }
    }
    Ok(rows)
}

/// Raw JSON cell rendered as output text. Null becomes empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Roster row flattened to strings, keeping the API's column order.
pub fn row_to_stat_row(row: &RosterRow) -> StatRow {
    row.iter().map(|(k, v)| (k.as_str(), value_text(v))).collect()
}

/// Key-order independent identity of a row, for exact-duplicate detection.
/// A null value and an absent key are the same missing cell.
fn row_fingerprint(row: &RosterRow) -> String {
    let sorted: BTreeMap<&String, &Value> = row.iter().filter(|(_, v)| !v.is_null()).collect();
    serde_json::to_string(&sorted).unwrap_or_default()
}

/// Drop rows that are exact duplicates of an earlier row.
pub fn dedup_rows(rows: Vec<RosterRow>) -> Vec<RosterRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row_fingerprint(row)))
        .collect()
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Roster {
    rows: Vec<RosterRow>,
}

impl Roster {
    /// Build from already-concatenated rows; exact duplicates are dropped.
    pub fn from_rows(rows: Vec<RosterRow>) -> Self {
        Roster {
            rows: dedup_rows(rows),
        }
    }

    /// Fetch every configured level in order. Any failure aborts: without a
    /// complete roster there is nothing to build tasks from.
    pub async fn fetch<F>(fetcher: &F, source: &SourceConfig) -> Result<Self, RosterError>
    where
        F: PageFetcher + ?Sized,
    {
        let mut all = Vec::new();
        for &level in &source.levels {
            let url = roster_url(source, level);
            let body = fetcher
                .get_text(&url)
                .await
                .map_err(|e| RosterError::Fetch { level, source: e })?;
            let rows = parse_level(&body, level)?;

            if rows.is_empty() {
                warn!(level, "roster level returned no rows");
            } else if source.page_size_warning > 0 && rows.len() == source.page_size_warning {
                warn!(
                    level,
                    rows = rows.len(),
                    "roster level row count equals page size; response may be truncated"
                );
            }
            info!(level, rows = rows.len(), "fetched roster level");
            all.extend(rows);
        }

        let roster = Roster::from_rows(all);
        info!(rows = roster.len(), "roster assembled");
        Ok(roster)
    }

    pub fn rows(&self) -> &[RosterRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Player id → metadata. The first row seen for an id wins.
    pub fn metadata_lookup(&self) -> HashMap<PlayerId, PlayerMetadata> {
        let mut lookup = HashMap::new();
        for row in &self.rows {
            let Some(id) = row.get(FIELD_ID).and_then(PlayerId::from_json) else {
                continue;
            };
            lookup.entry(id).or_insert_with(|| PlayerMetadata {
                level: row.get(FIELD_LEVEL).map(value_text).unwrap_or_default(),
                age: row.get(FIELD_AGE).map(value_text).unwrap_or_default(),
                team: row.get(FIELD_TEAM).map(value_text).unwrap_or_default(),
            });
        }
        lookup
    }

    /// Distinct (name, id) pairs in first-seen order. Rows missing either
    /// field are skipped.
    pub fn players(&self) -> Vec<Player> {
        let mut seen = HashSet::new();
        let mut players = Vec::new();
        for row in &self.rows {
            let id = row.get(FIELD_ID).and_then(PlayerId::from_json);
            let name = row
                .get(FIELD_NAME)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|n| !n.is_empty());
            let (Some(id), Some(name)) = (id, name) else {
                warn!("skipping roster row without {FIELD_NAME}/{FIELD_ID}");
                continue;
            };
            if seen.insert((name.to_string(), id.clone())) {
                players.push(Player {
                    id,
                    name: name.to_string(),
                });
            }
        }
        players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use milbroll_core::config::StatGroup;
    use serde_json::json;
    use std::sync::Mutex;

    fn source(levels: Vec<u32>) -> SourceConfig {
        SourceConfig {
            roster_url: "https://stats.test/api/leaders/minor-league/data".into(),
            player_base_url: "https://stats.test/players".into(),
            user_agent: "test".into(),
            levels,
            leagues: "2,4".into(),
            stats: StatGroup::Batting,
            qual: 10,
            season: 2025,
            position: "OF".into(),
            page_size_warning: 0,
        }
    }

    fn row(value: Value) -> RosterRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    /// Serves canned bodies keyed by `level=<n>` and records requested URLs.
    struct LevelFetcher {
        bodies: HashMap<u32, Result<String, u16>>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for LevelFetcher {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            let level = self
                .bodies
                .keys()
                .copied()
                .find(|l| url.contains(&format!("level={l}&")))
                .expect("unexpected level");
            match &self.bodies[&level] {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
            }
        }
    }

    #[test]
    fn roster_url_carries_query_parameters() {
        let url = roster_url(&source(vec![1]), 7);
        assert!(url.starts_with("https://stats.test/api/leaders/minor-league/data?pos=all&level=7&"));
        assert!(url.contains("&lg=2,4&"));
        assert!(url.contains("&stats=bat&qual=10&type=0&team=&season=2025&seasonEnd=2025"));
    }

    #[test]
    fn parse_level_rejects_non_array() {
        assert!(matches!(
            parse_level(r#"{"data": []}"#, 3),
            Err(RosterError::NotArray { level: 3 })
        ));
        assert!(matches!(
            parse_level("<html>", 3),
            Err(RosterError::Json { level: 3, .. })
        ));
    }

    #[test]
    fn parse_level_skips_non_objects() {
        let rows = parse_level(r#"[{"PlayerName": "A"}, 5, null]"#, 1).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn exact_duplicates_dropped_first_kept() {
        let a = row(json!({"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AA"}));
        let a_reordered = row(json!({"aLevel": "AA", "minormasterid": "sa1", "PlayerName": "A"}));
        let a_other_level = row(json!({"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AAA"}));
        let roster = Roster::from_rows(vec![a.clone(), a_reordered, a_other_level]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.rows()[0], a);
    }

    #[test]
    fn null_and_absent_cells_count_as_duplicates() {
        let with_null = row(json!({"PlayerName": "A", "minormasterid": "sa1", "TeamName": null}));
        let without = row(json!({"PlayerName": "A", "minormasterid": "sa1"}));
        let other_team = row(json!({"PlayerName": "A", "minormasterid": "sa1", "TeamName": "ERI"}));
        let roster = Roster::from_rows(vec![with_null.clone(), without, other_team]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.rows()[0], with_null);
    }

    #[test]
    fn metadata_first_occurrence_wins() {
        let roster = Roster::from_rows(vec![
            row(json!({"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AA", "Age": 21, "TeamName": "ERI"})),
            row(json!({"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AAA", "Age": 21, "TeamName": "TOL"})),
            row(json!({"PlayerName": "B", "minormasterid": 42, "aLevel": "A", "Age": 19.5, "TeamName": null})),
        ]);
        let meta = roster.metadata_lookup();
        assert_eq!(meta.len(), 2);
        assert_eq!(
            meta[&PlayerId::new("sa1")],
            PlayerMetadata {
                level: "AA".into(),
                age: "21".into(),
                team: "ERI".into()
            }
        );
        let b = &meta[&PlayerId::new("42")];
        assert_eq!(b.age, "19.5");
        assert_eq!(b.team, "");
    }

    #[test]
    fn players_are_distinct_and_skip_missing_fields() {
        let roster = Roster::from_rows(vec![
            row(json!({"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AA"})),
            row(json!({"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AAA"})),
            row(json!({"PlayerName": "B", "minormasterid": null})),
            row(json!({"minormasterid": "sa3"})),
            row(json!({"PlayerName": "C", "minormasterid": "sa4"})),
        ]);
        let players = roster.players();
        let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn row_to_stat_row_renders_values() {
        let r = row(json!({"PlayerName": "A", "PA": 120, "AVG": 0.301, "Team": null}));
        let flat = row_to_stat_row(&r);
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["PlayerName", "PA", "AVG", "Team"]);
        assert_eq!(flat.get("PA"), Some("120"));
        assert_eq!(flat.get("AVG"), Some("0.301"));
        assert_eq!(flat.get("Team"), Some(""));
    }

    #[tokio::test]
    async fn fetch_concatenates_levels_in_order() {
        let fetcher = LevelFetcher {
            bodies: HashMap::from([
                (1, Ok(r#"[{"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AAA"}]"#.to_string())),
                (2, Ok(r#"[{"PlayerName": "B", "minormasterid": "sa2", "aLevel": "AA"},
                          {"PlayerName": "A", "minormasterid": "sa1", "aLevel": "AAA"}]"#.to_string())),
            ]),
            requested: Mutex::new(Vec::new()),
        };
        let roster = Roster::fetch(&fetcher, &source(vec![1, 2])).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.players()[0].name, "A");
        assert_eq!(roster.players()[1].name, "B");
        assert_eq!(fetcher.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_on_any_level_is_fatal() {
        let fetcher = LevelFetcher {
            bodies: HashMap::from([
                (1, Ok("[]".to_string())),
                (2, Err(500)),
            ]),
            requested: Mutex::new(Vec::new()),
        };
        let err = Roster::fetch(&fetcher, &source(vec![1, 2])).await.unwrap_err();
        assert!(matches!(err, RosterError::Fetch { level: 2, .. }));
    }
}
