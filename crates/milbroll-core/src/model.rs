// Domain types for one scrape run: players, rolling windows, tasks, and the
// per-task outcome records.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Player identity
// ---------------------------------------------------------------------------

/// Opaque player identifier (`minormasterid`), stable across levels and
/// timeframes. The stats API emits it as either a JSON string or a number,
/// so both are accepted and stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build an id from a raw JSON value. Returns `None` for null, empty
    /// strings, and non-scalar values.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Some(PlayerId(s.trim().to_string()))
            }
            serde_json::Value::Number(n) => Some(PlayerId(n.to_string())),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        PlayerId::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid player id: {value}")))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// Level/age/team snapshot taken from the season roster. Values stay as the
/// raw strings the API returned; a missing lookup yields the empty default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerMetadata {
    pub level: String,
    pub age: String,
    pub team: String,
}

// ---------------------------------------------------------------------------
// Timeframes
// ---------------------------------------------------------------------------

/// Trailing rolling window ending on the run date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    Last7,
    Last15,
    Last30,
    Last45,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Last7,
        Timeframe::Last15,
        Timeframe::Last30,
        Timeframe::Last45,
    ];

    pub fn days(&self) -> i64 {
        match self {
            Timeframe::Last7 => 7,
            Timeframe::Last15 => 15,
            Timeframe::Last30 => 30,
            Timeframe::Last45 => 45,
        }
    }

    /// Label written to the `timeframe` output column.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Last7 => "last_7",
            Timeframe::Last15 => "last_15",
            Timeframe::Last30 => "last_30",
            Timeframe::Last45 => "last_45",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Timeframe::ALL.into_iter().find(|tf| tf.label() == s)
    }

    /// Resolve the window to concrete dates. The end date is always `today`.
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        DateRange {
            start: today - Duration::days(self.days()),
            end: today,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ---------------------------------------------------------------------------
// Row kinds and stat rows
// ---------------------------------------------------------------------------

/// Which game-log table a request targets. The site renders the standard
/// and advanced column sets as separate pages selected by a `type` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Standard,
    Advanced,
}

impl RowKind {
    pub fn type_param(&self) -> &'static str {
        match self {
            RowKind::Standard => "-1",
            RowKind::Advanced => "-2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RowKind::Standard => "standard",
            RowKind::Advanced => "advanced",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Insertion-ordered column → raw value mapping. Inserting an existing key
/// replaces its value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatRow {
    entries: Vec<(String, String)>,
}

impl StatRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Apply `other` on top of `self`; on key collision `other` wins.
    pub fn merge(&mut self, other: StatRow) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StatRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = StatRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

// ---------------------------------------------------------------------------
// Tasks and outcomes
// ---------------------------------------------------------------------------

/// One unit of work: a player over one resolved rolling window.
#[derive(Debug, Clone)]
pub struct Task {
    pub player: Player,
    pub timeframe: Timeframe,
    pub range: DateRange,
    pub meta: PlayerMetadata,
}

/// Merged standard + advanced totals for one (player, timeframe).
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub player_id: PlayerId,
    pub player_name: String,
    pub timeframe: Timeframe,
    pub meta: PlayerMetadata,
    pub stats: StatRow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub player_id: PlayerId,
    pub player_name: String,
    pub timeframe: Timeframe,
    pub meta: PlayerMetadata,
    pub error: String,
}

impl ErrorRecord {
    pub fn for_task(task: &Task, error: impl Into<String>) -> Self {
        ErrorRecord {
            player_id: task.player.id.clone(),
            player_name: task.player.name.clone(),
            timeframe: task.timeframe,
            meta: task.meta.clone(),
            error: error.into(),
        }
    }
}

// Output column names for identity and metadata fields.
pub const COL_PLAYER_NAME: &str = "player_name";
pub const COL_PLAYER_ID: &str = "player_id";
pub const COL_TIMEFRAME: &str = "timeframe";
pub const COL_LEVEL: &str = "aLevel";
pub const COL_AGE: &str = "Age";
pub const COL_TEAM: &str = "TeamName";
pub const COL_ERROR: &str = "error";

/// Leading columns shared by the leaderboard and diagnostics files.
pub const IDENTITY_COLUMNS: [&str; 6] = [
    COL_PLAYER_NAME,
    COL_PLAYER_ID,
    COL_TIMEFRAME,
    COL_LEVEL,
    COL_AGE,
    COL_TEAM,
];

fn identity_row(
    id: &PlayerId,
    name: &str,
    timeframe: Timeframe,
    meta: &PlayerMetadata,
) -> StatRow {
    let mut row = StatRow::new();
    row.insert(COL_PLAYER_NAME, name);
    row.insert(COL_PLAYER_ID, id.as_str());
    row.insert(COL_TIMEFRAME, timeframe.label());
    row.insert(COL_LEVEL, meta.level.as_str());
    row.insert(COL_AGE, meta.age.as_str());
    row.insert(COL_TEAM, meta.team.as_str());
    row
}

impl SummaryRecord {
    /// Flatten into one output row: identity and metadata first, then the
    /// merged stat columns, which win on any name collision.
    pub fn to_row(&self) -> StatRow {
        let mut row = identity_row(&self.player_id, &self.player_name, self.timeframe, &self.meta);
        row.merge(self.stats.clone());
        row
    }
}

impl ErrorRecord {
    pub fn to_row(&self) -> StatRow {
        let mut row = identity_row(&self.player_id, &self.player_name, self.timeframe, &self.meta);
        row.insert(COL_ERROR, self.error.as_str());
        row
    }
}

/// Result of running one task. Exactly one variant per task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Summary(SummaryRecord),
    Error(ErrorRecord),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
