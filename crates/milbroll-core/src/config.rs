// Configuration loading and parsing (config/scrape.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::model::Timeframe;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub scrape: ScrapeConfig,
    pub output: OutputConfig,
    pub views: Vec<DatasetView>,
}

/// Stat group requested from the leaderboard API (`stats=` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatGroup {
    Batting,
    Pitching,
}

impl StatGroup {
    pub fn param(&self) -> &'static str {
        match self {
            StatGroup::Batting => "bat",
            StatGroup::Pitching => "pit",
        }
    }

    pub fn from_param(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bat" => Some(StatGroup::Batting),
            "pit" => Some(StatGroup::Pitching),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub roster_url: String,
    pub player_base_url: String,
    pub user_agent: String,
    pub levels: Vec<u32>,
    pub leagues: String,
    pub stats: StatGroup,
    pub qual: u32,
    pub season: u16,
    pub position: String,
    pub page_size_warning: usize,
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub workers: usize,
    pub request_timeout_secs: u64,
    pub timeframes: Vec<Timeframe>,
}

impl ScrapeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub leaderboard: String,
    pub full_season: String,
    pub errors: String,
    #[serde(default)]
    pub log_to_file: bool,
}

// ---------------------------------------------------------------------------
// Dataset views
// ---------------------------------------------------------------------------

/// Declarative description of one dashboard table: which output file it
/// reads, which columns it shows, how it sorts, and which filters it offers.
/// Only loaded and validated here; rendering belongs to the consumer.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatasetView {
    pub name: String,
    pub source: String,
    pub columns: Vec<String>,
    pub sort_by: String,
    #[serde(default)]
    pub descending: bool,
    #[serde(default)]
    pub filters: Vec<ViewFilter>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ViewFilter {
    pub column: String,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Range,
    Multi,
    Text,
}

// ---------------------------------------------------------------------------
// scrape.toml raw structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire scrape.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ScrapeFile {
    source: SourceSection,
    scrape: ScrapeSection,
    output: OutputConfig,
    #[serde(default)]
    views: Vec<DatasetView>,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceSection {
    roster_url: String,
    player_base_url: String,
    user_agent: String,
    levels: Vec<u32>,
    leagues: String,
    stats: String,
    qual: u32,
    season: u16,
    #[serde(default = "default_position")]
    position: String,
    #[serde(default)]
    page_size_warning: usize,
}

fn default_position() -> String {
    "OF".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct ScrapeSection {
    workers: usize,
    request_timeout_secs: u64,
    timeframes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/scrape.toml` relative to the
/// given `base_dir`. Does not copy defaults; see `load_config_in`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("scrape.toml");
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Parse and validate scrape.toml contents. `path` is only used in errors.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ScrapeFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let stats = StatGroup::from_param(&file.source.stats).ok_or_else(|| {
        ConfigError::ValidationError {
            field: "source.stats".into(),
            message: format!("must be \"bat\" or \"pit\", got {:?}", file.source.stats),
        }
    })?;

    let mut timeframes = Vec::with_capacity(file.scrape.timeframes.len());
    for label in &file.scrape.timeframes {
        let tf = Timeframe::from_label(label).ok_or_else(|| ConfigError::ValidationError {
            field: "scrape.timeframes".into(),
            message: format!("unknown timeframe {label:?}"),
        })?;
        if !timeframes.contains(&tf) {
            timeframes.push(tf);
        }
    }

    let config = Config {
        source: SourceConfig {
            roster_url: file.source.roster_url,
            player_base_url: file.source.player_base_url,
            user_agent: file.source.user_agent,
            levels: file.source.levels,
            leagues: file.source.leagues,
            stats,
            qual: file.source.qual,
            season: file.source.season,
            position: file.source.position,
            page_size_warning: file.source.page_size_warning,
        },
        scrape: ScrapeConfig {
            workers: file.scrape.workers,
            request_timeout_secs: file.scrape.request_timeout_secs,
            timeframes,
        },
        output: file.output,
        views: file.views,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/scrape.toml` exists by copying it from `defaults/`.
/// Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() || !path.extension().is_some_and(|ext| ext == "toml") {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        info!(path = %target.display(), "copied default config");
        copied.push(target);
    }

    Ok(copied)
}

/// Copy defaults if needed, then load config relative to `base_dir`.
pub fn load_config_in(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check cross-field invariants. Public so callers can re-validate after
/// applying command-line overrides.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.source.levels.is_empty() {
        return Err(invalid("source.levels", "must list at least one level"));
    }
    if config.source.roster_url.trim().is_empty() {
        return Err(invalid("source.roster_url", "must not be empty"));
    }
    if config.source.player_base_url.trim().is_empty() {
        return Err(invalid("source.player_base_url", "must not be empty"));
    }

    if config.scrape.workers == 0 {
        return Err(invalid("scrape.workers", "must be greater than 0"));
    }
    if config.scrape.request_timeout_secs == 0 {
        return Err(invalid("scrape.request_timeout_secs", "must be greater than 0"));
    }
    if config.scrape.timeframes.is_empty() {
        return Err(invalid("scrape.timeframes", "must list at least one timeframe"));
    }

    let outputs: &[(&str, &str)] = &[
        ("output.leaderboard", &config.output.leaderboard),
        ("output.full_season", &config.output.full_season),
        ("output.errors", &config.output.errors),
    ];
    for (name, val) in outputs {
        if val.trim().is_empty() {
            return Err(invalid(name, "must not be empty"));
        }
    }

    for (i, view) in config.views.iter().enumerate() {
        if view.name.trim().is_empty() {
            return Err(invalid(&format!("views[{i}].name"), "must not be empty"));
        }
        if !view.columns.contains(&view.sort_by) {
            return Err(invalid(
                &format!("views[{i}].sort_by"),
                format!("sort column {:?} is not in columns", view.sort_by),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
