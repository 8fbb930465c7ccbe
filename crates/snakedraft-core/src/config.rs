// Configuration loading and parsing (config/draft.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::draft::pick::Position;
use crate::valuation::scoring::{default_strategies, BotStrategy, ScoringConfig};

pub const CONFIG_FILE: &str = "draft.toml";

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

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub engine: EngineConfig,
    pub scoring: ScoringConfig,
    pub bot_strategies: Vec<BotStrategy>,
    /// Directory relative paths in the file are resolved against.
    pub base_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draft.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    server: ServerConfig,
    storage: StorageConfig,
    catalog: CatalogConfig,
    #[serde(default)]
    engine: EngineConfig,
    /// Position abbreviation -> maximum players per roster.
    #[serde(default)]
    roster: Option<HashMap<String, u32>>,
    #[serde(default)]
    scoring: ScoringSection,
    #[serde(default)]
    bot_strategies: Vec<BotStrategy>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Write logs to `logs/` instead of stderr.
    #[serde(default)]
    pub log_to_file: bool,
    /// Run the in-process autopick scheduler.
    #[serde(default = "default_true")]
    pub scheduler_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub mode: StorageMode,
    /// SQLite file. Empty means the platform data directory.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// CSV file with columns `id,name,position,team,projection,adp`.
    pub players: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_commit_attempts: u32,
    pub retry_backoff_ms: u64,
    pub bot_min_interval_secs: u64,
    pub scheduler_interval_ms: u64,
    pub late_round_threshold: u32,
    /// Ephemeral drafts older than this are purged by the scheduler.
    pub ephemeral_ttl_hours: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            retry_backoff_ms: 100,
            bot_min_interval_secs: 5,
            scheduler_interval_ms: 1000,
            late_round_threshold: 3,
            ephemeral_ttl_hours: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ScoringSection {
    position_values: HashMap<String, f64>,
    filled_penalty: Option<f64>,
    late_round_bonus: Option<f64>,
    tiebreak_scale: Option<f64>,
}

impl StorageConfig {
    /// Absolute location of the SQLite file.
    pub fn resolved_path(&self, base_dir: &Path) -> Result<PathBuf, ConfigError> {
        if self.path.trim().is_empty() {
            let dirs = directories::ProjectDirs::from("", "", "snakedraft").ok_or_else(|| {
                invalid("storage.path", "empty and no platform data directory available")
            })?;
            return Ok(dirs.data_dir().join("snakedraft.db"));
        }
        Ok(base_dir.join(&self.path))
    }
}

impl Config {
    pub fn players_path(&self) -> PathBuf {
        self.base_dir.join(&self.catalog.players)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/draft.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()` for normal startup.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: DraftFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let scoring = build_scoring(&file)?;
    let custom_strategies = !file.bot_strategies.is_empty();
    let bot_strategies = if custom_strategies {
        file.bot_strategies.clone()
    } else {
        default_strategies()
    };

    let mut config = Config {
        server: file.server,
        storage: file.storage,
        catalog: file.catalog,
        engine: file.engine,
        scoring,
        bot_strategies,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    if custom_strategies {
        config.bot_strategies = config
            .bot_strategies
            .into_iter()
            .map(BotStrategy::normalized)
            .collect();
    }
    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
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
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Copy missing defaults, then load from `base_dir`.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
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

fn parse_position(field: &str, key: &str) -> Result<Position, ConfigError> {
    Position::from_str_pos(key)
        .ok_or_else(|| invalid(format!("{field}.{key}"), "unknown position"))
}

fn build_scoring(file: &DraftFile) -> Result<ScoringConfig, ConfigError> {
    let mut scoring = ScoringConfig::default();

    if let Some(roster) = &file.roster {
        scoring.position_limits = roster
            .iter()
            .map(|(key, &limit)| -> Result<(Position, u32), ConfigError> {
                Ok((parse_position("roster", key)?, limit))
            })
            .collect::<Result<_, _>>()?;
    }
    for (key, &value) in &file.scoring.position_values {
        scoring
            .position_values
            .insert(parse_position("scoring.position_values", key)?, value);
    }
    if let Some(penalty) = file.scoring.filled_penalty {
        scoring.filled_penalty = penalty;
    }
    if let Some(bonus) = file.scoring.late_round_bonus {
        scoring.late_round_bonus = bonus;
    }
    if let Some(scale) = file.scoring.tiebreak_scale {
        scoring.tiebreak_scale = scale;
    }
    scoring.late_round_threshold = file.engine.late_round_threshold;
    Ok(scoring)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.bind.trim().is_empty() {
        return Err(invalid("server.bind", "must not be empty"));
    }
    if config.storage.mode == StorageMode::Sqlite
        && config.storage.path.trim() == ":memory:"
    {
        return Err(invalid(
            "storage.path",
            "use mode = \"memory\" for ephemeral drafts",
        ));
    }
    if config.catalog.players.trim().is_empty() {
        return Err(invalid("catalog.players", "must not be empty"));
    }

    let engine = &config.engine;
    if engine.max_commit_attempts == 0 {
        return Err(invalid("engine.max_commit_attempts", "must be at least 1"));
    }
    if engine.retry_backoff_ms > 10_000 {
        return Err(invalid(
            "engine.retry_backoff_ms",
            format!("must be at most 10000, got {}", engine.retry_backoff_ms),
        ));
    }
    if engine.scheduler_interval_ms == 0 {
        return Err(invalid("engine.scheduler_interval_ms", "must be greater than 0"));
    }

    let scoring = &config.scoring;
    if scoring.position_limits.values().all(|&limit| limit == 0) {
        return Err(invalid("roster", "at least one position needs a limit above 0"));
    }
    for (pos, value) in &scoring.position_values {
        if !value.is_finite() || *value <= 0.0 {
            return Err(invalid(
                format!("scoring.position_values.{pos}"),
                format!("must be > 0, got {value}"),
            ));
        }
    }
    if !(scoring.filled_penalty < 0.0) {
        return Err(invalid(
            "scoring.filled_penalty",
            format!("must be negative, got {}", scoring.filled_penalty),
        ));
    }
    if !(scoring.late_round_bonus >= 0.0) {
        return Err(invalid(
            "scoring.late_round_bonus",
            format!("must be >= 0, got {}", scoring.late_round_bonus),
        ));
    }
    if !(scoring.tiebreak_scale > 0.0 && scoring.tiebreak_scale < 0.01) {
        return Err(invalid(
            "scoring.tiebreak_scale",
            format!(
                "must be between 0 and 0.01 exclusive, got {}",
                scoring.tiebreak_scale
            ),
        ));
    }

    for (i, s) in config.bot_strategies.iter().enumerate() {
        let weights = [s.w_rank, s.w_scarcity, s.w_adp];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid(
                format!("bot_strategies[{i}]"),
                "weights must be finite and non-negative",
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(invalid(
                format!("bot_strategies[{i}]"),
                "weights must not all be zero",
            ));
        }
    }

    Ok(())
}
