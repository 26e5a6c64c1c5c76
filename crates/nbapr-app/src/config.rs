// Configuration loading and parsing (config/simulation.toml).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use nbapr_core::SimulationConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::fetch::PerMode;
use crate::output::OutputFormat;
use crate::stats::CleanOptions;

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
    pub simulation: SimulationConfig,
    pub league: LeagueConfig,
    pub pool: PoolConfig,
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// simulation.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire simulation.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    simulation: SimulationConfig,
    league: LeagueSection,
    pool: PoolConfig,
    #[serde(default)]
    output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct LeagueSection {
    preset: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default = "default_weight_column")]
    weight_column: String,
}

fn default_weight_column() -> String {
    "probs".to_string()
}

/// Category league formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaguePreset {
    EightCat,
    NineCat,
    /// Nine categories with free throws made in place of free-throw percentage.
    Tim,
    Custom,
}

/// Eight-category head-to-head: percentages enter as volume-weighted columns.
pub const EIGHT_CAT: &[&str] = &["WFGP", "WFTP", "FG3M", "REB", "AST", "STL", "BLK", "PTS"];

/// Eight categories plus (negated) turnovers.
pub const NINE_CAT: &[&str] = &["WFGP", "WFTP", "FG3M", "REB", "AST", "STL", "BLK", "TOV", "PTS"];

pub const TIM: &[&str] = &["WFGP", "FTM", "FG3M", "REB", "AST", "STL", "BLK", "TOV", "PTS"];

impl LeaguePreset {
    /// Category columns of the preset; empty for `Custom`.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            LeaguePreset::EightCat => EIGHT_CAT,
            LeaguePreset::NineCat => NINE_CAT,
            LeaguePreset::Tim => TIM,
            LeaguePreset::Custom => &[],
        }
    }
}

impl FromStr for LeaguePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "8cat" => Ok(LeaguePreset::EightCat),
            "9cat" => Ok(LeaguePreset::NineCat),
            "tim" => Ok(LeaguePreset::Tim),
            "custom" => Ok(LeaguePreset::Custom),
            other => Err(format!("unknown preset `{other}`, expected 8cat, 9cat, tim or custom")),
        }
    }
}

/// Resolved league scoring settings.
#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub preset: LeaguePreset,
    pub categories: Vec<String>,
    pub weight_column: String,
}

/// Where the player pool comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSource {
    File,
    Web,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub source: PoolSource,
    #[serde(default)]
    pub path: Option<String>,
    /// Season code (`2020-21`); defaults to the season in progress.
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default = "default_per_mode")]
    pub per_mode: PerMode,
    #[serde(default)]
    pub last_n: u32,
    /// Only count games on or after this date (`"2021-01-15"`).
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub min_games: f64,
    #[serde(default)]
    pub min_minutes: f64,
    #[serde(default = "default_true")]
    pub filter_below_mean: bool,
}

fn default_per_mode() -> PerMode {
    PerMode::Totals
}

fn default_true() -> bool {
    true
}

impl PoolConfig {
    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            min_games: self.min_games,
            min_minutes: self.min_minutes,
            filter_below_mean: self.filter_below_mean,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
    /// Report ranks relative to an average team.
    #[serde(default)]
    pub vorp: bool,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_max_rows() -> usize {
    100
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: None,
            format: OutputFormat::default(),
            vorp: false,
            max_rows: default_max_rows(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/simulation.toml` relative to
/// `base_dir`. Does not copy defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("simulation.toml");
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    parse_config(&text).map_err(|e| match e {
        ParseFailure::Toml(source) => ConfigError::ParseError { path, source },
        ParseFailure::Invalid(err) => err,
    })
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(ConfigError),
}

fn parse_config(text: &str) -> Result<Config, ParseFailure> {
    let file: ConfigFile = toml::from_str(text).map_err(ParseFailure::Toml)?;
    assemble(file).map_err(ParseFailure::Invalid)
}

fn assemble(file: ConfigFile) -> Result<Config, ConfigError> {
    let simulation = file.simulation;

    let preset = LeaguePreset::from_str(&file.league.preset).map_err(|message| {
        ConfigError::ValidationError {
            field: "league.preset".into(),
            message,
        }
    })?;
    let categories = match preset {
        LeaguePreset::Custom => file.league.categories,
        _ => preset.categories().iter().map(|c| c.to_string()).collect(),
    };
    let league = LeagueConfig {
        preset,
        categories,
        weight_column: file.league.weight_column,
    };

    let config = Config {
        simulation,
        league,
        pool: file.pool,
        output: file.output,
    };
    validate(&config)?;
    Ok(config)
}

/// Ensure `config/simulation.toml` exists by copying it from `defaults/`.
/// Returns the files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let source = defaults_dir.join("simulation.toml");
    let target = config_dir.join("simulation.toml");
    if target.exists() || !source.exists() {
        return Ok(vec![]);
    }
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;
    Ok(vec![target])
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validation(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let sim = &config.simulation;
    let sizes: &[(&str, usize)] = &[
        ("simulation.n_iterations", sim.n_iterations),
        ("simulation.n_teams", sim.n_teams),
        ("simulation.n_players", sim.n_players),
        ("simulation.workers", sim.workers),
    ];
    for (name, val) in sizes {
        if *val == 0 {
            return Err(validation(name, "must be greater than 0"));
        }
    }

    if config.league.categories.is_empty() {
        return Err(validation(
            "league.categories",
            "custom preset requires at least one category",
        ));
    }
    if config.league.weight_column.trim().is_empty() {
        return Err(validation("league.weight_column", "must not be empty"));
    }

    let pool = &config.pool;
    if pool.source == PoolSource::File && pool.path.as_deref().map_or(true, str::is_empty) {
        return Err(validation("pool.path", "required when pool.source = \"file\""));
    }
    if pool.min_games < 0.0 || pool.min_minutes < 0.0 {
        return Err(validation("pool.min_games", "thresholds must be >= 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
