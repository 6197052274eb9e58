//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/focus-insights/config.toml`.
//! Every section is optional; a missing file means all defaults.
//!
//! Directories follow XDG:
//! - Config: `$XDG_CONFIG_HOME/focus-insights/`
//! - State/Logs: `$XDG_STATE_HOME/focus-insights/`
//! - Database: `~/.focus-insights/insights.db` unless overridden

use crate::error::{InsightError, Result};
use std::ops::RangeInclusive;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "focus-insights";

/// Accepted ranges for the duration and confidence knobs
const DAYS: RangeInclusive<i64> = 1..=3650;
const HOURS: RangeInclusive<i64> = 1..=8760;
const UNIT: RangeInclusive<f64> = 0.0..=1.0;

fn check<T>(name: &str, value: T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(InsightError::Config(format!(
            "{} = {} is out of range ({}..={})",
            name,
            value,
            range.start(),
            range.end()
        )))
    }
}

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub suggestions: SuggestionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Knobs for the pattern analyzer
///
/// Passed into the analyzer explicitly so tests can vary thresholds.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fewer supporting events than this and an extractor stays silent
    pub min_sample_size: u32,
    /// Results below this confidence are not persisted
    pub confidence_threshold: f64,
    /// Trailing window of events to analyze
    pub window_days: i64,
    /// How long a saved insight stays live without being refreshed
    pub insight_ttl_days: i64,
    /// Upper bound on events pulled into one run
    pub max_events: i64,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        check("analysis.min_sample_size", self.min_sample_size, &(1..=u32::MAX))?;
        check("analysis.confidence_threshold", self.confidence_threshold, &UNIT)?;
        check("analysis.window_days", self.window_days, &DAYS)?;
        check("analysis.insight_ttl_days", self.insight_ttl_days, &DAYS)?;
        check("analysis.max_events", self.max_events, &(1..=i64::MAX))
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 5,
            confidence_threshold: 0.6,
            window_days: 30,
            insight_ttl_days: 30,
            max_events: 5000,
        }
    }
}

/// Knobs for the suggestion generators
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SuggestionConfig {
    pub default_ttl_hours: i64,
    /// Focus picks go stale with the time of day
    pub focus_ttl_hours: i64,
    pub stale_after_days: i64,
    pub stale_rollover_threshold: u32,
    /// A block with more open tasks than this is overloaded
    pub overload_threshold: usize,
    /// Project timing insights must beat this to move a task
    pub mismatch_confidence: f64,
    pub max_runners_up: usize,
}

impl SuggestionConfig {
    pub fn validate(&self) -> Result<()> {
        check("suggestions.default_ttl_hours", self.default_ttl_hours, &HOURS)?;
        check("suggestions.focus_ttl_hours", self.focus_ttl_hours, &HOURS)?;
        check("suggestions.stale_after_days", self.stale_after_days, &DAYS)?;
        check("suggestions.mismatch_confidence", self.mismatch_confidence, &UNIT)
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            default_ttl_hours: 24,
            focus_ttl_hours: 4,
            stale_after_days: 7,
            stale_rollover_threshold: 3,
            overload_threshold: 5,
            mismatch_confidence: 0.6,
            max_runners_up: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Override for the database file location
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file. Missing file → defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the analyzer and generators cannot run with
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.suggestions.validate()
    }

    pub fn config_dir() -> PathBuf {
        xdg_config_home().join(APP_DIR)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Where log files go
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("focus-insights.log")
    }

    /// Database file, honoring the `[database] path` override
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| home_dir().join(".focus-insights").join("insights.db"))
    }
}
