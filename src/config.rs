//! Configuration loading for Lexis.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.lexis/config.toml`)
//! 3. User config (`~/.lexis/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, LexisError, Result};
use crate::milestones::{default_tiers, MilestoneEvaluator, Tier};
use crate::util::{read_to_string_limited, write_atomic};

/// Main configuration struct for Lexis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Session lifecycle settings.
    pub session: SessionConfig,
    /// XP awarded and deducted by sessions.
    pub xp: XpConfig,
    /// Milestone ladder.
    pub milestones: MilestonesConfig,
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Fewest words a session may start with.
    pub min_words: usize,
    /// Feedback window the UI shows before advancing, in milliseconds.
    pub feedback_delay_ms: u64,
    /// Inactivity after which an open session counts as abandoned.
    pub idle_timeout_secs: u64,
}

/// Upper bound for the feedback window.
pub const MAX_FEEDBACK_DELAY_MS: u64 = 5_000;

impl SessionConfig {
    /// Inactivity window after which an open session counts as abandoned.
    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.idle_timeout_secs.min(i64::MAX as u64) as i64)
    }

    /// Check if a feedback delay is acceptable.
    pub fn is_valid_feedback_delay(value: u64) -> bool {
        value <= MAX_FEEDBACK_DELAY_MS
    }

    /// Check if a minimum word count is acceptable (at least one word).
    pub fn is_valid_min_words(value: usize) -> bool {
        value >= 1
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_words: 5,
            feedback_delay_ms: 1_000,
            idle_timeout_secs: 15 * 60,
        }
    }
}

/// XP policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct XpConfig {
    /// XP per promotion into pass1.
    pub per_promotion: i64,
    /// XP per word mastered (pass2).
    pub per_mastered_word: i64,
    /// XP deducted when a session is abandoned.
    pub quit_penalty: i64,
}

impl XpConfig {
    /// Check if a quit penalty is acceptable (non-negative; it is subtracted).
    pub fn is_valid_quit_penalty(value: i64) -> bool {
        value >= 0
    }
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            per_promotion: 2,
            per_mastered_word: 10,
            quit_penalty: 25,
        }
    }
}

/// Milestone ladder configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MilestonesConfig {
    pub tiers: Vec<Tier>,
}

impl Default for MilestonesConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

impl MilestonesConfig {
    /// Build an evaluator, falling back to the default ladder when the
    /// configured one is not ascending.
    pub fn evaluator(&self) -> MilestoneEvaluator {
        MilestoneEvaluator::new(self.tiers.clone()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid milestone ladder, using defaults");
            MilestoneEvaluator::default()
        })
    }
}

impl Config {
    /// Load configuration with full precedence chain from the current
    /// directory.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.lexis/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = lexis_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.lexis/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_lexis_dir(cwd).join("config.toml"))
    }

    /// Load a config file if it exists, warning about unparsable ones.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .map(Some)
            .fail_open_default(&format!("ignoring config file {}", path.display()))
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = read_to_string_limited(path)?;
        toml::from_str(&content).map_err(|e| LexisError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("LEXIS_MIN_WORDS") {
            match val.parse::<usize>() {
                Ok(n) if SessionConfig::is_valid_min_words(n) => self.session.min_words = n,
                _ => tracing::warn!(
                    value = %val,
                    default = self.session.min_words,
                    "invalid LEXIS_MIN_WORDS, expected a positive integer"
                ),
            }
        }

        if let Ok(val) = env::var("LEXIS_FEEDBACK_DELAY_MS") {
            match val.parse::<u64>() {
                Ok(n) if SessionConfig::is_valid_feedback_delay(n) => {
                    self.session.feedback_delay_ms = n
                }
                _ => tracing::warn!(
                    value = %val,
                    max = MAX_FEEDBACK_DELAY_MS,
                    default = self.session.feedback_delay_ms,
                    "invalid LEXIS_FEEDBACK_DELAY_MS"
                ),
            }
        }

        if let Ok(val) = env::var("LEXIS_IDLE_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(n) => self.session.idle_timeout_secs = n,
                Err(_) => tracing::warn!(
                    value = %val,
                    default = self.session.idle_timeout_secs,
                    "invalid LEXIS_IDLE_TIMEOUT_SECS, expected a positive integer"
                ),
            }
        }

        if let Ok(val) = env::var("LEXIS_QUIT_PENALTY") {
            match val.parse::<i64>() {
                Ok(n) if XpConfig::is_valid_quit_penalty(n) => self.xp.quit_penalty = n,
                _ => tracing::warn!(
                    value = %val,
                    default = self.xp.quit_penalty,
                    "invalid LEXIS_QUIT_PENALTY, expected a non-negative integer"
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value that
    /// differs from the default overrides `self`. A layer therefore cannot
    /// reset a value back to its default once a lower layer changed it.
    fn merge(mut self, other: Config) -> Self {
        let default_session = SessionConfig::default();
        if other.session.min_words != default_session.min_words {
            self.session.min_words = other.session.min_words;
        }
        if other.session.feedback_delay_ms != default_session.feedback_delay_ms {
            self.session.feedback_delay_ms = other.session.feedback_delay_ms;
        }
        if other.session.idle_timeout_secs != default_session.idle_timeout_secs {
            self.session.idle_timeout_secs = other.session.idle_timeout_secs;
        }

        let default_xp = XpConfig::default();
        if other.xp.per_promotion != default_xp.per_promotion {
            self.xp.per_promotion = other.xp.per_promotion;
        }
        if other.xp.per_mastered_word != default_xp.per_mastered_word {
            self.xp.per_mastered_word = other.xp.per_mastered_word;
        }
        if other.xp.quit_penalty != default_xp.quit_penalty {
            self.xp.quit_penalty = other.xp.quit_penalty;
        }

        // The ladder is replaced as a whole.
        if other.milestones.tiers != default_tiers() {
            self.milestones.tiers = other.milestones.tiers;
        }

        self
    }

    /// Save configuration to the project config file.
    ///
    /// Writes `.lexis/config.toml` atomically (temp file, then rename).
    pub fn save_project(&self, cwd: &Path) -> Result<()> {
        let config_path = project_lexis_dir(cwd).join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| LexisError::config(e.to_string()))?;
        write_atomic(&config_path, content.as_bytes())
    }
}

/// Get the Lexis home directory.
///
/// Checks `LEXIS_HOME` first, then falls back to `~/.lexis`. An empty
/// `LEXIS_HOME` is ignored.
pub fn lexis_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("LEXIS_HOME") {
        if home.is_empty() {
            tracing::warn!("LEXIS_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            return Some(path.canonicalize().unwrap_or(path));
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".lexis"));
    }

    let fallback = env::temp_dir().join("lexis");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback.display()
    );
    Some(fallback)
}

/// Get the project `.lexis` directory for a working directory.
pub fn project_lexis_dir(cwd: &Path) -> PathBuf {
    cwd.join(".lexis")
}

/// Get the data directory used by the file stores.
///
/// Returns `<lexis_home>/data/`.
pub fn data_dir() -> Option<PathBuf> {
    lexis_home().map(|h| h.join("data"))
}
