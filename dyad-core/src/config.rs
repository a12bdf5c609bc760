//! Configuration loading and management
//!
//! Every threshold the analyzers use lives here so tests can exercise
//! boundary values without patching globals. Configuration is loaded from
//! `~/.config/dyad/config.toml` when present; defaults otherwise.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/dyad/` (~/.config/dyad/)
//! - State/Logs: `$XDG_STATE_HOME/dyad/` (~/.local/state/dyad/)

use crate::analysis::percentile::PercentileStrategy;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

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

/// Main configuration struct passed into every analyzer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnalysisConfig {
    /// Session segmentation thresholds
    #[serde(default)]
    pub session: SessionConfig,

    /// Response-time statistics thresholds
    #[serde(default)]
    pub timing: TimingConfig,

    /// Conflict detector thresholds
    #[serde(default)]
    pub conflict: ConflictConfig,

    /// Pursuit-withdrawal detector thresholds
    #[serde(default)]
    pub pursuit: PursuitConfig,

    /// Catchphrase extraction thresholds
    #[serde(default)]
    pub phrases: PhraseConfig,

    /// Activity pattern thresholds
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Badge cutoffs
    #[serde(default)]
    pub badges: BadgeConfig,

    /// Response-time percentile ranking strategy
    #[serde(default)]
    pub percentile: PercentileStrategy,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session segmentation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Gap between consecutive messages that starts a new session (ms)
    #[serde(default = "default_session_gap_ms")]
    pub gap_ms: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gap_ms: default_session_gap_ms(),
        }
    }
}

fn default_session_gap_ms() -> i64 {
    21_600_000 // 6 hours
}

/// Response-time statistics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Outlier cutoff is Q3 + multiplier * IQR
    #[serde(default = "default_outlier_iqr_multiplier")]
    pub outlier_iqr_multiplier: f64,

    /// Minimum IQR (ms) before the multiplier is applied
    #[serde(default = "default_min_iqr_floor_ms")]
    pub min_iqr_floor_ms: i64,

    /// Outlier filtering is skipped below this sample size
    #[serde(default = "default_min_filter_sample_size")]
    pub min_filter_sample_size: usize,

    /// Fraction trimmed from each tail for the trimmed mean
    #[serde(default = "default_trim_fraction")]
    pub trim_fraction: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            outlier_iqr_multiplier: default_outlier_iqr_multiplier(),
            min_iqr_floor_ms: default_min_iqr_floor_ms(),
            min_filter_sample_size: default_min_filter_sample_size(),
            trim_fraction: default_trim_fraction(),
        }
    }
}

fn default_outlier_iqr_multiplier() -> f64 {
    3.0
}

fn default_min_iqr_floor_ms() -> i64 {
    60_000
}

fn default_min_filter_sample_size() -> usize {
    5
}

fn default_trim_fraction() -> f64 {
    0.1
}

/// Conflict detector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConflictConfig {
    /// Rolling intensity window (messages)
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// Escalation fires when intensity exceeds this multiple of the rolling average
    #[serde(default = "default_escalation_ratio")]
    pub escalation_ratio: f64,

    /// Number of trailing messages inspected for back-and-forth exchange
    #[serde(default = "default_alternation_window")]
    pub alternation_window: usize,

    /// Minimum sender alternations within the alternation window
    #[serde(default = "default_min_alternations")]
    pub min_alternations: usize,

    /// The alternation window must fit within this span to count as rapid (ms)
    #[serde(default = "default_rapid_exchange_span_ms")]
    pub rapid_exchange_span_ms: i64,

    /// Cold silence requires a gap of at least this (ms)
    #[serde(default = "default_cold_silence_gap_ms")]
    pub cold_silence_gap_ms: i64,

    /// Lookback window before a cold silence (ms)
    #[serde(default = "default_cold_lookback_ms")]
    pub cold_lookback_ms: i64,

    /// Minimum messages within the lookback window
    #[serde(default = "default_cold_lookback_min_messages")]
    pub cold_lookback_min_messages: usize,

    /// Resolution burst must arrive within this window after a cold silence (ms)
    #[serde(default = "default_resolution_window_ms")]
    pub resolution_window_ms: i64,

    /// Resolution requires strictly more than this many short messages
    #[serde(default = "default_resolution_burst")]
    pub resolution_burst: usize,

    /// A "short" message has at most this many words
    #[serde(default = "default_resolution_max_words")]
    pub resolution_max_words: usize,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            escalation_ratio: default_escalation_ratio(),
            alternation_window: default_alternation_window(),
            min_alternations: default_min_alternations(),
            rapid_exchange_span_ms: default_rapid_exchange_span_ms(),
            cold_silence_gap_ms: default_cold_silence_gap_ms(),
            cold_lookback_ms: default_cold_lookback_ms(),
            cold_lookback_min_messages: default_cold_lookback_min_messages(),
            resolution_window_ms: default_resolution_window_ms(),
            resolution_burst: default_resolution_burst(),
            resolution_max_words: default_resolution_max_words(),
        }
    }
}

fn default_rolling_window() -> usize {
    15
}

fn default_escalation_ratio() -> f64 {
    1.6
}

fn default_alternation_window() -> usize {
    6
}

fn default_min_alternations() -> usize {
    4
}

fn default_rapid_exchange_span_ms() -> i64 {
    1_800_000 // 30 minutes
}

fn default_cold_silence_gap_ms() -> i64 {
    43_200_000 // 12 hours
}

fn default_cold_lookback_ms() -> i64 {
    21_600_000 // 6 hours
}

fn default_cold_lookback_min_messages() -> usize {
    5
}

fn default_resolution_window_ms() -> i64 {
    14_400_000 // 4 hours
}

fn default_resolution_burst() -> usize {
    3
}

fn default_resolution_max_words() -> usize {
    8
}

/// Pursuit-withdrawal detector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PursuitConfig {
    /// Consecutive messages from one sender that form a pursuit burst
    #[serde(default = "default_pursuit_burst_size")]
    pub burst_size: usize,

    /// Pursuit burst must fit within this window (ms)
    #[serde(default = "default_pursuit_window_ms")]
    pub window_ms: i64,

    /// Silence after a burst that counts as withdrawal (ms)
    #[serde(default = "default_withdrawal_silence_ms")]
    pub withdrawal_silence_ms: i64,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            burst_size: default_pursuit_burst_size(),
            window_ms: default_pursuit_window_ms(),
            withdrawal_silence_ms: default_withdrawal_silence_ms(),
        }
    }
}

fn default_pursuit_burst_size() -> usize {
    4
}

fn default_pursuit_window_ms() -> i64 {
    7_200_000 // 2 hours
}

fn default_withdrawal_silence_ms() -> i64 {
    21_600_000 // 6 hours
}

/// Catchphrase extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PhraseConfig {
    /// Personal catchphrase requires at least this many occurrences
    #[serde(default = "default_phrase_min_count")]
    pub min_count: usize,

    /// Personal catchphrase requires at least this share of global occurrences
    #[serde(default = "default_phrase_min_uniqueness")]
    pub min_uniqueness: f64,

    /// Shared phrase requires at least this many global occurrences
    #[serde(default = "default_shared_min_global")]
    pub shared_min_global: usize,

    /// Shared phrase requires at least two contributors with this many each
    #[serde(default = "default_shared_min_per_contributor")]
    pub shared_min_per_contributor: usize,

    /// Shared phrase disqualified when one contributor reaches this share
    #[serde(default = "default_shared_dominance_cap")]
    pub shared_dominance_cap: f64,

    /// Catchphrases reported per person
    #[serde(default = "default_top_per_person")]
    pub top_per_person: usize,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            min_count: default_phrase_min_count(),
            min_uniqueness: default_phrase_min_uniqueness(),
            shared_min_global: default_shared_min_global(),
            shared_min_per_contributor: default_shared_min_per_contributor(),
            shared_dominance_cap: default_shared_dominance_cap(),
            top_per_person: default_top_per_person(),
        }
    }
}

fn default_phrase_min_count() -> usize {
    3
}

fn default_phrase_min_uniqueness() -> f64 {
    0.5
}

fn default_shared_min_global() -> usize {
    5
}

fn default_shared_min_per_contributor() -> usize {
    2
}

fn default_shared_dominance_cap() -> f64 {
    0.7
}

fn default_top_per_person() -> usize {
    8
}

/// Activity pattern configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    /// Burst windows require daily volume above this multiple of the average
    #[serde(default = "default_burst_multiplier")]
    pub burst_multiplier: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            burst_multiplier: default_burst_multiplier(),
        }
    }
}

fn default_burst_multiplier() -> f64 {
    2.0
}

/// Badge cutoffs
///
/// Absolute counts, identical for a short conversation and a multi-year
/// one; they are never scaled to conversation length or volume.
#[derive(Debug, Clone, Deserialize)]
pub struct BadgeConfig {
    /// Streak Master: longest daily streak must exceed this many days
    #[serde(default = "default_streak_days")]
    pub streak_days: i64,

    /// Double Texter: at least this many double-texts
    #[serde(default = "default_badge_double_texts")]
    pub double_texts: usize,

    /// Conversation Starter: at least this many session initiations
    #[serde(default = "default_badge_initiations")]
    pub initiations: usize,

    /// Night Owl / Early Bird: at least this many messages in the window
    #[serde(default = "default_badge_window_messages")]
    pub window_messages: u64,

    /// Novelist: mean message length in characters
    #[serde(default = "default_novelist_avg_chars")]
    pub novelist_avg_chars: f64,

    /// Novelist: minimum messages sent
    #[serde(default = "default_novelist_min_messages")]
    pub novelist_min_messages: usize,

    /// Reactor / Crowd Favorite: at least this many reactions
    #[serde(default = "default_badge_reactions")]
    pub reactions: usize,

    /// Rapid Responder: median reply latency at most this (ms)
    #[serde(default = "default_rapid_median_ms")]
    pub rapid_median_ms: f64,

    /// Rapid Responder: minimum reply sample
    #[serde(default = "default_rapid_min_samples")]
    pub rapid_min_samples: usize,

    /// Marathoner: messages sent within a single session
    #[serde(default = "default_marathon_messages")]
    pub marathon_messages: usize,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            streak_days: default_streak_days(),
            double_texts: default_badge_double_texts(),
            initiations: default_badge_initiations(),
            window_messages: default_badge_window_messages(),
            novelist_avg_chars: default_novelist_avg_chars(),
            novelist_min_messages: default_novelist_min_messages(),
            reactions: default_badge_reactions(),
            rapid_median_ms: default_rapid_median_ms(),
            rapid_min_samples: default_rapid_min_samples(),
            marathon_messages: default_marathon_messages(),
        }
    }
}

fn default_streak_days() -> i64 {
    14
}

fn default_badge_double_texts() -> usize {
    30
}

fn default_badge_initiations() -> usize {
    25
}

fn default_badge_window_messages() -> u64 {
    100
}

fn default_novelist_avg_chars() -> f64 {
    80.0
}

fn default_novelist_min_messages() -> usize {
    200
}

fn default_badge_reactions() -> usize {
    100
}

fn default_rapid_median_ms() -> f64 {
    60_000.0
}

fn default_rapid_min_samples() -> usize {
    20
}

fn default_marathon_messages() -> usize {
    100
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AnalysisConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(AnalysisConfig::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: AnalysisConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.session.gap_ms <= 0 {
            return Err(Error::Config("session.gap_ms must be positive".to_string()));
        }
        if !(0.0..0.5).contains(&self.timing.trim_fraction) {
            return Err(Error::Config(
                "timing.trim_fraction must be in [0, 0.5)".to_string(),
            ));
        }
        if self.conflict.rolling_window == 0 {
            return Err(Error::Config(
                "conflict.rolling_window must be at least 1".to_string(),
            ));
        }
        if self.pursuit.burst_size < 2 {
            return Err(Error::Config(
                "pursuit.burst_size must be at least 2".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.phrases.min_uniqueness) {
            return Err(Error::Config(
                "phrases.min_uniqueness must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/dyad/config.toml` (~/.config/dyad/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("dyad").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/dyad/` (~/.local/state/dyad/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("dyad")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/dyad/dyad.log` (~/.local/state/dyad/dyad.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("dyad.log")
    }
}
