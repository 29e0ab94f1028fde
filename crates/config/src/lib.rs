//! Configuration loading, validation, and management for reactkit.
//!
//! Loads configuration from `~/.reactkit/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.reactkit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway selection
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Interactive session behavior
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Status note formatting
    #[serde(default)]
    pub notes: NoteConfig,

    /// Follow-up reply collection
    #[serde(default)]
    pub replies: ReplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// "console" or "memory"
    #[serde(default = "default_gateway_kind")]
    pub kind: String,

    /// Channel the CLI posts into
    #[serde(default = "default_channel")]
    pub channel: String,

    /// User id of the local operator
    #[serde(default = "default_user")]
    pub user: String,
}

/// Gateway kinds understood by the binary and the test harness.
const GATEWAY_KINDS: &[&str] = &["console", "memory"];

fn default_gateway_kind() -> String {
    "console".into()
}
fn default_channel() -> String {
    "terminal".into()
}
fn default_user() -> String {
    "local_user".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: default_gateway_kind(),
            channel: default_channel(),
            user: default_user(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a paged viewer's control subscriptions
    #[serde(default = "default_paged_ttl")]
    pub paged_ttl_secs: u64,

    /// Lifetime of a rating widget's control subscriptions
    #[serde(default = "default_rating_ttl")]
    pub rating_ttl_secs: u64,

    /// Pending reactions buffered per session
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Append "Page i/n" to embed footers
    #[serde(default = "default_true")]
    pub page_footer: bool,

    /// Rating applied by a flag vote
    #[serde(default = "default_flag_delta")]
    pub flag_delta: i64,

    /// Note emitted after a flag vote
    #[serde(default = "default_flag_note")]
    pub flag_note: String,

    #[serde(default)]
    pub controls: ControlEmojis,
}

fn default_paged_ttl() -> u64 {
    120
}
fn default_rating_ttl() -> u64 {
    300
}
fn default_queue_capacity() -> usize {
    32
}
fn default_flag_delta() -> i64 {
    -1000
}
fn default_flag_note() -> String {
    "Let me clean that 💩 for you".into()
}
fn default_true() -> bool {
    true
}

impl SessionConfig {
    pub fn paged_ttl(&self) -> Duration {
        Duration::from_secs(self.paged_ttl_secs)
    }

    pub fn rating_ttl(&self) -> Duration {
        Duration::from_secs(self.rating_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            paged_ttl_secs: default_paged_ttl(),
            rating_ttl_secs: default_rating_ttl(),
            queue_capacity: default_queue_capacity(),
            page_footer: true,
            flag_delta: default_flag_delta(),
            flag_note: default_flag_note(),
            controls: ControlEmojis::default(),
        }
    }
}

/// Reaction icons attached to interactive messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlEmojis {
    #[serde(default = "default_back")]
    pub back: String,
    #[serde(default = "default_forward")]
    pub forward: String,
    #[serde(default = "default_up")]
    pub up: String,
    #[serde(default = "default_down")]
    pub down: String,
    #[serde(default = "default_flag")]
    pub flag: String,
}

fn default_back() -> String {
    "⏪".into()
}
fn default_forward() -> String {
    "⏩".into()
}
fn default_up() -> String {
    "👍".into()
}
fn default_down() -> String {
    "👎".into()
}
fn default_flag() -> String {
    "💩".into()
}

impl Default for ControlEmojis {
    fn default() -> Self {
        Self {
            back: default_back(),
            forward: default_forward(),
            up: default_up(),
            down: default_down(),
            flag: default_flag(),
        }
    }
}

impl ControlEmojis {
    /// Icons of a paged viewer, in attach order.
    pub fn paged(&self) -> Vec<String> {
        vec![self.back.clone(), self.forward.clone()]
    }

    /// Icons of a rating widget, in attach order.
    pub fn rating(&self) -> Vec<String> {
        vec![self.up.clone(), self.down.clone(), self.flag.clone()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteConfig {
    #[serde(default = "default_info_glyph")]
    pub info: String,
    #[serde(default = "default_music_glyph")]
    pub music: String,
    #[serde(default = "default_search_glyph")]
    pub search: String,
    #[serde(default = "default_fail_glyph")]
    pub fail: String,
}

fn default_info_glyph() -> String {
    "ℹ️".into()
}
fn default_music_glyph() -> String {
    "🎵".into()
}
fn default_search_glyph() -> String {
    "🔍".into()
}
fn default_fail_glyph() -> String {
    "❌".into()
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            info: default_info_glyph(),
            music: default_music_glyph(),
            search: default_search_glyph(),
            fail: default_fail_glyph(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_reply_timeout")]
    pub timeout_secs: u64,

    /// Failure note sent when nobody answers in time
    #[serde(default = "default_timeout_note")]
    pub timeout_note: String,
}

fn default_reply_timeout() -> u64 {
    30
}
fn default_timeout_note() -> String {
    "No reply received in time, cancelled".into()
}

impl ReplyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_reply_timeout(),
            timeout_note: default_timeout_note(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.reactkit/config.toml).
    ///
    /// Environment overrides:
    /// - `REACTKIT_PAGED_TTL` (seconds)
    /// - `REACTKIT_RATING_TTL` (seconds)
    /// - `REACTKIT_CHANNEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(secs) = env_secs("REACTKIT_PAGED_TTL")? {
            self.sessions.paged_ttl_secs = secs;
        }
        if let Some(secs) = env_secs("REACTKIT_RATING_TTL")? {
            self.sessions.rating_ttl_secs = secs;
        }
        if let Ok(channel) = std::env::var("REACTKIT_CHANNEL") {
            self.gateway.channel = channel;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reactkit")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !GATEWAY_KINDS.contains(&self.gateway.kind.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown gateway kind '{}', expected one of: {}",
                self.gateway.kind,
                GATEWAY_KINDS.join(", ")
            )));
        }

        let s = &self.sessions;
        if s.paged_ttl_secs == 0 || s.rating_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session ttl values must be greater than 0".into(),
            ));
        }

        if s.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "queue_capacity must be greater than 0".into(),
            ));
        }

        if s.flag_delta >= 0 {
            return Err(ConfigError::ValidationError(
                "flag_delta must be negative".into(),
            ));
        }

        let c = &s.controls;
        let all = [&c.back, &c.forward, &c.up, &c.down, &c.flag];
        if all.iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "control emojis must not be empty".into(),
            ));
        }
        if c.back == c.forward {
            return Err(ConfigError::ValidationError(
                "back and forward controls must differ".into(),
            ));
        }
        if c.up == c.down || c.up == c.flag || c.down == c.flag {
            return Err(ConfigError::ValidationError(
                "up, down and flag controls must differ".into(),
            ));
        }

        if self.replies.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "replies.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn env_secs(name: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::ValidationError(format!("{name} must be a number of seconds, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for reactkit_core::Error {
    fn from(err: ConfigError) -> Self {
        reactkit_core::Error::Config {
            message: err.to_string(),
        }
    }
}
