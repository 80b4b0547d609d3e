//! Configuration types for price-ticker
//!
//! Loaded once from TOML at startup, adjusted by environment overrides,
//! validated, and then passed by reference into every component.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::telemetry::LogFormat;

/// Environment variable that replaces the configured target list
pub const TARGET_IDS_ENV: &str = "TARGET_CHANNEL_IDS";

/// Environment variable that overrides the liveness server port
pub const PORT_ENV: &str = "PORT";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("No tokens configured")]
    NoTokens,
    #[error("Token #{index} has an empty {field}")]
    EmptyTokenField { index: usize, field: &'static str },
    #[error("Duplicate token id: {0}")]
    DuplicateToken(String),
    #[error("No targets configured")]
    NoTargets,
    #[error("Target #{0} has an empty id")]
    EmptyTargetId(usize),
    #[error("Paired mode needs one target per token: {tokens} tokens, {targets} targets")]
    PairedCardinality { tokens: usize, targets: usize },
    #[error("schedule.interval_secs must be greater than zero")]
    ZeroInterval,
    #[error("pricing.max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("Bot token missing: set the {0} environment variable")]
    MissingBotToken(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub tokens: Vec<TokenSpec>,
}

/// A token whose price is tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    /// CoinGecko identifier (e.g. "stepn")
    pub id: String,
    /// Display code (e.g. "GMT")
    pub symbol: String,
    /// Display glyph
    pub emoji: String,
}

/// How an update is applied to a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Set the channel name to the rendered text
    #[default]
    Rename,
    /// Post the rendered text as a message
    Post,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            TargetKind::Rename => "rename",
            TargetKind::Post => "post",
        })
    }
}

/// A notification destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub id: String,
    #[serde(default)]
    pub kind: TargetKind,
}

/// How tokens are mapped onto targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Every token goes to every target
    Broadcast,
    /// Token i goes to target i
    #[default]
    Paired,
}

/// Target configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetsConfig {
    #[serde(default)]
    pub mode: TargetMode,
    /// Kind given to targets that come from `TARGET_CHANNEL_IDS`
    #[serde(default)]
    pub default_kind: TargetKind,
    #[serde(default)]
    pub list: Vec<TargetSpec>,
}

/// Pricing API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_pricing_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed sleep between rate-limited attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// One request for all tokens (true) or one per token (false)
    #[serde(default = "default_true")]
    pub batch: bool,
}

fn default_pricing_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_delay_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_url: default_pricing_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            batch: true,
        }
    }
}

impl PricingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Message presentation for `post` targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Plain,
    /// Title, description, color and timestamp
    Embed,
}

/// Discord configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "default_discord_api")]
    pub api_base: String,
    /// Name of the environment variable holding the bot token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pause between consecutive Discord calls within a cycle
    #[serde(default)]
    pub pause_between_ms: u64,
    #[serde(default)]
    pub message_format: MessageFormat,
    #[serde(default = "default_embed_title")]
    pub embed_title: String,
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
    /// Skip posting text identical to the last post on the same target
    #[serde(default = "default_true")]
    pub dedupe_posts: bool,
    /// Resolved from `token_env`, never read from the file
    #[serde(skip)]
    pub bot_token: Option<String>,
}

fn default_discord_api() -> String {
    "https://discord.com/api/v10".to_string()
}
fn default_token_env() -> String {
    "DISCORD_BOT_TOKEN".to_string()
}
fn default_embed_title() -> String {
    "Price update".to_string()
}
fn default_embed_color() -> u32 {
    0xF1C40F
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: default_discord_api(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            pause_between_ms: 0,
            message_format: MessageFormat::Plain,
            embed_title: default_embed_title(),
            embed_color: default_embed_color(),
            dedupe_posts: true,
            bot_token: None,
        }
    }
}

impl DiscordConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pause_between(&self) -> Duration {
        Duration::from_millis(self.pause_between_ms)
    }
}

/// Scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// When false only the startup cycle runs
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    300 // 5 minutes
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Liveness server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    10000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply process environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(&self.discord.token_env).filter(|t| !t.trim().is_empty()) {
            self.discord.bot_token = Some(token.trim().to_string());
        }

        if let Some(ids) = lookup(TARGET_IDS_ENV) {
            self.targets.list = targets_from_csv(&ids, self.targets.default_kind);
        }

        if let Some(port) = lookup(PORT_ENV).and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
    }

    /// Check the configuration shape before anything connects
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_pricing()?;

        if self.targets.list.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if let Some(index) = self.targets.list.iter().position(|t| t.id.trim().is_empty()) {
            return Err(ConfigError::EmptyTargetId(index));
        }

        if self.targets.mode == TargetMode::Paired && self.targets.list.len() != self.tokens.len()
        {
            return Err(ConfigError::PairedCardinality {
                tokens: self.tokens.len(),
                targets: self.targets.list.len(),
            });
        }

        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(())
    }

    /// Checks needed to fetch prices, without any Discord targets
    pub fn validate_pricing(&self) -> Result<(), ConfigError> {
        if self.tokens.is_empty() {
            return Err(ConfigError::NoTokens);
        }

        let mut seen = HashSet::new();
        for (index, token) in self.tokens.iter().enumerate() {
            for (field, value) in [("id", &token.id), ("symbol", &token.symbol)] {
                if value.trim().is_empty() {
                    return Err(ConfigError::EmptyTokenField { index, field });
                }
            }
            if !seen.insert(token.id.as_str()) {
                return Err(ConfigError::DuplicateToken(token.id.clone()));
            }
        }

        if self.pricing.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }

    /// The resolved bot token, required by commands that talk to Discord
    pub fn bot_token(&self) -> Result<&str, ConfigError> {
        self.discord
            .bot_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingBotToken(self.discord.token_env.clone()))
    }

    /// Token ids in configured order
    pub fn token_ids(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.id.clone()).collect()
    }
}

/// Parse a comma separated id list into targets of one kind
pub fn targets_from_csv(ids: &str, kind: TargetKind) -> Vec<TargetSpec> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| TargetSpec {
            id: id.to_string(),
            kind,
        })
        .collect()
}
