// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Courier.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to sensible values; provider secrets default to
/// `None`, which disables (fails closed) the corresponding webhook endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Fan-out delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Reliability scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Execution-environment collaborator endpoint.
    #[serde(default)]
    pub exec: ExecConfig,

    /// Block-store collaborator endpoint.
    #[serde(default)]
    pub blocks: BlocksConfig,

    /// Slack webhook verification settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Discord webhook verification settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// WhatsApp Business webhook settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Microsoft Teams outgoing-webhook settings.
    #[serde(default)]
    pub teams: TeamsConfig,

    /// Mattermost outgoing-webhook settings.
    #[serde(default)]
    pub mattermost: MattermostConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer token protecting the subscription management API.
    /// `None` rejects all management requests (fail-closed).
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Externally reachable base URL, used when registering platform-side
    /// webhooks (e.g. `https://courier.example.com`).
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            bearer_token: None,
            public_base_url: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8064
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

/// Fan-out delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Maximum delivery attempts before a message is permanently failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Maximum buffered rows processed per fan-out pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Seconds a `delivering` claim may hold before the watchdog resets it.
    #[serde(default = "default_claim_timeout_secs")]
    pub claim_timeout_secs: i64,

    /// Hours until a buffered message expires.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// Days delivered/expired rows are retained before deletion.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Inline retry delays (seconds) after the first fan-out attempt.
    #[serde(default = "default_immediate_retry_secs")]
    pub immediate_retry_secs: Vec<u64>,

    /// Name-resolution timeout in milliseconds; resolution is abandoned
    /// past this and raw identifiers are used.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            batch_size: default_batch_size(),
            claim_timeout_secs: default_claim_timeout_secs(),
            ttl_hours: default_ttl_hours(),
            retention_days: default_retention_days(),
            immediate_retry_secs: default_immediate_retry_secs(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }
}

fn default_max_attempts() -> i64 {
    3
}

fn default_batch_size() -> i64 {
    50
}

fn default_claim_timeout_secs() -> i64 {
    300
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_retention_days() -> i64 {
    7
}

fn default_immediate_retry_secs() -> Vec<u64> {
    vec![1, 3, 5]
}

fn default_resolve_timeout_ms() -> u64 {
    1500
}

/// Reliability scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between periodic buffered-retry passes.
    #[serde(default = "default_buffered_retry_secs")]
    pub buffered_retry_secs: u64,

    /// Subscription pairs scanned per buffered-retry pass.
    #[serde(default = "default_buffered_retry_batch")]
    pub buffered_retry_batch: i64,

    /// Seconds between stale-wake passes.
    #[serde(default = "default_stale_wake_secs")]
    pub stale_wake_secs: u64,

    /// Dashboards woken per stale-wake pass. Kept small to avoid a
    /// thundering herd on shared infrastructure.
    #[serde(default = "default_stale_wake_max_dashboards")]
    pub stale_wake_max_dashboards: i64,

    /// Oldest-buffered-message age (seconds) before a sleeping dashboard
    /// qualifies for a wake.
    #[serde(default = "default_staleness_threshold_secs")]
    pub staleness_threshold_secs: i64,

    /// Seconds between watchdog/cleanup passes.
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            buffered_retry_secs: default_buffered_retry_secs(),
            buffered_retry_batch: default_buffered_retry_batch(),
            stale_wake_secs: default_stale_wake_secs(),
            stale_wake_max_dashboards: default_stale_wake_max_dashboards(),
            staleness_threshold_secs: default_staleness_threshold_secs(),
            watchdog_secs: default_watchdog_secs(),
        }
    }
}

fn default_buffered_retry_secs() -> u64 {
    30
}

fn default_buffered_retry_batch() -> i64 {
    20
}

fn default_stale_wake_secs() -> u64 {
    60
}

fn default_stale_wake_max_dashboards() -> i64 {
    3
}

fn default_staleness_threshold_secs() -> i64 {
    30
}

fn default_watchdog_secs() -> u64 {
    60
}

/// Execution-environment collaborator endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecConfig {
    /// Base URL of the execution service. Required to serve: the delivery
    /// client refuses to construct without it.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token for the execution service.
    #[serde(default)]
    pub token: Option<String>,
}

/// Block-store collaborator endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlocksConfig {
    /// Base URL of the block-store service. Required to serve, like
    /// [`ExecConfig::base_url`].
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token for the block-store service.
    #[serde(default)]
    pub token: Option<String>,
}

/// Slack webhook verification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    /// Slack app signing secret. `None` rejects all Slack traffic.
    #[serde(default)]
    pub signing_secret: Option<String>,
}

/// Discord webhook verification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Hex-encoded Ed25519 application public key. `None` rejects all
    /// Discord traffic.
    #[serde(default)]
    pub public_key: Option<String>,
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API base URL, overridable for testing.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// WhatsApp Business webhook configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Meta app secret for `X-Hub-Signature-256` verification.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token echoed during the `hub.challenge` subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,
}

/// Microsoft Teams outgoing-webhook configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TeamsConfig {
    /// Base64 security token for HMAC verification.
    #[serde(default)]
    pub security_token: Option<String>,
}

/// Mattermost outgoing-webhook configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MattermostConfig {
    /// Outgoing-webhook token compared against the payload's `token` field.
    #[serde(default)]
    pub outgoing_token: Option<String>,
}
