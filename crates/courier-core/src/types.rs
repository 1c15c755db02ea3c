// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Courier pipeline.
//!
//! Everything downstream of the normalizers depends only on these types,
//! never on a platform-specific payload shape.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Messaging platforms Courier ingests from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Slack,
    Discord,
    Telegram,
    Whatsapp,
    Teams,
    Mattermost,
    Googlechat,
}

impl Provider {
    /// Channel identifiers on these platforms are only unique within a
    /// workspace-level scope; routing must additionally match on it.
    pub fn requires_team_scope(self) -> bool {
        matches!(self, Provider::Slack | Provider::Mattermost)
    }

    /// Policy-gated providers require an explicit [`MessagingPolicy`] per
    /// destination. The rest authorize purely via graph edges.
    pub fn is_policy_gated(self) -> bool {
        matches!(self, Provider::Telegram | Provider::Whatsapp)
    }

    /// One webhook registration per credential: the platform refuses a
    /// second simultaneous subscription under the same credential.
    pub fn single_registration_per_credential(self) -> bool {
        matches!(self, Provider::Telegram)
    }
}

/// Canonical form of one inbound platform event.
///
/// Produced once per event by the platform's normalizer, then cloned per
/// matching subscription before enrichment; name resolution mutates fields
/// using per-subscription credentials and must not leak across matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Platform-assigned message identifier, unique per subscription.
    pub platform_message_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub text: String,
    /// Free-form per-platform extras: thread ids, edit flags, reply refs.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Lifecycle state of a subscription.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Error,
}

/// Binds a dashboard block to a platform channel/chat.
///
/// At most one active/pending subscription may exist per unique
/// `(dashboard_id, item_id, provider, channel_id, chat_id)` tuple, with
/// nulls normalized to the empty string for uniqueness purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub dashboard_id: String,
    pub item_id: String,
    pub provider: Provider,
    pub channel_id: Option<String>,
    /// Sender scope. `None` on WhatsApp means catch-all: any sender to the
    /// configured business channel matches.
    pub chat_id: Option<String>,
    /// Workspace-level scope for providers where channel ids collide
    /// across tenants.
    pub team_id: Option<String>,
    /// Path segment identifying this subscription's webhook endpoint.
    pub webhook_id: String,
    /// Registration-time shared secret, compared against inbound requests.
    pub webhook_secret: String,
    /// Per-subscription platform credential (bot token / API token), used
    /// for webhook registration and best-effort name resolution.
    pub access_token: Option<String>,
    pub status: SubscriptionStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Delivery state of a buffered message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BufferStatus {
    Buffered,
    Delivering,
    Delivered,
    Failed,
    Expired,
}

/// A durably buffered inbound message, the core entity of the pipeline.
///
/// `(subscription_id, platform_message_id)` is unique; a second insert of
/// the same pair is a successful no-op duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferedMessage {
    pub id: String,
    pub subscription_id: String,
    pub dashboard_id: String,
    pub item_id: String,
    pub provider: Provider,
    pub platform_message_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub text: String,
    /// JSON-encoded per-platform extras.
    pub metadata: Option<String>,
    pub status: BufferStatus,
    pub delivery_attempts: i64,
    pub claimed_at: Option<String>,
    /// Destination item ids already satisfied by previous attempts.
    pub delivered_targets: Vec<String>,
    pub created_at: String,
    pub expires_at: String,
}

/// Channel filter mode for a messaging policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelFilterMode {
    #[default]
    All,
    Allowlist,
}

/// Sender filter mode for a messaging policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderFilterMode {
    #[default]
    All,
    Allowlist,
    Blocklist,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelFilter {
    #[serde(default)]
    pub mode: ChannelFilterMode,
    #[serde(default)]
    pub channel_ids: Vec<String>,
    #[serde(default)]
    pub channel_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderFilter {
    #[serde(default)]
    pub mode: SenderFilterMode,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub user_names: Vec<String>,
}

/// Per-destination delivery policy, stored against the destination and
/// re-evaluated live at every delivery attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagingPolicy {
    #[serde(default)]
    pub can_receive: bool,
    #[serde(default)]
    pub channel_filter: ChannelFilter,
    #[serde(default)]
    pub sender_filter: SenderFilter,
}

/// What kind of block a destination is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    /// Live process reached through a session/PTY handle.
    Terminal,
    /// Append-only text block.
    Note,
    /// Replace-content text block.
    Prompt,
}

/// A block that can receive a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub item_id: String,
    pub kind: DestinationKind,
}
