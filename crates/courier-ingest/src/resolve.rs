// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort display-name enrichment.
//!
//! Normalizers keep whatever names ride in the payload; platforms that only
//! ship opaque ids (Slack events most notably) get names filled in here.
//! Resolution is strictly best-effort: a slow or failing lookup never blocks
//! or drops the message, it just leaves the raw ids in place.

use std::time::Duration;

use async_trait::async_trait;
use courier_core::NormalizedMessage;
use serde_json::Value;
use tracing::debug;

/// Looks up human-readable names for platform ids.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn sender_name(&self, sender_id: &str) -> Option<String>;
    async fn channel_name(&self, channel_id: &str) -> Option<String>;
}

/// Fill in missing names on `message`, bounded by `timeout`.
pub async fn enrich(
    message: &mut NormalizedMessage,
    resolver: &dyn NameResolver,
    timeout: Duration,
) {
    let needs_sender = message.sender_name.is_none();
    let needs_channel = message.channel_name.is_none();
    if !needs_sender && !needs_channel {
        return;
    }

    let lookups = async {
        if needs_sender {
            message.sender_name = resolver.sender_name(&message.sender_id).await;
        }
        if needs_channel {
            message.channel_name = resolver.channel_name(&message.channel_id).await;
        }
    };

    if tokio::time::timeout(timeout, lookups).await.is_err() {
        debug!(
            sender_id = %message.sender_id,
            channel_id = %message.channel_id,
            "name resolution timed out, keeping raw ids"
        );
    }
}

/// Slack Web API resolver using a per-subscription bot token.
pub struct SlackResolver {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl SlackResolver {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base("https://slack.com/api", token)
    }

    pub fn with_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    async fn call(&self, method: &str, param: (&str, &str)) -> Option<Value> {
        let url = format!("{}/{method}", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[param])
            .send()
            .await
            .ok()?;
        let body: Value = response.json().await.ok()?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            debug!(method, "slack api lookup refused");
            return None;
        }
        Some(body)
    }
}

#[async_trait]
impl NameResolver for SlackResolver {
    async fn sender_name(&self, sender_id: &str) -> Option<String> {
        let body = self.call("users.info", ("user", sender_id)).await?;
        let user = body.get("user")?;
        user.get("profile")
            .and_then(|p| p.get("display_name"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| user.get("real_name").and_then(Value::as_str))
            .or_else(|| user.get("name").and_then(Value::as_str))
            .map(str::to_string)
    }

    async fn channel_name(&self, channel_id: &str) -> Option<String> {
        let body = self.call("conversations.info", ("channel", channel_id)).await?;
        body.get("channel")
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}
