// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform-side webhook registration.
//!
//! Telegram is the only platform where the pipeline registers its own
//! callback: one `setWebhook` per bot credential, pointing at the
//! subscription's unique path segment with the generated secret token.
//! Registration failure is surfaced as subscription `status = error`
//! rather than an ingestion-path failure.

use courier_core::{CourierError, Subscription};
use serde_json::Value;
use tracing::{info, warn};

pub struct TelegramRegistrar {
    client: reqwest::Client,
    api_base: String,
    public_base_url: Option<String>,
}

impl TelegramRegistrar {
    pub fn new(api_base: impl Into<String>, public_base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            public_base_url,
        }
    }

    fn registration_err(message: String) -> CourierError {
        CourierError::Registration {
            message,
            source: None,
        }
    }

    async fn call(&self, token: &str, method: &str, params: Value) -> Result<(), CourierError> {
        let url = format!("{}/bot{token}/{method}", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| CourierError::Registration {
                message: format!("{method} request failed"),
                source: Some(Box::new(e)),
            })?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or_else(|_| Value::Null);
        if !status.is_success() || body.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("no description");
            return Err(Self::registration_err(format!(
                "{method} refused ({status}): {description}"
            )));
        }
        Ok(())
    }

    /// Register the subscription's callback URL with the platform.
    pub async fn register(&self, sub: &Subscription) -> Result<(), CourierError> {
        let token = sub
            .access_token
            .as_deref()
            .ok_or_else(|| Self::registration_err("subscription has no bot token".into()))?;
        let base = self.public_base_url.as_deref().ok_or_else(|| {
            Self::registration_err("server.public_base_url is not configured".into())
        })?;
        let url = format!(
            "{}/webhooks/telegram/{}",
            base.trim_end_matches('/'),
            sub.webhook_id
        );
        self.call(
            token,
            "setWebhook",
            serde_json::json!({
                "url": url,
                "secret_token": sub.webhook_secret,
                "allowed_updates": ["message", "edited_message"],
            }),
        )
        .await?;
        info!(subscription_id = %sub.id, "telegram webhook registered");
        Ok(())
    }

    /// Best-effort deregistration; failure is logged, never fatal.
    pub async fn deregister(&self, sub: &Subscription) {
        let Some(token) = sub.access_token.as_deref() else {
            return;
        };
        if let Err(e) = self
            .call(token, "deleteWebhook", serde_json::json!({}))
            .await
        {
            warn!(subscription_id = %sub.id, error = %e, "telegram webhook deregistration failed");
        }
    }
}
