// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mattermost outgoing-webhook normalization.

use courier_core::NormalizedMessage;
use serde_json::Value;

/// Parse a Mattermost outgoing-webhook payload.
///
/// The payload is flat form-style JSON; `team_id` rides along in metadata
/// because routing for this platform is scoped to a team.
pub fn parse(payload: &Value) -> Option<NormalizedMessage> {
    let text = payload.get("text").and_then(Value::as_str)?;
    if text.trim().is_empty() {
        return None;
    }

    let post_id = payload.get("post_id").and_then(Value::as_str)?;
    let user_id = payload.get("user_id").and_then(Value::as_str)?;
    let channel_id = payload.get("channel_id").and_then(Value::as_str)?;

    let sender_name = payload
        .get("user_name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let channel_name = payload
        .get("channel_name")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut metadata = serde_json::Map::new();
    if let Some(team_id) = payload.get("team_id").and_then(Value::as_str) {
        metadata.insert("team_id".into(), team_id.into());
    }
    if let Some(trigger) = payload.get("trigger_word").and_then(Value::as_str) {
        metadata.insert("trigger_word".into(), trigger.into());
    }

    Some(NormalizedMessage {
        platform_message_id: post_id.to_string(),
        sender_id: user_id.to_string(),
        sender_name,
        channel_id: channel_id.to_string(),
        channel_name,
        text: text.to_string(),
        metadata: Value::Object(metadata),
    })
}
