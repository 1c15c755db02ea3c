// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord interaction normalization.
//!
//! Slash-command interactions carry no free text; the command line is
//! reconstructed from the structured `data.name` + `data.options` fields.

use courier_core::NormalizedMessage;
use serde_json::Value;
use tracing::debug;

/// Interaction type for application commands.
const APPLICATION_COMMAND: u64 = 2;

/// Parse a Discord interaction payload into a normalized message.
pub fn parse(payload: &Value) -> Option<NormalizedMessage> {
    if payload.get("type").and_then(Value::as_u64) != Some(APPLICATION_COMMAND) {
        return None;
    }

    // Sender is `member.user` in guilds, `user` in DMs.
    let user = payload
        .get("member")
        .and_then(|m| m.get("user"))
        .or_else(|| payload.get("user"))?;

    if user.get("bot").and_then(Value::as_bool) == Some(true) {
        debug!("dropping discord bot interaction");
        return None;
    }

    let data = payload.get("data")?;
    let text = reconstruct_command(data)?;
    if text.trim().is_empty() {
        return None;
    }

    let interaction_id = payload.get("id").and_then(Value::as_str)?;
    let channel_id = payload.get("channel_id").and_then(Value::as_str)?;
    let sender_id = user.get("id").and_then(Value::as_str)?;
    let sender_name = user
        .get("global_name")
        .and_then(Value::as_str)
        .or_else(|| user.get("username").and_then(Value::as_str))
        .map(str::to_string);

    let mut metadata = serde_json::Map::new();
    if let Some(guild_id) = payload.get("guild_id").and_then(Value::as_str) {
        metadata.insert("guild_id".into(), guild_id.into());
    }
    metadata.insert("interaction".into(), true.into());

    Some(NormalizedMessage {
        platform_message_id: interaction_id.to_string(),
        sender_id: sender_id.to_string(),
        sender_name,
        channel_id: channel_id.to_string(),
        channel_name: None,
        text,
        metadata: Value::Object(metadata),
    })
}

/// Rebuild `/command opt:value ...` from the interaction's structured data.
fn reconstruct_command(data: &Value) -> Option<String> {
    let name = data.get("name").and_then(Value::as_str)?;
    let mut text = format!("/{name}");

    if let Some(options) = data.get("options").and_then(Value::as_array) {
        for option in options {
            let Some(opt_name) = option.get("name").and_then(Value::as_str) else {
                continue;
            };
            let rendered = match option.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => continue,
            };
            text.push_str(&format!(" {opt_name}:{rendered}"));
        }
    }

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command_payload() -> Value {
        json!({
            "id": "interaction-1",
            "type": 2,
            "channel_id": "chan-9",
            "guild_id": "guild-3",
            "member": {
                "user": {"id": "u-5", "username": "rosa", "global_name": "Rosa"},
            },
            "data": {
                "name": "notify",
                "options": [
                    {"name": "message", "value": "build green"},
                    {"name": "count", "value": 2},
                    {"name": "urgent", "value": true},
                ],
            },
        })
    }

    #[test]
    fn reconstructs_command_text_from_options() {
        let msg = parse(&command_payload()).unwrap();
        assert_eq!(msg.text, "/notify message:build green count:2 urgent:true");
        assert_eq!(msg.platform_message_id, "interaction-1");
        assert_eq!(msg.sender_id, "u-5");
        assert_eq!(msg.sender_name.as_deref(), Some("Rosa"));
        assert_eq!(msg.channel_id, "chan-9");
        assert_eq!(msg.metadata["guild_id"], "guild-3");
    }

    #[test]
    fn command_without_options_is_bare_name() {
        let payload = json!({
            "id": "i2",
            "type": 2,
            "channel_id": "c",
            "user": {"id": "u", "username": "lee"},
            "data": {"name": "status"},
        });
        let msg = parse(&payload).unwrap();
        assert_eq!(msg.text, "/status");
        assert_eq!(msg.sender_name.as_deref(), Some("lee"));
    }

    #[test]
    fn drops_ping_interaction() {
        let payload = json!({"id": "i", "type": 1});
        assert!(parse(&payload).is_none());
    }

    #[test]
    fn drops_bot_user() {
        let payload = json!({
            "id": "i",
            "type": 2,
            "channel_id": "c",
            "user": {"id": "u", "bot": true},
            "data": {"name": "loop"},
        });
        assert!(parse(&payload).is_none());
    }

    #[test]
    fn dm_interaction_uses_top_level_user() {
        let payload = json!({
            "id": "i3",
            "type": 2,
            "channel_id": "dm-1",
            "user": {"id": "u-dm", "username": "sam"},
            "data": {"name": "ping"},
        });
        let msg = parse(&payload).unwrap();
        assert_eq!(msg.sender_id, "u-dm");
        assert!(msg.metadata.get("guild_id").is_none());
    }
}
