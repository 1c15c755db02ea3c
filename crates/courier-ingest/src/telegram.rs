// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram update normalization.

use courier_core::NormalizedMessage;
use serde_json::Value;
use tracing::debug;

/// Parse a Telegram `Update` into a normalized message.
///
/// Handles both `message` and `edited_message` updates; edits get a
/// synthetic id derived from the original message id and the edit date
/// so a re-delivered edit never collides with the original.
pub fn parse(update: &Value) -> Option<NormalizedMessage> {
    let (message, edited) = match update.get("message") {
        Some(m) => (m, false),
        None => (update.get("edited_message")?, true),
    };

    let from = message.get("from")?;
    if from.get("is_bot").and_then(Value::as_bool) == Some(true) {
        debug!("dropping telegram bot message");
        return None;
    }

    let text = message.get("text").and_then(Value::as_str)?;
    if text.trim().is_empty() {
        return None;
    }

    let message_id = message.get("message_id").and_then(Value::as_i64)?;
    let chat = message.get("chat")?;
    let chat_id = chat.get("id").and_then(Value::as_i64)?;
    let sender_id = from.get("id").and_then(Value::as_i64)?;

    let platform_message_id = if edited {
        let edit_date = message.get("edit_date").and_then(Value::as_i64)?;
        format!("{message_id}:edit:{edit_date}")
    } else {
        message_id.to_string()
    };

    let sender_name = match (
        from.get("first_name").and_then(Value::as_str),
        from.get("last_name").and_then(Value::as_str),
    ) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.to_string()),
        _ => from.get("username").and_then(Value::as_str).map(str::to_string),
    };

    let channel_name = chat
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut metadata = serde_json::Map::new();
    if let Some(chat_type) = chat.get("type").and_then(Value::as_str) {
        metadata.insert("chat_type".into(), chat_type.into());
    }
    if edited {
        metadata.insert("edited".into(), true.into());
    }

    Some(NormalizedMessage {
        platform_message_id,
        sender_id: sender_id.to_string(),
        sender_name,
        channel_id: chat_id.to_string(),
        channel_name,
        text: text.to_string(),
        metadata: Value::Object(metadata),
    })
}
