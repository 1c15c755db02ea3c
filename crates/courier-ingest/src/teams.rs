// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Microsoft Teams outgoing-webhook normalization.

use courier_core::NormalizedMessage;
use serde_json::Value;

/// Parse a Teams activity into a normalized message.
///
/// The bot mention (`<at>name</at>`) that triggered the webhook is part of
/// the activity text and is stripped before buffering.
pub fn parse(activity: &Value) -> Option<NormalizedMessage> {
    if activity.get("type").and_then(Value::as_str) != Some("message") {
        return None;
    }

    let raw_text = activity.get("text").and_then(Value::as_str)?;
    let text = strip_mentions(raw_text);
    if text.is_empty() {
        return None;
    }

    let id = activity.get("id").and_then(Value::as_str)?;
    let from = activity.get("from")?;
    let sender_id = from.get("id").and_then(Value::as_str)?;
    let sender_name = from.get("name").and_then(Value::as_str).map(str::to_string);
    let conversation = activity.get("conversation")?;
    let channel_id = conversation.get("id").and_then(Value::as_str)?;

    let mut metadata = serde_json::Map::new();
    if let Some(tenant) = activity
        .get("channelData")
        .and_then(|d| d.get("tenant"))
        .and_then(|t| t.get("id"))
        .and_then(Value::as_str)
    {
        metadata.insert("tenant_id".into(), tenant.into());
    }

    Some(NormalizedMessage {
        platform_message_id: id.to_string(),
        sender_id: sender_id.to_string(),
        sender_name,
        channel_id: channel_id.to_string(),
        channel_name: None,
        text,
        metadata: Value::Object(metadata),
    })
}

/// Remove `<at>...</at>` spans and collapse the surrounding whitespace.
fn strip_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<at>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</at>") {
            Some(end) => rest = &rest[start + end + "</at>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
