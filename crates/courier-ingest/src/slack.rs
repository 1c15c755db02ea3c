// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack event normalization.
//!
//! Operates on the `event` object of an `event_callback` envelope. Edited
//! messages arrive as subtype `message_changed` with the real content nested
//! under `message`; they get a synthetic id so they do not collide with the
//! original in the dedup index.

use courier_core::NormalizedMessage;
use serde_json::Value;
use tracing::debug;

/// Message subtypes that are never deliverable messages.
const IGNORED_SUBTYPES: &[&str] = &[
    "bot_message",
    "channel_join",
    "channel_leave",
    "channel_topic",
    "channel_purpose",
    "channel_name",
    "channel_archive",
    "channel_unarchive",
    "message_deleted",
    "thread_broadcast",
];

/// Parse a Slack `event` object into a normalized message.
///
/// `event_id` is the envelope-level event id, used to build synthetic ids
/// for edits.
pub fn parse(event: &Value, event_id: &str) -> Option<NormalizedMessage> {
    if event.get("type").and_then(Value::as_str) != Some("message") {
        return None;
    }

    // Bot-authored messages are dropped for loop prevention.
    if event.get("bot_id").and_then(Value::as_str).is_some() {
        debug!("dropping slack bot message");
        return None;
    }

    let subtype = event.get("subtype").and_then(Value::as_str);

    let (message_id, sender_id, text) = match subtype {
        Some("message_changed") => {
            // The outer envelope describes the edit event; the edited
            // content lives in the nested `message` object.
            let inner = event.get("message")?;
            if inner.get("bot_id").and_then(Value::as_str).is_some() {
                return None;
            }
            let original_id = inner.get("ts").and_then(Value::as_str)?;
            let sender = inner.get("user").and_then(Value::as_str)?;
            let text = inner.get("text").and_then(Value::as_str)?;
            (format!("{original_id}:edit:{event_id}"), sender.to_string(), text)
        }
        Some(subtype) => {
            if IGNORED_SUBTYPES.contains(&subtype) {
                debug!(subtype, "dropping slack non-message subtype");
            } else {
                debug!(subtype, "dropping unrecognized slack subtype");
            }
            return None;
        }
        None => {
            let ts = event.get("ts").and_then(Value::as_str)?;
            let sender = event.get("user").and_then(Value::as_str)?;
            let text = event.get("text").and_then(Value::as_str)?;
            (ts.to_string(), sender.to_string(), text)
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let channel_id = event.get("channel").and_then(Value::as_str)?;

    let mut metadata = serde_json::Map::new();
    if let Some(thread_ts) = event.get("thread_ts").and_then(Value::as_str) {
        metadata.insert("thread_ts".into(), thread_ts.into());
    }
    if subtype == Some("message_changed") {
        metadata.insert("edited".into(), true.into());
    }

    Some(NormalizedMessage {
        platform_message_id: message_id,
        sender_id,
        sender_name: None, // resolved later with per-subscription credentials
        channel_id: channel_id.to_string(),
        channel_name: None,
        text: text.to_string(),
        metadata: Value::Object(metadata),
    })
}
