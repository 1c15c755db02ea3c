// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API webhook normalization.
//!
//! One webhook body can carry several entries, each with several change
//! sets, each with several messages; `parse_batch` flattens them all.
//! Phone numbers are reduced to digits so `+1 (555) 010-2222`, `15550102222`
//! and `1-555-010-2222` address the same sender.

use courier_core::NormalizedMessage;
use serde_json::Value;

use crate::normalize_phone;

/// Flatten a webhook payload into normalized messages.
pub fn parse_batch(payload: &Value) -> Vec<NormalizedMessage> {
    let mut out = Vec::new();
    let Some(entries) = payload.get("entry").and_then(Value::as_array) else {
        return out;
    };
    for entry in entries {
        let Some(changes) = entry.get("changes").and_then(Value::as_array) else {
            continue;
        };
        for change in changes {
            let Some(value) = change.get("value") else {
                continue;
            };
            // Status updates (sent/delivered/read) share the webhook; skip them.
            let Some(messages) = value.get("messages").and_then(Value::as_array) else {
                continue;
            };
            let contacts = value.get("contacts").and_then(Value::as_array);
            let business_number_id = value
                .get("metadata")
                .and_then(|m| m.get("phone_number_id"))
                .and_then(Value::as_str);
            for message in messages {
                if let Some(normalized) = parse_one(message, contacts, business_number_id) {
                    out.push(normalized);
                }
            }
        }
    }
    out
}

fn parse_one(
    message: &Value,
    contacts: Option<&Vec<Value>>,
    business_number_id: Option<&str>,
) -> Option<NormalizedMessage> {
    if message.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    let text = message
        .get("text")
        .and_then(|t| t.get("body"))
        .and_then(Value::as_str)?;
    if text.trim().is_empty() {
        return None;
    }

    let id = message.get("id").and_then(Value::as_str)?;
    let from = message.get("from").and_then(Value::as_str)?;
    let sender_id = normalize_phone(from);
    if sender_id.is_empty() {
        return None;
    }

    let sender_name = contacts.and_then(|cs| {
        cs.iter()
            .find(|c| {
                c.get("wa_id")
                    .and_then(Value::as_str)
                    .is_some_and(|wa| normalize_phone(wa) == sender_id)
            })
            .and_then(|c| c.get("profile"))
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let mut metadata = serde_json::Map::new();
    if let Some(number_id) = business_number_id {
        metadata.insert("business_number_id".into(), number_id.into());
    }

    // Direct messaging has no channel; the sender's number is the conversation.
    Some(NormalizedMessage {
        platform_message_id: id.to_string(),
        sender_id: sender_id.clone(),
        sender_name,
        channel_id: sender_id,
        channel_name: None,
        text: text.to_string(),
        metadata: Value::Object(metadata),
    })
}
