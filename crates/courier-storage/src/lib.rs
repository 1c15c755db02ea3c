// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Courier delivery pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for subscriptions, the durable message buffer, and the local
//! copy of the item graph.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use queries::graph::SqliteGraph;

use courier_core::BufferedMessage;

/// Build a fresh buffered-message row for one routed match.
///
/// The id is freshly generated; `created_at`/`expires_at` are stamped from
/// the current time and the configured TTL.
pub fn new_buffered_message(
    subscription: &courier_core::Subscription,
    message: &courier_core::NormalizedMessage,
    ttl_hours: i64,
) -> BufferedMessage {
    let now = now_rfc3339();
    let expires_at = rfc3339_after_hours(ttl_hours);
    BufferedMessage {
        id: uuid::Uuid::new_v4().to_string(),
        subscription_id: subscription.id.clone(),
        dashboard_id: subscription.dashboard_id.clone(),
        item_id: subscription.item_id.clone(),
        provider: subscription.provider,
        platform_message_id: message.platform_message_id.clone(),
        sender_id: message.sender_id.clone(),
        sender_name: message.sender_name.clone(),
        channel_id: message.channel_id.clone(),
        channel_name: message.channel_name.clone(),
        text: message.text.clone(),
        metadata: match &message.metadata {
            serde_json::Value::Null => None,
            value => serde_json::to_string(value).ok(),
        },
        status: courier_core::BufferStatus::Buffered,
        delivery_attempts: 0,
        claimed_at: None,
        delivered_targets: vec![],
        created_at: now,
        expires_at,
    }
}

/// Current UTC time in the same `%Y-%m-%dT%H:%M:%fZ` shape SQLite stamps,
/// so Rust-side and SQL-side timestamps stay lexicographically comparable.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn rfc3339_after_hours(hours: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::hours(hours))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_sortable_rfc3339() {
        let now = now_rfc3339();
        assert_eq!(now.len(), 24);
        assert!(now.ends_with('Z'));
        let later = rfc3339_after_hours(24);
        assert!(later > now);
    }
}
