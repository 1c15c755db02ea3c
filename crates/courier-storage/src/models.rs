// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row-to-type mapping for the query modules.

use courier_core::{BufferStatus, BufferedMessage, Provider, Subscription, SubscriptionStatus};
use rusqlite::types::Type;
use rusqlite::Row;

fn parse_column<T: std::str::FromStr>(idx: usize, value: &str) -> Result<T, rusqlite::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

/// Map a `messaging_subscriptions` row selected with [`SUBSCRIPTION_COLUMNS`].
pub fn subscription_from_row(row: &Row<'_>) -> Result<Subscription, rusqlite::Error> {
    let provider: String = row.get(3)?;
    let status: String = row.get(10)?;
    Ok(Subscription {
        id: row.get(0)?,
        dashboard_id: row.get(1)?,
        item_id: row.get(2)?,
        provider: parse_column::<Provider>(3, &provider)?,
        channel_id: row.get(4)?,
        chat_id: row.get(5)?,
        team_id: row.get(6)?,
        webhook_id: row.get(7)?,
        webhook_secret: row.get(8)?,
        access_token: row.get(9)?,
        status: parse_column::<SubscriptionStatus>(10, &status)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub const SUBSCRIPTION_COLUMNS: &str = "id, dashboard_id, item_id, provider, channel_id, \
     chat_id, team_id, webhook_id, webhook_secret, access_token, status, created_at, updated_at";

/// Map an `inbound_messages` row selected with [`BUFFERED_COLUMNS`].
pub fn buffered_from_row(row: &Row<'_>) -> Result<BufferedMessage, rusqlite::Error> {
    let provider: String = row.get(4)?;
    let status: String = row.get(12)?;
    let targets_json: String = row.get(15)?;
    let delivered_targets: Vec<String> = serde_json::from_str(&targets_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e))
    })?;
    Ok(BufferedMessage {
        id: row.get(0)?,
        subscription_id: row.get(1)?,
        dashboard_id: row.get(2)?,
        item_id: row.get(3)?,
        provider: parse_column::<Provider>(4, &provider)?,
        platform_message_id: row.get(5)?,
        sender_id: row.get(6)?,
        sender_name: row.get(7)?,
        channel_id: row.get(8)?,
        channel_name: row.get(9)?,
        text: row.get(10)?,
        metadata: row.get(11)?,
        status: parse_column::<BufferStatus>(12, &status)?,
        delivery_attempts: row.get(13)?,
        claimed_at: row.get(14)?,
        delivered_targets,
        created_at: row.get(16)?,
        expires_at: row.get(17)?,
    })
}

pub const BUFFERED_COLUMNS: &str = "id, subscription_id, dashboard_id, item_id, provider, \
     platform_message_id, sender_id, sender_name, channel_id, channel_name, body, metadata, \
     status, delivery_attempts, claimed_at, delivered_targets, created_at, expires_at";
