// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription lifecycle queries.

use courier_core::{CourierError, Provider, Subscription, SubscriptionStatus};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{subscription_from_row, SUBSCRIPTION_COLUMNS};

/// Insert a new subscription.
///
/// Enforces the per-scope uniqueness index, and for single-registration
/// providers additionally refuses a second live subscription under the
/// same credential, since the platform would silently steal the callback
/// from the first one.
pub async fn create_subscription(db: &Database, sub: &Subscription) -> Result<(), CourierError> {
    let sub = sub.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;

            if sub.provider.single_registration_per_credential() {
                if let Some(token) = &sub.access_token {
                    let live: i64 = tx.query_row(
                        "SELECT COUNT(*) FROM messaging_subscriptions
                         WHERE provider = ?1 AND access_token = ?2 AND status != 'error'",
                        params![sub.provider.to_string(), token],
                        |row| row.get(0),
                    )?;
                    if live > 0 {
                        return Err(rusqlite::Error::SqliteFailure(
                            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
                            Some("credential already has a live subscription".to_string()),
                        ));
                    }
                }
            }

            tx.execute(
                "INSERT INTO messaging_subscriptions
                 (id, dashboard_id, item_id, provider, channel_id, chat_id, team_id,
                  webhook_id, webhook_secret, access_token, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    sub.id,
                    sub.dashboard_id,
                    sub.item_id,
                    sub.provider.to_string(),
                    sub.channel_id,
                    sub.chat_id,
                    sub.team_id,
                    sub.webhook_id,
                    sub.webhook_secret,
                    sub.access_token,
                    sub.status.to_string(),
                    sub.created_at,
                    sub.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| match &e {
            tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(f, msg))
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                CourierError::Registration {
                    message: msg
                        .clone()
                        .unwrap_or_else(|| "subscription conflicts with an existing one".into()),
                    source: None,
                }
            }
            _ => map_tr_err(e),
        })
}

pub async fn get_subscription(
    db: &Database,
    id: &str,
) -> Result<Option<Subscription>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Subscription>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM messaging_subscriptions WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], subscription_from_row) {
                Ok(sub) => Ok(Some(sub)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Look up the subscription owning a per-subscription webhook path segment.
pub async fn find_by_webhook_id(
    db: &Database,
    webhook_id: &str,
) -> Result<Option<Subscription>, CourierError> {
    let webhook_id = webhook_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Subscription>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM messaging_subscriptions WHERE webhook_id = ?1"
            ))?;
            match stmt.query_row(params![webhook_id], subscription_from_row) {
                Ok(sub) => Ok(Some(sub)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All subscriptions for a provider, every status. Routing filters on
/// status itself so pending/error rows stay visible to the API.
pub async fn list_by_provider(
    db: &Database,
    provider: Provider,
) -> Result<Vec<Subscription>, CourierError> {
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Subscription>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM messaging_subscriptions
                 WHERE provider = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![provider], subscription_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_by_dashboard(
    db: &Database,
    dashboard_id: &str,
) -> Result<Vec<Subscription>, CourierError> {
    let dashboard_id = dashboard_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Subscription>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM messaging_subscriptions
                 WHERE dashboard_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![dashboard_id], subscription_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_status(
    db: &Database,
    id: &str,
    status: SubscriptionStatus,
) -> Result<(), CourierError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE messaging_subscriptions
                 SET status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![status, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Rewrite a subscription's channel scope columns. Called from the
/// workspace sync path when platform channel metadata changes (renames,
/// migrations to a new channel id). Returns whether a row existed.
pub async fn update_channel_metadata(
    db: &Database,
    id: &str,
    channel_id: Option<String>,
    chat_id: Option<String>,
    team_id: Option<String>,
) -> Result<bool, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE messaging_subscriptions
                 SET channel_id = ?1, chat_id = ?2, team_id = ?3,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?4",
                params![channel_id, chat_id, team_id, id],
            )?;
            Ok(n == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a subscription. Buffered rows cascade. Returns whether a row
/// existed.
pub async fn delete_subscription(db: &Database, id: &str) -> Result<bool, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM messaging_subscriptions WHERE id = ?1",
                params![id],
            )?;
            Ok(n == 1)
        })
        .await
        .map_err(map_tr_err)
}
