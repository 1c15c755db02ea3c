// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Buffered-message queries: dedup insert, the atomic claim transition,
//! state finalization, and the scans backing fan-out and the scheduler.
//!
//! The state machine is re-entrant per row; every mutation here is either
//! the claim's conditional UPDATE or a single-row update keyed by id, so
//! concurrent workers never need a multi-row transaction.

use courier_core::{BufferStatus, BufferedMessage, CourierError, Provider};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{buffered_from_row, BUFFERED_COLUMNS};

/// Insert a buffered message. Returns `false` if the
/// `(subscription_id, platform_message_id)` pair already exists, which is
/// a successful no-op: platforms redeliver on slow acks.
pub async fn insert_message(db: &Database, msg: &BufferedMessage) -> Result<bool, CourierError> {
    let msg = msg.clone();
    let targets = serde_json::to_string(&msg.delivered_targets)
        .map_err(|e| CourierError::Internal(format!("serializing delivered targets: {e}")))?;
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "INSERT OR IGNORE INTO inbound_messages
                 (id, subscription_id, dashboard_id, item_id, provider, platform_message_id,
                  sender_id, sender_name, channel_id, channel_name, body, metadata,
                  status, delivery_attempts, claimed_at, delivered_targets, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                         ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    msg.id,
                    msg.subscription_id,
                    msg.dashboard_id,
                    msg.item_id,
                    msg.provider.to_string(),
                    msg.platform_message_id,
                    msg.sender_id,
                    msg.sender_name,
                    msg.channel_id,
                    msg.channel_name,
                    msg.text,
                    msg.metadata,
                    msg.status.to_string(),
                    msg.delivery_attempts,
                    msg.claimed_at,
                    targets,
                    msg.created_at,
                    msg.expires_at,
                ],
            )?;
            Ok(n == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<BufferedMessage>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<BufferedMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BUFFERED_COLUMNS} FROM inbound_messages WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], buffered_from_row) {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim a buffered message for delivery.
///
/// Succeeds for exactly one concurrent caller: the conditional UPDATE
/// moves `buffered` to `delivering`, increments the attempt counter and
/// stamps `claimed_at`, and affects zero rows for everyone who lost the
/// race (or if the message expired in the meantime).
pub async fn claim(db: &Database, id: &str) -> Result<bool, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE inbound_messages
                 SET status = 'delivering',
                     delivery_attempts = delivery_attempts + 1,
                     claimed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1
                   AND status = 'buffered'
                   AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![id],
            )?;
            Ok(n == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a claimed message fully delivered.
pub async fn mark_delivered(
    db: &Database,
    id: &str,
    delivered_targets: &[String],
) -> Result<(), CourierError> {
    finalize(db, id, BufferStatus::Delivered, delivered_targets).await
}

/// Mark a claimed message failed without waiting out the attempt cap.
/// Used when every destination explicitly denies it: a deliberate
/// non-delivery, so retrying would only burn attempts.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    delivered_targets: &[String],
) -> Result<(), CourierError> {
    finalize(db, id, BufferStatus::Failed, delivered_targets).await
}

async fn finalize(
    db: &Database,
    id: &str,
    status: BufferStatus,
    delivered_targets: &[String],
) -> Result<(), CourierError> {
    let id = id.to_string();
    let status = status.to_string();
    let targets = serde_json::to_string(delivered_targets)
        .map_err(|e| CourierError::Internal(format!("serializing delivered targets: {e}")))?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE inbound_messages
                 SET status = ?1, claimed_at = NULL, delivered_targets = ?2
                 WHERE id = ?3",
                params![status, targets, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Release a claimed message that is only waiting on policy
/// configuration, refunding the attempt the claim charged.
///
/// A destination whose policy does not exist yet is configuration in
/// progress, not a delivery failure: the message stays `buffered` at its
/// previous attempt count until the policy appears or the TTL expires.
pub async fn release_awaiting_policy(
    db: &Database,
    id: &str,
    delivered_targets: &[String],
) -> Result<(), CourierError> {
    let id = id.to_string();
    let targets = serde_json::to_string(delivered_targets)
        .map_err(|e| CourierError::Internal(format!("serializing delivered targets: {e}")))?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE inbound_messages
                 SET status = 'buffered',
                     delivery_attempts = MAX(delivery_attempts - 1, 0),
                     claimed_at = NULL,
                     delivered_targets = ?1
                 WHERE id = ?2 AND status = 'delivering'",
                params![targets, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Release a partially delivered message back for retry, keeping the
/// targets already satisfied so they are never written twice. Moves to
/// `failed` instead once the attempt cap is reached. Returns the status
/// the row ended up in.
pub async fn release_for_retry(
    db: &Database,
    id: &str,
    delivered_targets: &[String],
    max_attempts: i64,
) -> Result<BufferStatus, CourierError> {
    let id = id.to_string();
    let targets = serde_json::to_string(delivered_targets)
        .map_err(|e| CourierError::Internal(format!("serializing delivered targets: {e}")))?;
    let status = db
        .connection()
        .call(move |conn| -> Result<String, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE inbound_messages
                 SET status = CASE WHEN delivery_attempts >= ?1 THEN 'failed' ELSE 'buffered' END,
                     claimed_at = NULL,
                     delivered_targets = ?2
                 WHERE id = ?3 AND status = 'delivering'",
                params![max_attempts, targets, id],
            )?;
            let status = tx.query_row(
                "SELECT status FROM inbound_messages WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(status)
        })
        .await
        .map_err(map_tr_err)?;
    status
        .parse()
        .map_err(|_| CourierError::Internal(format!("unknown buffer status {status}")))
}

/// Oldest-first eligible buffered rows for one exact
/// `(dashboard, provider, item)` triple. Provider filtering keeps a block
/// with multiple platform subscriptions from cross-delivering.
pub async fn eligible_buffered(
    db: &Database,
    dashboard_id: &str,
    item_id: &str,
    provider: Provider,
    limit: i64,
) -> Result<Vec<BufferedMessage>, CourierError> {
    let dashboard_id = dashboard_id.to_string();
    let item_id = item_id.to_string();
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<BufferedMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BUFFERED_COLUMNS} FROM inbound_messages
                 WHERE dashboard_id = ?1 AND provider = ?2 AND item_id = ?3
                   AND status = 'buffered'
                   AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 ORDER BY created_at ASC
                 LIMIT ?4"
            ))?;
            let rows = stmt.query_map(
                params![dashboard_id, provider, item_id, limit],
                buffered_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_buffered(
    db: &Database,
    dashboard_id: &str,
    item_id: &str,
    provider: Provider,
) -> Result<i64, CourierError> {
    let dashboard_id = dashboard_id.to_string();
    let item_id = item_id.to_string();
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM inbound_messages
                 WHERE dashboard_id = ?1 AND provider = ?2 AND item_id = ?3
                   AND status = 'buffered'",
                params![dashboard_id, provider, item_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Expire buffered/failed rows past their TTL for one dashboard. Runs
/// eagerly at the start of every fan-out pass.
pub async fn expire_overdue_for_dashboard(
    db: &Database,
    dashboard_id: &str,
) -> Result<u64, CourierError> {
    let dashboard_id = dashboard_id.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE inbound_messages SET status = 'expired'
                 WHERE dashboard_id = ?1
                   AND status IN ('buffered', 'failed')
                   AND expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![dashboard_id],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Global TTL sweep for the watchdog.
pub async fn expire_overdue(db: &Database) -> Result<u64, CourierError> {
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE inbound_messages SET status = 'expired'
                 WHERE status IN ('buffered', 'failed')
                   AND expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Recover `delivering` rows abandoned by a crashed worker.
///
/// Rows claimed longer than `claim_timeout_secs` ago go back to `buffered`
/// (or to `failed` with attempts exhausted). Legacy rows with no claim
/// timestamp at all are judged by row age against the longer
/// `legacy_timeout_secs`. Returns `(requeued, failed)` counts.
pub async fn recover_stuck(
    db: &Database,
    claim_timeout_secs: i64,
    legacy_timeout_secs: i64,
    max_attempts: i64,
) -> Result<(u64, u64), CourierError> {
    db.connection()
        .call(move |conn| -> Result<(u64, u64), rusqlite::Error> {
            let stuck = "status = 'delivering' AND (
                 (claimed_at IS NOT NULL
                  AND claimed_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-' || ?1 || ' seconds'))
                 OR (claimed_at IS NULL
                  AND created_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-' || ?2 || ' seconds')))";

            let failed = conn.execute(
                &format!(
                    "UPDATE inbound_messages
                     SET status = 'failed', claimed_at = NULL
                     WHERE delivery_attempts >= ?3 AND {stuck}"
                ),
                params![claim_timeout_secs, legacy_timeout_secs, max_attempts],
            )? as u64;

            let requeued = conn.execute(
                &format!(
                    "UPDATE inbound_messages
                     SET status = 'buffered', claimed_at = NULL
                     WHERE delivery_attempts < ?3 AND {stuck}"
                ),
                params![claim_timeout_secs, legacy_timeout_secs, max_attempts],
            )? as u64;

            Ok((requeued, failed))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete terminal-state rows older than the retention window.
pub async fn purge_old(db: &Database, retention_days: i64) -> Result<u64, CourierError> {
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM inbound_messages
                 WHERE status IN ('delivered', 'expired')
                   AND created_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-' || ?1 || ' days')",
                params![retention_days],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct `(dashboard, item, provider)` triples that still have buffered
/// rows, bounded, for the periodic retry pass.
pub async fn buffered_triples(
    db: &Database,
    limit: i64,
) -> Result<Vec<(String, String, Provider)>, CourierError> {
    db.connection()
        .call(move |conn| -> Result<Vec<(String, String, Provider)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT dashboard_id, item_id, provider
                 FROM inbound_messages
                 WHERE status = 'buffered'
                 ORDER BY dashboard_id, item_id
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                let provider: String = row.get(2)?;
                let provider = provider.parse().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok((row.get(0)?, row.get(1)?, provider))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Buffered triples restricted to one dashboard, for the stale-wake path.
pub async fn buffered_triples_for_dashboard(
    db: &Database,
    dashboard_id: &str,
) -> Result<Vec<(String, String, Provider)>, CourierError> {
    let dashboard_id = dashboard_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<(String, String, Provider)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT dashboard_id, item_id, provider
                 FROM inbound_messages
                 WHERE status = 'buffered' AND dashboard_id = ?1",
            )?;
            let rows = stmt.query_map(params![dashboard_id], |row| {
                let provider: String = row.get(2)?;
                let provider = provider.parse().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok((row.get(0)?, row.get(1)?, provider))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Dashboards whose oldest buffered message is older than the staleness
/// threshold, rate-limited to `limit` per cycle.
pub async fn stale_dashboards(
    db: &Database,
    threshold_secs: i64,
    limit: i64,
) -> Result<Vec<String>, CourierError> {
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT dashboard_id, MIN(created_at) AS oldest
                 FROM inbound_messages
                 WHERE status = 'buffered'
                 GROUP BY dashboard_id
                 HAVING oldest < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-' || ?1 || ' seconds')
                 ORDER BY oldest ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![threshold_secs, limit], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        seed_subscription(&db).await;
        (db, dir)
    }

    async fn seed_subscription(db: &Database) {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO messaging_subscriptions
                     (id, dashboard_id, item_id, provider, webhook_id, webhook_secret)
                     VALUES ('sub-1', 'dash-1', 'item-1', 'slack', 'wh-1', 's')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
    }

    fn message(id: &str, platform_message_id: &str) -> BufferedMessage {
        BufferedMessage {
            id: id.to_string(),
            subscription_id: "sub-1".into(),
            dashboard_id: "dash-1".into(),
            item_id: "item-1".into(),
            provider: Provider::Slack,
            platform_message_id: platform_message_id.to_string(),
            sender_id: "U1".into(),
            sender_name: None,
            channel_id: "C1".into(),
            channel_name: None,
            text: "hello".into(),
            metadata: None,
            status: BufferStatus::Buffered,
            delivery_attempts: 0,
            claimed_at: None,
            delivered_targets: vec![],
            created_at: "2026-08-31T10:00:00.000Z".into(),
            expires_at: "2030-01-01T00:00:00.000Z".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_noop() {
        let (db, _dir) = setup_db().await;
        assert!(insert_message(&db, &message("m1", "pm1")).await.unwrap());
        assert!(!insert_message(&db, &message("m1-retry", "pm1")).await.unwrap());

        let loaded = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(loaded.text, "hello");
        assert!(get_message(&db, "m1-retry").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_succeeds_exactly_once() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &message("m1", "pm1")).await.unwrap();

        assert!(claim(&db, "m1").await.unwrap());
        assert!(!claim(&db, "m1").await.unwrap());

        let loaded = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(loaded.status, BufferStatus::Delivering);
        assert_eq!(loaded.delivery_attempts, 1);
        assert!(loaded.claimed_at.is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_refuses_expired_rows() {
        let (db, _dir) = setup_db().await;
        let mut msg = message("m1", "pm1");
        msg.expires_at = "2020-01-01T00:00:00.000Z".into();
        insert_message(&db, &msg).await.unwrap();
        assert!(!claim(&db, "m1").await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_keeps_delivered_targets_and_caps_attempts() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &message("m1", "pm1")).await.unwrap();

        // Attempt 1: partial delivery.
        assert!(claim(&db, "m1").await.unwrap());
        let status = release_for_retry(&db, "m1", &["term-1".into()], 3)
            .await
            .unwrap();
        assert_eq!(status, BufferStatus::Buffered);
        let loaded = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(loaded.delivered_targets, vec!["term-1".to_string()]);
        assert!(loaded.claimed_at.is_none());

        // Attempts 2 and 3: still failing the remaining target.
        assert!(claim(&db, "m1").await.unwrap());
        let status = release_for_retry(&db, "m1", &["term-1".into()], 3)
            .await
            .unwrap();
        assert_eq!(status, BufferStatus::Buffered);
        assert!(claim(&db, "m1").await.unwrap());
        let status = release_for_retry(&db, "m1", &["term-1".into()], 3)
            .await
            .unwrap();
        assert_eq!(status, BufferStatus::Failed);
        assert!(!claim(&db, "m1").await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn awaiting_policy_release_refunds_the_attempt() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &message("m1", "pm1")).await.unwrap();

        // Claim/release cycles beyond the attempt cap never move the
        // counter: configuration-in-progress is bounded by TTL, not by
        // attempts.
        for _ in 0..4 {
            assert!(claim(&db, "m1").await.unwrap());
            release_awaiting_policy(&db, "m1", &["note-1".into()])
                .await
                .unwrap();
        }
        let loaded = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(loaded.status, BufferStatus::Buffered);
        assert_eq!(loaded.delivery_attempts, 0);
        assert_eq!(loaded.delivered_targets, vec!["note-1".to_string()]);
        assert!(loaded.claimed_at.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn eligible_scan_is_oldest_first_and_provider_scoped() {
        let (db, _dir) = setup_db().await;
        let mut newer = message("m-new", "pm-new");
        newer.created_at = "2026-08-31T11:00:00.000Z".into();
        let mut older = message("m-old", "pm-old");
        older.created_at = "2026-08-31T09:00:00.000Z".into();
        let mut other_provider = message("m-tg", "pm-tg");
        other_provider.provider = Provider::Telegram;
        insert_message(&db, &newer).await.unwrap();
        insert_message(&db, &older).await.unwrap();
        insert_message(&db, &other_provider).await.unwrap();

        let rows = eligible_buffered(&db, "dash-1", "item-1", Provider::Slack, 50)
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m-old", "m-new"]);

        assert_eq!(count_buffered(&db, "dash-1", "item-1", Provider::Slack).await.unwrap(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ttl_expiry_hits_buffered_and_failed_rows() {
        let (db, _dir) = setup_db().await;
        let mut overdue = message("m1", "pm1");
        overdue.expires_at = "2020-01-01T00:00:00.000Z".into();
        insert_message(&db, &overdue).await.unwrap();
        insert_message(&db, &message("m2", "pm2")).await.unwrap();

        let n = expire_overdue_for_dashboard(&db, "dash-1").await.unwrap();
        assert_eq!(n, 1);
        let loaded = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(loaded.status, BufferStatus::Expired);
        let kept = get_message(&db, "m2").await.unwrap().unwrap();
        assert_eq!(kept.status, BufferStatus::Buffered);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn watchdog_requeues_stuck_and_fails_exhausted() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &message("m1", "pm1")).await.unwrap();
        insert_message(&db, &message("m2", "pm2")).await.unwrap();
        insert_message(&db, &message("m3", "pm3")).await.unwrap();

        // m1: stuck with a stale claim, one attempt.
        // m2: stuck with a stale claim, attempts exhausted.
        // m3: legacy row, delivering with no claim timestamp, old.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "UPDATE inbound_messages SET status = 'delivering', delivery_attempts = 1,
                        claimed_at = '2026-08-31T00:00:00.000Z' WHERE id = 'm1';
                     UPDATE inbound_messages SET status = 'delivering', delivery_attempts = 3,
                        claimed_at = '2026-08-31T00:00:00.000Z' WHERE id = 'm2';
                     UPDATE inbound_messages SET status = 'delivering', delivery_attempts = 1,
                        claimed_at = NULL, created_at = '2026-08-31T00:00:00.000Z' WHERE id = 'm3';",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let (requeued, failed) = recover_stuck(&db, 300, 900, 3).await.unwrap();
        assert_eq!(requeued, 2);
        assert_eq!(failed, 1);
        assert_eq!(
            get_message(&db, "m1").await.unwrap().unwrap().status,
            BufferStatus::Buffered
        );
        assert_eq!(
            get_message(&db, "m2").await.unwrap().unwrap().status,
            BufferStatus::Failed
        );
        assert_eq!(
            get_message(&db, "m3").await.unwrap().unwrap().status,
            BufferStatus::Buffered
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn watchdog_leaves_fresh_claims_alone() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &message("m1", "pm1")).await.unwrap();
        assert!(claim(&db, "m1").await.unwrap());

        let (requeued, failed) = recover_stuck(&db, 300, 900, 3).await.unwrap();
        assert_eq!((requeued, failed), (0, 0));
        assert_eq!(
            get_message(&db, "m1").await.unwrap().unwrap().status,
            BufferStatus::Delivering
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_only_old_terminal_rows() {
        let (db, _dir) = setup_db().await;
        let mut old_delivered = message("m1", "pm1");
        old_delivered.created_at = "2026-08-01T00:00:00.000Z".into();
        insert_message(&db, &old_delivered).await.unwrap();
        mark_delivered(&db, "m1", &["term-1".into()]).await.unwrap();

        let mut old_buffered = message("m2", "pm2");
        old_buffered.created_at = "2026-08-01T00:00:00.000Z".into();
        insert_message(&db, &old_buffered).await.unwrap();

        let n = purge_old(&db, 7).await.unwrap();
        assert_eq!(n, 1);
        assert!(get_message(&db, "m1").await.unwrap().is_none());
        assert!(get_message(&db, "m2").await.unwrap().is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn triples_and_stale_dashboard_scans() {
        let (db, _dir) = setup_db().await;
        let mut msg = message("m1", "pm1");
        msg.created_at = "2026-08-31T00:00:00.000Z".into();
        insert_message(&db, &msg).await.unwrap();

        let triples = buffered_triples(&db, 20).await.unwrap();
        assert_eq!(
            triples,
            vec![("dash-1".to_string(), "item-1".to_string(), Provider::Slack)]
        );

        let stale = stale_dashboards(&db, 30, 3).await.unwrap();
        assert_eq!(stale, vec!["dash-1".to_string()]);

        // A freshly delivered buffer is no longer stale.
        assert!(claim(&db, "m1").await.unwrap());
        mark_delivered(&db, "m1", &[]).await.unwrap();
        assert!(stale_dashboards(&db, 30, 3).await.unwrap().is_empty());
        assert!(buffered_triples(&db, 20).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_claims_take_distinct_messages() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            insert_message(&db, &message(&format!("m{i}"), &format!("pm{i}")))
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..3 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let mut won = 0;
                for i in 0..5 {
                    if claim(&db, &format!("m{i}")).await.unwrap() {
                        won += 1;
                    }
                }
                won
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        // Each message is claimed by exactly one worker.
        assert_eq!(total, 5);
        db.close().await.unwrap();
    }
}
