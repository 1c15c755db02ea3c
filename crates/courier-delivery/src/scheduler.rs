// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reliability scheduler: the periodic routines that keep the buffer
//! moving without manual intervention.
//!
//! All three loops are idempotent and safe to run concurrently with each
//! other and with inline fan-out; they coordinate purely through the
//! buffer's claim primitive.

use std::sync::Arc;
use std::time::Duration;

use courier_config::model::{DeliveryConfig, SchedulerConfig};
use courier_storage::queries::buffer;
use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::DeliveryEngine;

/// Rows in `delivering` with no claim timestamp predate the claim column;
/// they get the benefit of a much longer doubt before recovery.
const LEGACY_CLAIM_TIMEOUT_SECS: i64 = 900;

pub struct Scheduler {
    engine: Arc<DeliveryEngine>,
    config: SchedulerConfig,
    delivery: DeliveryConfig,
}

impl Scheduler {
    pub fn new(
        engine: Arc<DeliveryEngine>,
        config: SchedulerConfig,
        delivery: DeliveryConfig,
    ) -> Self {
        Self {
            engine,
            config,
            delivery,
        }
    }

    /// Spawn the retry, stale-wake, and watchdog loops. They run until
    /// `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let retry = spawn_loop(
            "buffered-retry",
            Duration::from_secs(self.config.buffered_retry_secs),
            cancel.clone(),
            {
                let engine = self.engine.clone();
                let batch = self.config.buffered_retry_batch;
                move || {
                    let engine = engine.clone();
                    async move { retry_pass(&engine, batch).await }
                }
            },
        );

        let stale = spawn_loop(
            "stale-wake",
            Duration::from_secs(self.config.stale_wake_secs),
            cancel.clone(),
            {
                let engine = self.engine.clone();
                let threshold = self.config.staleness_threshold_secs;
                let max_dashboards = self.config.stale_wake_max_dashboards;
                move || {
                    let engine = engine.clone();
                    async move { stale_wake_pass(&engine, threshold, max_dashboards).await }
                }
            },
        );

        let watchdog = spawn_loop(
            "watchdog",
            Duration::from_secs(self.config.watchdog_secs),
            cancel,
            {
                let engine = self.engine.clone();
                let delivery = self.delivery.clone();
                move || {
                    let engine = engine.clone();
                    let delivery = delivery.clone();
                    async move { watchdog_pass(&engine, &delivery).await }
                }
            },
        );

        vec![retry, stale, watchdog]
    }
}

fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut pass: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), courier_core::CourierError>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The immediate first tick; inline fan-out already covered startup.
        interval.tick().await;
        info!(loop_name = name, period_secs = period.as_secs(), "scheduler loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(loop_name = name, "scheduler loop stopped");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = pass().await {
                        warn!(loop_name = name, error = %e, "scheduler pass failed");
                    }
                }
            }
        }
    })
}

/// Re-attempt fan-out for a bounded batch of triples with buffered rows.
async fn retry_pass(
    engine: &DeliveryEngine,
    batch: i64,
) -> Result<(), courier_core::CourierError> {
    let triples = buffer::buffered_triples(engine.db(), batch).await?;
    for (dashboard_id, item_id, provider) in triples {
        if let Err(e) = engine.fan_out(&dashboard_id, &item_id, provider).await {
            warn!(dashboard_id, item_id, %provider, error = %e, "retry fan-out failed");
        }
    }
    Ok(())
}

/// Wake dashboards whose execution environment is asleep while messages
/// sit buffered past the staleness threshold. Rate-limited per cycle to
/// avoid a thundering herd on shared infrastructure.
async fn stale_wake_pass(
    engine: &DeliveryEngine,
    threshold_secs: i64,
    max_dashboards: i64,
) -> Result<(), courier_core::CourierError> {
    let stale = buffer::stale_dashboards(engine.db(), threshold_secs, max_dashboards).await?;
    for dashboard_id in stale {
        if engine.exec().is_running(&dashboard_id).await? {
            continue;
        }
        debug!(dashboard_id, "waking dashboard for stale buffered messages");
        counter!("courier_stale_wakes_total").increment(1);
        if let Err(e) = engine.exec().ensure_session(&dashboard_id).await {
            warn!(dashboard_id, error = %e, "wake failed");
            continue;
        }
        for (dashboard_id, item_id, provider) in
            buffer::buffered_triples_for_dashboard(engine.db(), &dashboard_id).await?
        {
            if let Err(e) = engine.fan_out(&dashboard_id, &item_id, provider).await {
                warn!(dashboard_id, item_id, %provider, error = %e, "post-wake fan-out failed");
            }
        }
    }
    Ok(())
}

/// Recover crashed workers, expire overdue rows, purge old terminal rows.
async fn watchdog_pass(
    engine: &DeliveryEngine,
    delivery: &DeliveryConfig,
) -> Result<(), courier_core::CourierError> {
    let (requeued, failed) = buffer::recover_stuck(
        engine.db(),
        delivery.claim_timeout_secs,
        LEGACY_CLAIM_TIMEOUT_SECS,
        delivery.max_attempts,
    )
    .await?;
    if requeued > 0 || failed > 0 {
        info!(requeued, failed, "watchdog recovered stuck messages");
        counter!("courier_watchdog_recovered_total").increment(requeued + failed);
    }

    let expired = buffer::expire_overdue(engine.db()).await?;
    if expired > 0 {
        debug!(expired, "watchdog expired overdue messages");
    }

    let purged = buffer::purge_old(engine.db(), delivery.retention_days).await?;
    if purged > 0 {
        debug!(purged, "watchdog purged old terminal rows");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{
        BufferStatus, DestinationKind, NormalizedMessage, Provider, Subscription,
        SubscriptionStatus,
    };
    use courier_storage::queries::{graph, subscriptions};
    use courier_storage::{new_buffered_message, Database, SqliteGraph};
    use courier_test_utils::{MockBlockStore, MockExecTarget};
    use tempfile::tempdir;

    fn delivery_config() -> DeliveryConfig {
        DeliveryConfig {
            max_attempts: 3,
            batch_size: 50,
            claim_timeout_secs: 300,
            ttl_hours: 24,
            retention_days: 7,
            immediate_retry_secs: vec![],
            resolve_timeout_ms: 1500,
        }
    }

    fn subscription() -> Subscription {
        Subscription {
            id: "sub-1".into(),
            dashboard_id: "dash-1".into(),
            item_id: "item-1".into(),
            provider: Provider::Slack,
            channel_id: Some("C1".into()),
            chat_id: None,
            team_id: Some("T1".into()),
            webhook_id: "wh-1".into(),
            webhook_secret: "s".into(),
            access_token: None,
            status: SubscriptionStatus::Active,
            created_at: "2026-08-31T00:00:00.000Z".into(),
            updated_at: "2026-08-31T00:00:00.000Z".into(),
        }
    }

    async fn setup() -> (Arc<DeliveryEngine>, Arc<MockExecTarget>, Database, tempfile::TempDir)
    {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        subscriptions::create_subscription(&db, &subscription())
            .await
            .unwrap();
        graph::add_link(&db, "item-1", "note-1", DestinationKind::Note)
            .await
            .unwrap();
        let exec = Arc::new(MockExecTarget::new());
        let engine = Arc::new(DeliveryEngine::new(
            db.clone(),
            Arc::new(SqliteGraph::new(db.clone())),
            exec.clone(),
            Arc::new(MockBlockStore::new()),
            delivery_config(),
        ));
        (engine, exec, db, dir)
    }

    fn buffered(pm_id: &str, created_at: &str) -> courier_core::BufferedMessage {
        let mut msg = new_buffered_message(
            &subscription(),
            &NormalizedMessage {
                platform_message_id: pm_id.to_string(),
                sender_id: "U1".into(),
                sender_name: None,
                channel_id: "C1".into(),
                channel_name: None,
                text: "hi".into(),
                metadata: serde_json::Value::Null,
            },
            24,
        );
        msg.created_at = created_at.to_string();
        msg
    }

    #[tokio::test]
    async fn retry_pass_drains_buffered_triples() {
        let (engine, _exec, db, _dir) = setup().await;
        buffer::insert_message(&db, &buffered("pm1", "2026-08-31T00:00:00.000Z"))
            .await
            .unwrap();

        retry_pass(&engine, 20).await.unwrap();
        let triples = buffer::buffered_triples(&db, 20).await.unwrap();
        assert!(triples.is_empty());
    }

    #[tokio::test]
    async fn stale_wake_only_touches_sleeping_dashboards() {
        let (engine, exec, db, _dir) = setup().await;
        buffer::insert_message(&db, &buffered("pm1", "2026-08-31T00:00:00.000Z"))
            .await
            .unwrap();

        // Running environment: no wake, no fan-out from this path.
        exec.set_running(true);
        stale_wake_pass(&engine, 30, 3).await.unwrap();
        assert!(exec.wakes().is_empty());

        // Sleeping environment: wake then drain.
        exec.set_running(false);
        stale_wake_pass(&engine, 30, 3).await.unwrap();
        assert_eq!(exec.wakes(), vec!["dash-1".to_string()]);
        assert!(buffer::buffered_triples(&db, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watchdog_pass_recovers_and_cleans() {
        let (engine, _exec, db, _dir) = setup().await;
        buffer::insert_message(&db, &buffered("pm1", "2026-08-31T00:00:00.000Z"))
            .await
            .unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "UPDATE inbound_messages SET status = 'delivering',
                        delivery_attempts = 1, claimed_at = '2026-08-31T00:00:00.000Z'",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        watchdog_pass(&engine, &delivery_config()).await.unwrap();
        let triples = buffer::buffered_triples(&db, 20).await.unwrap();
        assert_eq!(triples.len(), 1);
    }

    #[tokio::test]
    async fn spawned_loops_stop_on_cancellation() {
        let (engine, _exec, _db, _dir) = setup().await;
        let scheduler = Scheduler::new(
            engine,
            SchedulerConfig {
                buffered_retry_secs: 3600,
                buffered_retry_batch: 20,
                stale_wake_secs: 3600,
                stale_wake_max_dashboards: 3,
                staleness_threshold_secs: 30,
                watchdog_secs: 3600,
            },
            delivery_config(),
        );
        let cancel = CancellationToken::new();
        let handles = scheduler.spawn(cancel.clone());
        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
