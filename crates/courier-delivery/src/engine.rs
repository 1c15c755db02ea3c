// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out delivery engine.
//!
//! One fan-out pass serves exactly one `(dashboard, item, provider)`
//! triple: expire overdue rows, scan eligible buffered messages oldest
//! first, claim each, and write to every remaining destination. A failed
//! destination never blocks the others of the same message; it only
//! decides that message's own retry/failure outcome.

use std::sync::Arc;

use courier_config::model::DeliveryConfig;
use courier_core::{
    BlockStore, BufferStatus, BufferedMessage, CourierError, Destination, DestinationKind,
    ExecTarget, ItemGraph, Provider, SessionAccess,
};
use courier_policy::{destination_decision, Decision};
use courier_storage::{queries::buffer, Database};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::sanitize::sanitize_for_terminal;

pub struct DeliveryEngine {
    db: Database,
    graph: Arc<dyn ItemGraph>,
    exec: Arc<dyn ExecTarget>,
    blocks: Arc<dyn BlockStore>,
    config: DeliveryConfig,
}

impl DeliveryEngine {
    pub fn new(
        db: Database,
        graph: Arc<dyn ItemGraph>,
        exec: Arc<dyn ExecTarget>,
        blocks: Arc<dyn BlockStore>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            db,
            graph,
            exec,
            blocks,
            config,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn exec(&self) -> &Arc<dyn ExecTarget> {
        &self.exec
    }

    /// One full fan-out pass for a `(dashboard, item, provider)` triple.
    pub async fn fan_out(
        &self,
        dashboard_id: &str,
        item_id: &str,
        provider: Provider,
    ) -> Result<(), CourierError> {
        let expired = buffer::expire_overdue_for_dashboard(&self.db, dashboard_id).await?;
        if expired > 0 {
            debug!(dashboard_id, expired, "expired overdue buffered messages");
        }

        let batch = buffer::eligible_buffered(
            &self.db,
            dashboard_id,
            item_id,
            provider,
            self.config.batch_size,
        )
        .await?;
        if batch.is_empty() {
            return Ok(());
        }
        debug!(dashboard_id, item_id, %provider, batch = batch.len(), "fan-out pass");

        // One session lookup per pass, not per message.
        let mut session: Option<SessionAccess> = None;
        for stale in batch {
            // Concurrent workers race here; losing the claim means another
            // worker owns this message for this attempt.
            if !buffer::claim(&self.db, &stale.id).await? {
                continue;
            }
            let Some(msg) = buffer::get_message(&self.db, &stale.id).await? else {
                continue;
            };
            self.deliver_one(&msg, &mut session).await?;
        }
        Ok(())
    }

    /// Fan-out plus the short inline retry ladder, covering destinations
    /// that are still starting up when the first attempt lands.
    pub async fn fan_out_with_retries(
        &self,
        dashboard_id: &str,
        item_id: &str,
        provider: Provider,
    ) -> Result<(), CourierError> {
        self.fan_out(dashboard_id, item_id, provider).await?;
        for delay_secs in self.config.immediate_retry_secs.clone() {
            if buffer::count_buffered(&self.db, dashboard_id, item_id, provider).await? == 0 {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_secs(delay_secs)).await;
            self.fan_out(dashboard_id, item_id, provider).await?;
        }
        Ok(())
    }

    /// Deliver one claimed message to every destination not yet satisfied.
    async fn deliver_one(
        &self,
        msg: &BufferedMessage,
        session: &mut Option<SessionAccess>,
    ) -> Result<(), CourierError> {
        let destinations = self.graph.destinations(&msg.item_id).await?;
        let mut delivered = msg.delivered_targets.clone();
        let mut failed = 0usize;
        let mut awaiting_policy = 0usize;
        let mut denied = 0usize;

        for dest in &destinations {
            if delivered.contains(&dest.item_id) {
                continue;
            }
            // Policy is read live at delivery time, never from buffer time.
            let decision = destination_decision(
                self.graph.as_ref(),
                msg.provider,
                &msg.item_id,
                dest,
                msg,
            )
            .await?;
            match decision {
                Decision::Deny => {
                    debug!(message_id = %msg.id, item_id = %dest.item_id, "destination denied");
                    denied += 1;
                }
                Decision::NotConfigured => {
                    awaiting_policy += 1;
                }
                Decision::Deliver => match self.write_destination(msg, dest, session).await {
                    Ok(()) => delivered.push(dest.item_id.clone()),
                    Err(e) => {
                        warn!(
                            message_id = %msg.id,
                            item_id = %dest.item_id,
                            error = %e,
                            "destination write failed"
                        );
                        failed += 1;
                    }
                },
            }
        }

        if failed == 0 && awaiting_policy == 0 {
            if delivered.is_empty() && denied > 0 {
                // Every destination said no and nothing was ever written:
                // a deliberate non-delivery, not worth further attempts.
                buffer::mark_failed(&self.db, &msg.id, &delivered).await?;
                counter!("courier_deliveries_total", "result" => "denied").increment(1);
                info!(message_id = %msg.id, "message denied by every destination policy");
            } else {
                buffer::mark_delivered(&self.db, &msg.id, &delivered).await?;
                counter!("courier_deliveries_total", "result" => "delivered").increment(1);
                info!(message_id = %msg.id, targets = delivered.len(), "message delivered");
            }
        } else if failed == 0 && awaiting_policy > 0 {
            // Configuration in progress, not a failed attempt: the claim's
            // attempt increment is refunded so the attempt cap only counts
            // real write failures. The TTL bounds never-configured rows.
            buffer::release_awaiting_policy(&self.db, &msg.id, &delivered).await?;
            counter!("courier_deliveries_total", "result" => "awaiting_policy").increment(1);
            debug!(
                message_id = %msg.id,
                awaiting_policy,
                "destination policy not configured yet, message kept buffered"
            );
        } else {
            let status =
                buffer::release_for_retry(&self.db, &msg.id, &delivered, self.config.max_attempts)
                    .await?;
            counter!("courier_deliveries_total", "result" => "retry").increment(1);
            if status == BufferStatus::Failed {
                warn!(
                    message_id = %msg.id,
                    attempts = msg.delivery_attempts,
                    "message failed after exhausting attempts"
                );
            } else {
                debug!(
                    message_id = %msg.id,
                    failed,
                    awaiting_policy,
                    "message released for retry"
                );
            }
        }
        Ok(())
    }

    async fn write_destination(
        &self,
        msg: &BufferedMessage,
        dest: &Destination,
        session: &mut Option<SessionAccess>,
    ) -> Result<(), CourierError> {
        match dest.kind {
            DestinationKind::Terminal => {
                let access = match session {
                    Some(access) => access.clone(),
                    None => {
                        let access = self.exec.ensure_session(&msg.dashboard_id).await?;
                        *session = Some(access.clone());
                        access
                    }
                };
                let handle = match access {
                    SessionAccess::Granted(handle) => handle,
                    SessionAccess::Denied => {
                        return Err(CourierError::Delivery {
                            message: format!(
                                "session access denied for dashboard {}",
                                msg.dashboard_id
                            ),
                            source: None,
                        });
                    }
                };
                let terminal = self.exec.resolve_terminal(&handle, &dest.item_id).await?;
                let line = format_terminal_line(msg);
                self.exec.write_terminal(&terminal, &line).await
            }
            DestinationKind::Note => {
                self.blocks
                    .append_note(&msg.dashboard_id, &dest.item_id, &format_message(msg))
                    .await
            }
            DestinationKind::Prompt => {
                self.blocks
                    .replace_prompt(&msg.dashboard_id, &dest.item_id, &format_message(msg))
                    .await
            }
        }
    }
}

/// Human-readable one-liner for note/prompt destinations.
fn format_message(msg: &BufferedMessage) -> String {
    let sender = msg.sender_name.as_deref().unwrap_or(&msg.sender_id);
    let channel = msg.channel_name.as_deref().unwrap_or(&msg.channel_id);
    format!("[{}] {} in {}: {}", msg.provider, sender, channel, msg.text)
}

/// Terminal variant: every untrusted field sanitized, trailing newline to
/// submit the line.
fn format_terminal_line(msg: &BufferedMessage) -> String {
    let sender = sanitize_for_terminal(msg.sender_name.as_deref().unwrap_or(&msg.sender_id));
    let channel = sanitize_for_terminal(msg.channel_name.as_deref().unwrap_or(&msg.channel_id));
    let text = sanitize_for_terminal(&msg.text);
    format!("[{}] {} in {}: {}\n", msg.provider, sender, channel, text)
}
