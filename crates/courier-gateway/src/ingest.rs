// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared ingest pipeline behind every webhook endpoint.
//!
//! After a handler has verified the request and normalized the payload,
//! this routes the message to its subscriptions, enriches names where the
//! platform only ships ids, buffers one row per match, and kicks off
//! delivery in the background so the platform gets its ack immediately.

use std::time::Duration;

use courier_core::{CourierError, NormalizedMessage, Provider, Subscription};
use courier_ingest::resolve::{enrich, SlackResolver};
use courier_router::{route, RequestHints};
use courier_storage::{new_buffered_message, queries::buffer};
use metrics::counter;
use tracing::{debug, warn};

use crate::server::GatewayState;

/// Route one verified, normalized message and buffer a row per match.
///
/// Returns the number of rows actually buffered (duplicates redelivered by
/// the platform count zero). Fan-out is spawned for every match, including
/// duplicates, since an earlier row may still be sitting buffered.
pub async fn process_inbound(
    state: &GatewayState,
    provider: Provider,
    message: NormalizedMessage,
    hints: &RequestHints,
    candidates: &[Subscription],
) -> Result<usize, CourierError> {
    let matches = route(provider, &message, hints, candidates)?;
    if matches.is_empty() {
        debug!(provider = %provider, "inbound message matched no subscriptions");
        counter!("courier_ingest_total", "provider" => provider.to_string(), "result" => "unmatched")
            .increment(1);
        return Ok(0);
    }

    let mut buffered = 0;
    for route_match in matches {
        let sub = route_match.subscription;
        let mut message = route_match.message;

        if provider == Provider::Slack {
            if let Some(token) = &sub.access_token {
                let resolver = SlackResolver::new(token);
                let timeout = Duration::from_millis(state.config.delivery.resolve_timeout_ms);
                enrich(&mut message, &resolver, timeout).await;
            }
        }

        let row = new_buffered_message(&sub, &message, state.config.delivery.ttl_hours);
        let inserted = buffer::insert_message(&state.db, &row).await?;
        if inserted {
            buffered += 1;
            counter!("courier_ingest_total", "provider" => provider.to_string(), "result" => "buffered")
                .increment(1);
        } else {
            debug!(
                subscription_id = %sub.id,
                platform_message_id = %message.platform_message_id,
                "duplicate platform message, not re-buffered"
            );
            counter!("courier_ingest_total", "provider" => provider.to_string(), "result" => "duplicate")
                .increment(1);
        }

        let engine = state.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine
                .fan_out_with_retries(&sub.dashboard_id, &sub.item_id, sub.provider)
                .await
            {
                warn!(
                    dashboard_id = %sub.dashboard_id,
                    item_id = %sub.item_id,
                    error = %e,
                    "background fan-out failed"
                );
            }
        });
    }
    Ok(buffered)
}
