// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-platform webhook receivers.
//!
//! Every handler follows the same shape: verify the platform credential
//! over the raw body, normalize the payload, then hand off to the shared
//! ingest pipeline and return the platform's expected ack. Verification
//! failures are rejected before the body is parsed; unroutable messages
//! are acked and dropped so the platform stops redelivering them.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use courier_core::{CourierError, Provider};
use courier_router::RequestHints;
use courier_storage::queries::subscriptions as sub_queries;
use metrics::counter;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::ingest::process_inbound;
use crate::server::GatewayState;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Convert an ingest outcome into the platform ack.
///
/// Unroutable messages get the ack anyway: the scoping field is missing
/// from the event itself, so a redelivery can never succeed. Storage
/// trouble surfaces as a 500, which the platforms treat as retryable.
fn ack_after(result: Result<usize, CourierError>, provider: Provider, ack: Response) -> Response {
    match result {
        Ok(_) => ack,
        Err(CourierError::Unroutable(reason)) => {
            warn!(provider = %provider, reason = %reason, "dropping unroutable inbound message");
            counter!("courier_ingest_total", "provider" => provider.to_string(), "result" => "unroutable")
                .increment(1);
            ack
        }
        Err(e) => {
            error!(provider = %provider, error = %e, "webhook ingest failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Slack Events API receiver.
///
/// The `url_verification` challenge is only echoed after the signature
/// checks out, so the endpoint never vouches for an unverified caller.
pub async fn slack(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(secret) = state.config.slack.signing_secret.as_deref() else {
        warn!("slack webhook received but no signing secret is configured");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let timestamp = header(&headers, "x-slack-request-timestamp");
    let signature = header(&headers, "x-slack-signature");
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !courier_verify::slack::verify(secret, timestamp, signature, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    if payload.get("type").and_then(Value::as_str) == Some("url_verification") {
        let challenge = payload.get("challenge").and_then(Value::as_str).unwrap_or("");
        return Json(json!({ "challenge": challenge })).into_response();
    }

    let Some(event) = payload.get("event") else {
        return StatusCode::OK.into_response();
    };
    let event_id = payload.get("event_id").and_then(Value::as_str).unwrap_or("");
    let Some(message) = courier_ingest::slack::parse(event, event_id) else {
        return StatusCode::OK.into_response();
    };

    let hints = RequestHints {
        team_id: payload
            .get("team_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        webhook_id: None,
    };
    let candidates = match sub_queries::list_by_provider(&state.db, Provider::Slack).await {
        Ok(subs) => subs,
        Err(e) => {
            error!(error = %e, "failed to load slack subscriptions");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ack_after(
        process_inbound(&state, Provider::Slack, message, &hints, &candidates).await,
        Provider::Slack,
        StatusCode::OK.into_response(),
    )
}

/// Discord interactions receiver.
///
/// Discord requires a PONG for its PING health checks and an interaction
/// response within three seconds, so the ack is an ephemeral
/// acknowledgement while delivery runs in the background.
pub async fn discord(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(public_key) = state.discord_public_key.as_ref() else {
        warn!("discord webhook received but no public key is configured");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let signature = header(&headers, "x-signature-ed25519");
    let timestamp = header(&headers, "x-signature-timestamp");
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !courier_verify::discord::verify(public_key, signature, timestamp, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match payload.get("type").and_then(Value::as_i64) {
        // PING -> PONG
        Some(1) => Json(json!({ "type": 1 })).into_response(),
        // APPLICATION_COMMAND
        Some(2) => {
            let ack = Json(json!({
                "type": 4,
                "data": { "content": "Message received.", "flags": 64 }
            }))
            .into_response();
            let Some(message) = courier_ingest::discord::parse(&payload) else {
                return ack;
            };
            let candidates = match sub_queries::list_by_provider(&state.db, Provider::Discord).await
            {
                Ok(subs) => subs,
                Err(e) => {
                    error!(error = %e, "failed to load discord subscriptions");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            ack_after(
                process_inbound(
                    &state,
                    Provider::Discord,
                    message,
                    &RequestHints::default(),
                    &candidates,
                )
                .await,
                Provider::Discord,
                ack,
            )
        }
        _ => StatusCode::OK.into_response(),
    }
}

/// Telegram Bot API receiver, one URL per subscription.
///
/// The path-embedded webhook id identifies the subscription; its stored
/// secret must match the `X-Telegram-Bot-Api-Secret-Token` header set at
/// registration time.
pub async fn telegram(
    State(state): State<GatewayState>,
    Path(webhook_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let sub = match sub_queries::find_by_webhook_id(&state.db, &webhook_id).await {
        Ok(sub) => sub,
        Err(e) => {
            error!(error = %e, "failed to look up telegram subscription");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let Some(sub) = sub else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let secret_header = header(&headers, "x-telegram-bot-api-secret-token");
    if !courier_verify::telegram::verify(&sub.webhook_secret, secret_header) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let Some(message) = courier_ingest::telegram::parse(&payload) else {
        return StatusCode::OK.into_response();
    };

    let hints = RequestHints {
        team_id: None,
        webhook_id: Some(webhook_id),
    };
    let candidates = [sub];

    ack_after(
        process_inbound(&state, Provider::Telegram, message, &hints, &candidates).await,
        Provider::Telegram,
        StatusCode::OK.into_response(),
    )
}

/// Meta webhook subscription handshake (`hub.challenge` echo).
pub async fn whatsapp_verify(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(expected) = state.config.whatsapp.verify_token.as_deref() else {
        return StatusCode::FORBIDDEN.into_response();
    };
    if params.get("hub.mode").map(String::as_str) == Some("subscribe")
        && params.get("hub.verify_token").map(String::as_str) == Some(expected)
    {
        if let Some(challenge) = params.get("hub.challenge") {
            return challenge.clone().into_response();
        }
    }
    StatusCode::FORBIDDEN.into_response()
}

/// WhatsApp Cloud API receiver.
///
/// One payload can batch several messages; each routes independently, and
/// an unroutable entry never blocks the rest of the batch.
pub async fn whatsapp(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(app_secret) = state.config.whatsapp.app_secret.as_deref() else {
        warn!("whatsapp webhook received but no app secret is configured");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Some(signature) = header(&headers, "x-hub-signature-256") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !courier_verify::whatsapp::verify(app_secret, signature, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let messages = courier_ingest::whatsapp::parse_batch(&payload);
    if messages.is_empty() {
        return StatusCode::OK.into_response();
    }

    let candidates = match sub_queries::list_by_provider(&state.db, Provider::Whatsapp).await {
        Ok(subs) => subs,
        Err(e) => {
            error!(error = %e, "failed to load whatsapp subscriptions");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    for message in messages {
        match process_inbound(
            &state,
            Provider::Whatsapp,
            message,
            &RequestHints::default(),
            &candidates,
        )
        .await
        {
            Ok(_) => {}
            Err(CourierError::Unroutable(reason)) => {
                warn!(reason = %reason, "dropping unroutable whatsapp message");
                counter!("courier_ingest_total", "provider" => "whatsapp", "result" => "unroutable")
                    .increment(1);
            }
            Err(e) => {
                error!(error = %e, "whatsapp ingest failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }
    StatusCode::OK.into_response()
}

/// Microsoft Teams outgoing-webhook receiver.
pub async fn teams(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(token) = state.config.teams.security_token.as_deref() else {
        warn!("teams webhook received but no security token is configured");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Some(authorization) = header(&headers, "authorization") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !courier_verify::teams::verify(token, authorization, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    // Teams expects a message-shaped reply; an empty text renders nothing.
    let ack = Json(json!({ "type": "message", "text": "" })).into_response();

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let Some(message) = courier_ingest::teams::parse(&payload) else {
        return ack;
    };

    let candidates = match sub_queries::list_by_provider(&state.db, Provider::Teams).await {
        Ok(subs) => subs,
        Err(e) => {
            error!(error = %e, "failed to load teams subscriptions");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ack_after(
        process_inbound(
            &state,
            Provider::Teams,
            message,
            &RequestHints::default(),
            &candidates,
        )
        .await,
        Provider::Teams,
        ack,
    )
}

/// Mattermost outgoing-webhook receiver.
///
/// The shared token rides inside the JSON payload rather than a header.
pub async fn mattermost(State(state): State<GatewayState>, body: Bytes) -> Response {
    let Some(token) = state.config.mattermost.outgoing_token.as_deref() else {
        warn!("mattermost webhook received but no outgoing token is configured");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let payload_token = payload.get("token").and_then(Value::as_str);
    if !courier_verify::mattermost::verify(token, payload_token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    // An empty JSON object tells Mattermost not to post a reply.
    let ack = Json(json!({})).into_response();

    let Some(message) = courier_ingest::mattermost::parse(&payload) else {
        return ack;
    };

    let candidates = match sub_queries::list_by_provider(&state.db, Provider::Mattermost).await {
        Ok(subs) => subs,
        Err(e) => {
            error!(error = %e, "failed to load mattermost subscriptions");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ack_after(
        process_inbound(
            &state,
            Provider::Mattermost,
            message,
            &RequestHints::default(),
            &candidates,
        )
        .await,
        Provider::Mattermost,
        ack,
    )
}

/// Google Chat receiver.
///
/// TODO: verify Google Chat's bearer token against Google's JWKS and add
/// an event parser; until then the endpoint rejects everything.
pub async fn googlechat() -> StatusCode {
    StatusCode::UNAUTHORIZED
}
