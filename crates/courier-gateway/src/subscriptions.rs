// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-protected subscription management API.
//!
//! Creating a subscription mints its webhook id and secret server-side.
//! Telegram subscriptions additionally register the webhook with the Bot
//! API: they start `pending` and move to `active` or `error` depending on
//! how registration goes. A subscription in `error` still exists and can
//! be deleted and recreated.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use courier_core::{CourierError, Provider, Subscription, SubscriptionStatus};
use courier_storage::{now_rfc3339, queries::subscriptions as sub_queries};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::server::GatewayState;

const WEBHOOK_SECRET_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub dashboard_id: String,
    pub item_id: String,
    pub provider: Provider,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub dashboard_id: String,
}

/// API error wrapper mapping storage and registration failures to
/// status codes.
pub struct ApiError(CourierError);

impl From<CourierError> for ApiError {
    fn from(e: CourierError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CourierError::Registration { .. } => StatusCode::CONFLICT,
            CourierError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn generate_webhook_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(WEBHOOK_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// POST /v1/subscriptions
pub async fn create(
    State(state): State<GatewayState>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<Response, ApiError> {
    let now = now_rfc3339();
    let initial_status = if req.provider == Provider::Telegram {
        SubscriptionStatus::Pending
    } else {
        SubscriptionStatus::Active
    };
    let mut sub = Subscription {
        id: uuid::Uuid::new_v4().to_string(),
        dashboard_id: req.dashboard_id,
        item_id: req.item_id,
        provider: req.provider,
        channel_id: req.channel_id,
        chat_id: req.chat_id,
        team_id: req.team_id,
        webhook_id: uuid::Uuid::new_v4().to_string(),
        webhook_secret: generate_webhook_secret(),
        access_token: req.access_token,
        status: initial_status,
        created_at: now.clone(),
        updated_at: now,
    };

    sub_queries::create_subscription(&state.db, &sub).await?;

    if sub.provider == Provider::Telegram {
        match state.registrar.register(&sub).await {
            Ok(()) => {
                sub_queries::update_status(&state.db, &sub.id, SubscriptionStatus::Active).await?;
                sub.status = SubscriptionStatus::Active;
            }
            Err(e) => {
                // The row stays around in `error` so the operator can see
                // what happened, then delete and retry.
                warn!(subscription_id = %sub.id, error = %e, "telegram webhook registration failed");
                sub_queries::update_status(&state.db, &sub.id, SubscriptionStatus::Error).await?;
                sub.status = SubscriptionStatus::Error;
            }
        }
    }

    info!(
        subscription_id = %sub.id,
        provider = %sub.provider,
        dashboard_id = %sub.dashboard_id,
        status = %sub.status,
        "subscription created"
    );
    Ok((StatusCode::CREATED, Json(sub)).into_response())
}

/// GET /v1/subscriptions?dashboard_id=...
pub async fn list(
    State(state): State<GatewayState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let subs = sub_queries::list_by_dashboard(&state.db, &params.dashboard_id).await?;
    Ok(Json(subs))
}

/// DELETE /v1/subscriptions/{id}
pub async fn remove(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(sub) = sub_queries::get_subscription(&state.db, &id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    if sub.provider == Provider::Telegram {
        // Best-effort: a dead bot token must not make the row undeletable.
        state.registrar.deregister(&sub).await;
    }

    sub_queries::delete_subscription(&state.db, &id).await?;
    info!(subscription_id = %id, provider = %sub.provider, "subscription deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
