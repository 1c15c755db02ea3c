// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Two route groups: unauthenticated webhook receivers (each endpoint does
//! its own platform-specific verification) and the bearer-protected
//! subscription API.

use std::sync::Arc;

use axum::{
    extract::State,
    middleware as axum_middleware,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use courier_config::model::CourierConfig;
use courier_core::CourierError;
use courier_delivery::DeliveryEngine;
use courier_storage::Database;
use ed25519_dalek::VerifyingKey;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::registrar::TelegramRegistrar;
use crate::subscriptions;
use crate::webhooks;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Storage handle.
    pub db: Database,
    /// Full service configuration (webhook secrets live here).
    pub config: Arc<CourierConfig>,
    /// Delivery engine for triggering fan-out after buffering.
    pub engine: Arc<DeliveryEngine>,
    /// Telegram Bot API registrar for subscription lifecycle.
    pub registrar: Arc<TelegramRegistrar>,
    /// Discord public key, parsed once at startup.
    pub discord_public_key: Option<VerifyingKey>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(db: Database, config: Arc<CourierConfig>, engine: Arc<DeliveryEngine>) -> Self {
        let registrar = Arc::new(TelegramRegistrar::new(
            config.telegram.api_base.clone(),
            config.server.public_base_url.clone(),
        ));
        let discord_public_key = config
            .discord
            .public_key
            .as_deref()
            .and_then(courier_verify::discord::parse_public_key);
        Self {
            db,
            config,
            engine,
            registrar,
            discord_public_key,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the full gateway router.
///
/// Webhook routes stay outside the auth middleware; every webhook handler
/// verifies its own platform credential before touching the body.
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = AuthConfig {
        bearer_token: state.config.server.bearer_token.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(get_health))
        .route("/webhooks/slack", post(webhooks::slack))
        .route("/webhooks/discord", post(webhooks::discord))
        .route("/webhooks/telegram/{webhook_id}", post(webhooks::telegram))
        .route(
            "/webhooks/whatsapp",
            get(webhooks::whatsapp_verify).post(webhooks::whatsapp),
        )
        .route("/webhooks/teams", post(webhooks::teams))
        .route("/webhooks/mattermost", post(webhooks::mattermost))
        .route("/webhooks/googlechat", post(webhooks::googlechat))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/subscriptions",
            post(subscriptions::create).get(subscriptions::list),
        )
        .route("/v1/subscriptions/{id}", delete(subscriptions::remove))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

async fn get_health(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Bind and serve the gateway until `cancel` fires.
pub async fn start_server(state: GatewayState, cancel: CancellationToken) -> Result<(), CourierError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| CourierError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
