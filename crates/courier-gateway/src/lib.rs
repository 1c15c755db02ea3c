// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion server and subscription management API.
//!
//! One axum server carries both surfaces: per-platform webhook receivers
//! that verify, normalize, route, and buffer inbound messages, and a
//! bearer-protected API for managing subscriptions.

pub mod auth;
pub mod ingest;
pub mod registrar;
pub mod server;
pub mod subscriptions;
pub mod webhooks;
