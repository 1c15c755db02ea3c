// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination-authorization graph: a directed-edge store consumed
//! read-only by the router and the policy gate.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{Destination, MessagingPolicy};

/// Read-only view of the workspace item graph and per-destination policies.
#[async_trait]
pub trait ItemGraph: Send + Sync {
    /// Does a directed link exist from item `from` to item `to`?
    async fn has_edge(&self, from: &str, to: &str) -> Result<bool, CourierError>;

    /// Destination-kind items reachable from the given source item.
    async fn destinations(&self, item_id: &str) -> Result<Vec<Destination>, CourierError>;

    /// The messaging policy stored against a destination, if one has been
    /// configured. `None` means configuration-in-progress, which is not
    /// equivalent to explicit denial.
    async fn policy(&self, item_id: &str) -> Result<Option<MessagingPolicy>, CourierError>;
}
