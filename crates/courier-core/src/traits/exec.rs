// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution-environment collaborator: runs destination processes and
//! exposes a write primitive for terminal-kind destinations.
//!
//! Failures from any of these calls are retryable delivery failures,
//! never fatal to the pipeline.

use async_trait::async_trait;

use crate::error::CourierError;

/// Opaque handle to a live session (machine/VM) hosting a dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle(pub String);

/// Opaque handle to a terminal destination inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalHandle(pub String);

/// Outcome of a session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAccess {
    Granted(SessionHandle),
    Denied,
}

/// Interface to the execution environment that hosts terminal destinations.
#[async_trait]
pub trait ExecTarget: Send + Sync {
    /// Ensure a live session exists for this dashboard, starting it if
    /// asleep. Returns an access-denied indication rather than an error
    /// when the caller is not allowed to start the session.
    async fn ensure_session(&self, dashboard_id: &str)
        -> Result<SessionAccess, CourierError>;

    /// Resolve or create a terminal handle for an item within a session.
    async fn resolve_terminal(
        &self,
        session: &SessionHandle,
        item_id: &str,
    ) -> Result<TerminalHandle, CourierError>;

    /// Write text to a terminal handle.
    async fn write_terminal(
        &self,
        handle: &TerminalHandle,
        text: &str,
    ) -> Result<(), CourierError>;

    /// Whether the dashboard's execution environment is currently running.
    /// Used by the stale-wake scheduler to decide which dashboards to wake.
    async fn is_running(&self, dashboard_id: &str) -> Result<bool, CourierError>;
}
