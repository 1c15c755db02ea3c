// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out delivery for buffered messages.
//!
//! The [`engine::DeliveryEngine`] drains the durable buffer into
//! destinations reached through the external collaborators, and the
//! [`scheduler::Scheduler`] keeps it honest over time: periodic retries,
//! stale-dashboard wakes, and crash recovery.

pub mod clients;
pub mod engine;
pub mod sanitize;
pub mod scheduler;

pub use clients::{HttpBlockStore, HttpExecTarget};
pub use engine::DeliveryEngine;
pub use sanitize::sanitize_for_terminal;
pub use scheduler::Scheduler;
