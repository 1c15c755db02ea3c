// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination authorization for the delivery pipeline.
//!
//! Two modes coexist. Edge-based platforms authorize purely via the
//! existence of a directed link in the workspace item graph. Policy-gated
//! platforms additionally require an explicit [`MessagingPolicy`] on each
//! destination, evaluated per destination and independently of every other
//! destination, so a permissive policy on one destination never leaks
//! delivery to a stricter one.

pub mod gate;

pub use gate::{destination_decision, evaluate, Decision};
