// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-platform webhook signature verification.
//!
//! Every verifier runs before any payload parsing or database access so
//! unauthenticated traffic is rejected cheaply. All equality comparisons on
//! secrets and signatures are constant-time. A provider with no configured
//! verifier fails closed: its traffic is rejected, never accepted
//! unauthenticated.

pub mod discord;
pub mod mattermost;
pub mod slack;
pub mod teams;
pub mod telegram;
pub mod whatsapp;

/// Constant-time equality for shared-secret comparisons.
///
/// Length mismatch returns false without leaking where the mismatch is.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    ring::constant_time::verify_slices_are_equal(a, b).is_ok()
}
