// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-platform payload normalization.
//!
//! Each platform module converts that platform's native JSON envelope into
//! the canonical [`NormalizedMessage`](courier_core::NormalizedMessage),
//! returning `None` for events that are not deliverable messages: bot-authored
//! posts (loop prevention), non-text content, membership/system subtypes, and
//! text that is empty after trimming. Nothing downstream ever sees a
//! platform-specific shape.

pub mod discord;
pub mod mattermost;
pub mod resolve;
pub mod slack;
pub mod teams;
pub mod telegram;
pub mod whatsapp;

/// Normalize a phone-number-style identifier to digits only.
///
/// The same logical number arrives as `+1 (555) 010-2030`, `15550102030`,
/// or `1-555-010-2030` depending on the sending client; routing keys must
/// collapse all of these to one form.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
