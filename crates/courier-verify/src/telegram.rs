// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram webhook verification: the `X-Telegram-Bot-Api-Secret-Token`
//! header is compared against the secret generated at webhook registration
//! time for the addressed subscription.

use crate::constant_time_eq;

/// Verify the secret-token header against the subscription's registered
/// secret. Missing header is a rejection, not a pass.
pub fn verify(registered_secret: &str, header_value: Option<&str>) -> bool {
    match header_value {
        Some(value) => constant_time_eq(registered_secret.as_bytes(), value.as_bytes()),
        None => false,
    }
}
