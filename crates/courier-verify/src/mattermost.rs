// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mattermost outgoing-webhook verification: the payload's `token` field is
//! compared against the value issued at webhook creation time.

use crate::constant_time_eq;

/// Verify the payload token against the configured outgoing-webhook token.
pub fn verify(configured_token: &str, payload_token: Option<&str>) -> bool {
    match payload_token {
        Some(token) => constant_time_eq(configured_token.as_bytes(), token.as_bytes()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_token() {
        assert!(verify("mm-outgoing-token", Some("mm-outgoing-token")));
    }

    #[test]
    fn rejects_mismatch_or_missing() {
        assert!(!verify("mm-outgoing-token", Some("other")));
        assert!(!verify("mm-outgoing-token", None));
    }
}
