// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack request signing: HMAC-SHA256 over `v0:{timestamp}:{raw_body}`.
//!
//! The timestamp header doubles as replay protection: requests more than
//! five minutes from current time are rejected before the HMAC is computed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed clock skew between the request timestamp and now.
const TIMESTAMP_WINDOW_SECS: i64 = 300;

/// Verify a Slack request signature.
///
/// `timestamp` is the `X-Slack-Request-Timestamp` header, `signature` the
/// `X-Slack-Signature` header (`v0=<hex>`).
pub fn verify(signing_secret: &str, timestamp: &str, signature: &str, raw_body: &[u8]) -> bool {
    verify_at(
        signing_secret,
        timestamp,
        signature,
        raw_body,
        chrono::Utc::now().timestamp(),
    )
}

/// Verification with an explicit clock, for the replay-window check.
pub fn verify_at(
    signing_secret: &str,
    timestamp: &str,
    signature: &str,
    raw_body: &[u8],
    now_epoch_secs: i64,
) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        debug!("slack verification rejected: non-numeric timestamp");
        return false;
    };

    if (now_epoch_secs - ts).abs() > TIMESTAMP_WINDOW_SECS {
        debug!(
            age_secs = (now_epoch_secs - ts).abs(),
            "slack verification rejected: timestamp outside replay window"
        );
        return false;
    }

    let Some(sig_hex) = signature.strip_prefix("v0=") else {
        return false;
    };
    let Ok(expected) = hex::decode(sig_hex) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(raw_body);

    // verify_slice is constant-time.
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("v0:{timestamp}:").as_bytes());
        mac.update(body);
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let secret = "8f742231b10e8888abcd99yyyzzz85a5";
        let body = br#"{"type":"event_callback"}"#;
        let sig = sign(secret, "1700000000", body);
        assert!(verify_at(secret, "1700000000", &sig, body, 1_700_000_100));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = b"{}";
        let sig = sign("secret-a", "1700000000", body);
        assert!(!verify_at("secret-b", "1700000000", &sig, body, 1_700_000_000));
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = "s";
        let sig = sign(secret, "1700000000", b"original");
        assert!(!verify_at(secret, "1700000000", &sig, b"tampered", 1_700_000_000));
    }

    #[test]
    fn rejects_timestamp_outside_window() {
        let secret = "s";
        let body = b"{}";
        let sig = sign(secret, "1700000000", body);
        // Six minutes later: replay.
        assert!(!verify_at(secret, "1700000000", &sig, body, 1_700_000_360));
        // Six minutes early: clock games.
        assert!(!verify_at(secret, "1700000000", &sig, body, 1_699_999_640));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(!verify_at("s", "not-a-number", "v0=aa", b"{}", 0));
        assert!(!verify_at("s", "1700000000", "missing-prefix", b"{}", 1_700_000_000));
        assert!(!verify_at("s", "1700000000", "v0=not-hex!", b"{}", 1_700_000_000));
    }
}
