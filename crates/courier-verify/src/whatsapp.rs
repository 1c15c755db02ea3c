// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp (Meta) webhook signing: `X-Hub-Signature-256` carries
//! `sha256=<hex>` of an HMAC-SHA256 over the raw request bytes.
//!
//! The HMAC must be computed over the bytes as received, never over a
//! reserialized payload; encoding differences (key order, unicode escapes)
//! would produce false negatives.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify the `X-Hub-Signature-256` header against the raw body.
pub fn verify(app_secret: &str, signature_header: &str, raw_body: &[u8]) -> bool {
    let Some(sig_hex) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(sig_hex) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"entry":[]}"#;
        let sig = sign("app-secret", body);
        assert!(verify("app-secret", &sig, body));
    }

    #[test]
    fn signature_covers_exact_bytes_not_reserialization() {
        // Same JSON value, different byte representation: only the byte-exact
        // body verifies.
        let original = br#"{"a":1,"b":2}"#;
        let reordered = br#"{"b":2,"a":1}"#;
        let sig = sign("app-secret", original);
        assert!(verify("app-secret", &sig, original));
        assert!(!verify("app-secret", &sig, reordered));
    }

    #[test]
    fn rejects_wrong_secret_and_malformed_header() {
        let body = b"{}";
        let sig = sign("right", body);
        assert!(!verify("wrong", &sig, body));
        assert!(!verify("right", "md5=abcd", body));
        assert!(!verify("right", "sha256=zz!!", body));
    }
}
