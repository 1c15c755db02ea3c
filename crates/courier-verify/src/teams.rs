// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Microsoft Teams outgoing-webhook signing: the `Authorization` header
//! carries `HMAC <base64sig>`, an HMAC-SHA256 over the raw request bytes
//! keyed with the base64-decoded security token.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify the `Authorization: HMAC <sig>` header against the raw body.
pub fn verify(security_token_b64: &str, authorization_header: &str, raw_body: &[u8]) -> bool {
    let Some(sig_b64) = authorization_header.strip_prefix("HMAC ") else {
        return false;
    };
    let Ok(expected) = BASE64.decode(sig_b64) else {
        return false;
    };
    let Ok(key) = BASE64.decode(security_token_b64) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(&key) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> String {
        BASE64.encode(b"teams-shared-security-token")
    }

    fn sign(token_b64: &str, body: &[u8]) -> String {
        let key = BASE64.decode(token_b64).unwrap();
        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(body);
        format!("HMAC {}", BASE64.encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":"message","text":"hi"}"#;
        let auth = sign(&token(), body);
        assert!(verify(&token(), &auth, body));
    }

    #[test]
    fn rejects_tampered_body() {
        let auth = sign(&token(), b"original");
        assert!(!verify(&token(), &auth, b"tampered"));
    }

    #[test]
    fn rejects_missing_scheme_prefix() {
        let body = b"{}";
        let auth = sign(&token(), body);
        let bare = auth.strip_prefix("HMAC ").unwrap();
        assert!(!verify(&token(), bare, body));
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(!verify(&token(), "HMAC not-base64!!!", b"{}"));
        assert!(!verify("not-base64!!!", "HMAC aGk=", b"{}"));
    }
}
