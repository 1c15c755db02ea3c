// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord interaction signing: Ed25519 over `timestamp + raw_body`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::debug;

/// Parse a hex-encoded Ed25519 public key as configured for a Discord app.
pub fn parse_public_key(hex_key: &str) -> Option<VerifyingKey> {
    let bytes = hex::decode(hex_key).ok()?;
    let arr: [u8; 32] = bytes.try_into().ok()?;
    VerifyingKey::from_bytes(&arr).ok()
}

/// Verify a Discord request.
///
/// `signature` is the `X-Signature-Ed25519` header (hex), `timestamp` the
/// `X-Signature-Timestamp` header. The signed message is the timestamp
/// bytes immediately followed by the raw body bytes.
pub fn verify(public_key: &VerifyingKey, signature: &str, timestamp: &str, raw_body: &[u8]) -> bool {
    let Ok(sig_bytes) = hex::decode(signature) else {
        debug!("discord verification rejected: non-hex signature");
        return false;
    };
    let Ok(sig_arr) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_arr);

    let mut message = Vec::with_capacity(timestamp.len() + raw_body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(raw_body);

    public_key.verify(&message, &signature).is_ok()
}
