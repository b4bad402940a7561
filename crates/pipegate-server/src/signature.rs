//! Inbound event signature verification.
//!
//! The event source signs each delivery with HMAC-SHA256 over the raw body
//! using the shared webhook secret, base64-encoded in the
//! `x-pipegate-signature` header. Comparison is constant-time via the MAC
//! verifier.

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "x-pipegate-signature";

/// `true` iff `provided` is the base64 HMAC-SHA256 of `body` under
/// `secret`.
pub fn verify(secret: &str, body: &[u8], provided: &str) -> bool {
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(provided) else {
        return false;
    };
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&decoded).is_ok()
}

/// Compute the signature a sender would attach. Used by tests and by
/// operators debugging deliveries.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_body_verifies() {
        let body = br#"{"@type":"started"}"#;
        let sig = sign("topsecret", body);
        assert!(verify("topsecret", body, &sig));
    }

    #[test]
    fn wrong_secret_fails() {
        let body = b"payload";
        let sig = sign("topsecret", body);
        assert!(!verify("othersecret", body, &sig));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign("topsecret", b"payload");
        assert!(!verify("topsecret", b"payload2", &sig));
    }

    #[test]
    fn invalid_base64_fails_cleanly() {
        assert!(!verify("topsecret", b"payload", "!!not-base64!!"));
    }
}
