//! Refresh token fingerprinting
//!
//! The server never stores a refresh token in cleartext. It stores
//! `BASE64URL(SHA256(token))` on the principal record and compares the
//! fingerprint of a presented token against it. The presented value is
//! hashed before any comparison, so equality checks never run over
//! attacker-controlled plaintext.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Compute the stored fingerprint of a refresh token.
pub fn fingerprint(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
