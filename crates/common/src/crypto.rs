//! Cryptographic utilities shared across Kelmah crates
//!
//! Opaque tokens (email verification, password reset, refresh tokens) are
//! handed to clients in plain form and only their SHA-256 digest is stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes behind every opaque token
const TOKEN_BYTES: usize = 32;

/// Generate a URL-safe random token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex-encoded SHA-256 of a token, as stored in the database
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
