//! Time-based one-time passwords (RFC 6238) over HMAC-SHA256
//!
//! Secrets are 20 random bytes, exchanged as unpadded RFC 4648 base32 so
//! authenticator apps can import them from an `otpauth://` URL.

use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Code length shown to users
pub const DIGITS: u32 = 6;

/// Time step in seconds
pub const STEP_SECS: u64 = 30;

/// Steps accepted either side of the current one
pub const ALLOWED_SKEW_STEPS: u64 = 1;

const SECRET_BYTES: usize = 20;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Generate a new base32 secret
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base32_encode(&bytes)
}

/// HOTP value (RFC 4226 dynamic truncation) for `counter`
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> Option<u32> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    Some(binary % 10u32.pow(digits))
}

/// Zero-padded code for the step containing `unix_secs`
pub fn code_at(key: &[u8], unix_secs: u64, digits: u32) -> Option<String> {
    hotp(key, unix_secs / STEP_SECS, digits).map(|v| format!("{:0width$}", v, width = digits as usize))
}

/// Check a user-supplied 6-digit code against a base32 secret.
pub fn verify_code(secret: &str, code: &str, unix_secs: u64) -> bool {
    let code = code.trim();
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let key = match base32_decode(secret) {
        Some(key) if !key.is_empty() => key,
        _ => return false,
    };

    let current = unix_secs / STEP_SECS;
    let first = current.saturating_sub(ALLOWED_SKEW_STEPS);
    let last = current.saturating_add(ALLOWED_SKEW_STEPS);

    (first..=last).any(|step| {
        hotp(&key, step, DIGITS)
            .map(|v| constant_time_eq(format!("{:06}", v).as_bytes(), code.as_bytes()))
            .unwrap_or(false)
    })
}

/// Current Unix time in seconds
#[mutants::skip] // Wall clock
pub fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Provisioning URL for authenticator apps
pub fn otpauth_url(issuer: &str, account: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}&algorithm=SHA256&digits={DIGITS}&period={STEP_SECS}",
        issuer = crate::domain::oauth::percent_encode(issuer),
        account = crate::domain::oauth::percent_encode(account),
        secret = secret,
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Unpadded RFC 4648 base32
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Decode base32, tolerating lowercase, spaces and `=` padding
pub fn base32_decode(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in input.chars().filter(|c| !c.is_whitespace() && *c != '=') {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&a| a as char == c.to_ascii_uppercase())? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Some(out)
}
