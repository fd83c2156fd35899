//! Validation helpers shared by the account request types

use regex::Regex;
use validator::ValidationError;

use kelmah_auth::UserRole;

/// Minimum password length
pub const PASSWORD_MIN_LEN: u64 = 8;

/// Maximum password length (bcrypt only reads the first 72 bytes)
pub const PASSWORD_MAX_LEN: u64 = 128;

lazy_static::lazy_static! {
    /// Phone numbers: optional leading +, digits, spaces, dashes, parentheses
    pub static ref PHONE_REGEX: Regex =
        Regex::new(r"^\+?[0-9\s\-()]{7,20}$").unwrap();

    /// Six-digit TOTP code
    pub static ref MFA_CODE_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

/// Password must mix upper and lower case letters, digits and symbols
pub fn is_strong_password(password: &str) -> bool {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    has_upper && has_lower && has_digit && has_special
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if is_strong_password(password) {
        Ok(())
    } else {
        Err(ValidationError::new("weak_password"))
    }
}

/// Blank phone numbers are treated as absent
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    if phone.is_empty() || PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone"))
    }
}

pub fn validate_role(role: &str) -> Result<(), ValidationError> {
    role.parse::<UserRole>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_role"))
}

pub fn validate_mfa_code(code: &str) -> Result<(), ValidationError> {
    if MFA_CODE_REGEX.is_match(code.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mfa_code"))
    }
}
