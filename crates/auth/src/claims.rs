//! JWT claims types

use serde::{Deserialize, Serialize};

use crate::types::UserRole;

/// Value of the `typ` claim on access tokens
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims carried by Kelmah access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Session the token was issued for
    pub sid: String,
    /// User token version at issue time
    pub ver: i32,
    /// Issued at
    pub iat: i64,
    /// Expires at
    pub exp: i64,
    pub typ: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}
