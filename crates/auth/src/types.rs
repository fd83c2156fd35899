//! Auth CQRS read-model types
//!
//! Lightweight views of the user rows owned by the accounts domain.
//! These types carry only the fields needed for authentication and authorization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lightweight identity for authenticated users.
///
/// Handlers needing the full profile load it from the accounts repository.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthIdentity {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub token_version: i32,
}

/// Platform role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Hirer,
    Worker,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Hirer => "hirer",
            UserRole::Worker => "worker",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hirer" => Ok(UserRole::Hirer),
            "worker" => Ok(UserRole::Worker),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}
