//! Authorization context for authenticated users

use uuid::Uuid;

use crate::types::{AuthIdentity, UserRole};

/// Represents an authenticated user context
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthIdentity,
    /// Session the access token belongs to
    pub session_id: Uuid,
}

impl AuthContext {
    pub fn new(user: AuthIdentity, session_id: Uuid) -> Self {
        Self { user, session_id }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_hirer(&self) -> bool {
        self.user.role == UserRole::Hirer
    }

    pub fn is_worker(&self) -> bool {
        self.user.role == UserRole::Worker
    }
}
