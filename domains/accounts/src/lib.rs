//! Accounts domain: registration, login, sessions, MFA, password recovery

pub mod api;
pub mod config;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::oauth::{OAuthProvider, OAuthSettings};

// Re-export repository types
pub use repository::{
    deactivate_user_tx, reset_password_tx, revoke_other_sessions_tx, revoke_user_sessions_tx,
    update_password_tx, AccountsRepositories, SessionRepository, UserRepository,
};

// Re-export API types
pub use api::routes;
pub use api::AccountsState;
pub use config::AccountsConfig;
