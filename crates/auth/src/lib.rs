//! Authentication middleware for the Kelmah API
//!
//! Issues and validates access tokens, checks them against the session and
//! token-version state in the database, and provides axum extractors that
//! work with any domain state implementing `FromRef<S>` for `AuthBackend`.

mod backend;
mod claims;
mod config;
mod context;
mod error;
mod extractors;
mod jwt;
mod types;

pub use backend::AuthBackend;
pub use claims::{AccessClaims, ACCESS_TOKEN_TYPE};
pub use config::AuthConfig;
pub use context::AuthContext;
pub use error::AuthError;
pub use extractors::{AuthUser, HirerUser, OptionalAuthUser, WorkerUser};
pub use types::{AuthIdentity, UserRole};
