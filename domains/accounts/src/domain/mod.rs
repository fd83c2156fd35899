//! Accounts domain layer: entities, credentials, validation, OAuth gating

pub mod entities;
pub mod oauth;
pub mod password;
pub mod totp;
pub mod validation;
