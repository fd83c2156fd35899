//! HTTP handlers for the Accounts domain

pub mod account;
pub mod auth;
pub mod mfa;
pub mod oauth;
pub mod sessions;
