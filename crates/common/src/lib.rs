//! Shared utilities, configuration, and error handling for Kelmah
//!
//! This crate provides common functionality used across the Kelmah services:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Postgres pool setup and embedded migrations
//! - Request extractors (validated JSON, pagination)
//! - Token generation/hashing and per-client rate limiting

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extractors;
pub mod rate_limit;
pub mod state;

pub use crypto::{generate_token, hash_token};
pub use error::{Error, Result};
pub use extractors::{validation_messages, Pagination, ValidatedJson};
pub use rate_limit::{client_ip, RateLimit, RateLimitPolicy, RateLimiter};
pub use state::StateError;
