//! API endpoint integration tests
//!
//! Routing tests run everywhere; the auth, jobs and messaging flows need
//! `TEST_DATABASE_URL` and skip themselves without it.

#![allow(dead_code)]

mod auth;
mod common;
mod jobs;
mod messaging;
mod routing;
