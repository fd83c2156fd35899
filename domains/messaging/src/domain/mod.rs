//! Domain layer for Messaging

pub mod entities;
pub mod state;
