//! Domain layer for Jobs

pub mod entities;
pub mod state;
pub mod validation;
