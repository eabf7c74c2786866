//! Command implementations.

pub mod auth;
pub mod query;
pub mod settings;
