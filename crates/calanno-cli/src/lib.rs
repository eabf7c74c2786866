//! CLI for the calendar annotation datasource
//!
//! This crate provides the `calanno` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{CliError, CliResult};
