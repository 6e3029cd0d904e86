//! CLI Module Organization
//!
//! - args: CLI argument structures and configuration types
//! - commands: command execution logic
//! - config_layer: configuration layering and overrides
//! - output: console summaries

pub mod args;
pub mod commands;
pub mod config_layer;
pub mod output;

pub use args::*;
pub use commands::*;
