//! CLI Command Implementations
//!
//! - audit: batch audit
//! - baseline: baseline snapshot construction
//! - config: configuration management commands

pub mod audit;
pub mod baseline;
pub mod config;

pub use audit::audit_command;
pub use baseline::build_baseline_command;
pub use config::{init_config, print_default_config, validate_config};
