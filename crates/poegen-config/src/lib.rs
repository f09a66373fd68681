//! Configuration management for poegen
//!
//! Hierarchical configuration with discovery and precedence:
//! environment > secrets file > config file > defaults.

mod config;

pub use config::*;
pub use poegen_utils::error::ConfigError;
