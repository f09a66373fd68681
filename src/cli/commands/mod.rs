//! CLI command implementations.

mod config;
mod run;
mod templates;

pub use config::execute_config_command;
pub use run::{RunOptions, execute_run_command};
pub use templates::execute_templates_command;
