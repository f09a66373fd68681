pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod naming;
pub mod redaction;
pub mod types;
