//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, creates the tokio
//! runtime, dispatches to the command handlers and prints every error.

use anyhow::Result;
use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::session_file::SessionFileError;
use crate::{CliArgs, Config, ExitCode, PoeError};
use poegen_utils::logging::init_tracing;
use poegen_utils::redaction::redact_secrets;

/// Main CLI execution function.
///
/// Prints all output including errors and returns the exit code to use on
/// failure. main.rs only calls `std::process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("warning: logging not initialized: {e}");
    }

    let cli_args = match &cli.command {
        Commands::Run {
            out, deployment, ..
        } => CliArgs {
            config_path: cli.config.clone(),
            output_dir: out.clone(),
            deployment: deployment.clone(),
        },
        Commands::Templates | Commands::Config => CliArgs {
            config_path: cli.config.clone(),
            ..CliArgs::default()
        },
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = PoeError::from(err);
            eprint!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Run {
                input,
                estimates,
                through,
                print_diagram,
                ..
            } => {
                let options = commands::RunOptions {
                    input,
                    estimates,
                    through,
                    print_diagram,
                };
                commands::execute_run_command(options, &config).await
            }
            Commands::Templates => commands::execute_templates_command(&config),
            Commands::Config => commands::execute_config_command(&config),
        }
    });

    match result {
        Ok(()) => Ok(()),
        Err(error) => {
            eprint!("{}", render_error(&error));
            Err(exit_code_for(&error))
        }
    }
}

/// Exit code for an error returned by a command handler.
pub(crate) fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    if let Some(err) = error.downcast_ref::<PoeError>() {
        err.to_exit_code()
    } else if error.downcast_ref::<SessionFileError>().is_some() {
        ExitCode::MISSING_INPUT
    } else {
        ExitCode::INTERNAL
    }
}

/// User-facing report for an error returned by a command handler.
pub(crate) fn render_error(error: &anyhow::Error) -> String {
    if let Some(err) = error.downcast_ref::<PoeError>() {
        return err.display_for_user();
    }

    if let Some(err) = error.downcast_ref::<SessionFileError>() {
        let suggestion = match err {
            SessionFileError::Read { .. } => "Check the path passed to --input",
            SessionFileError::Parse { .. } => {
                "Allowed keys: customer_name, budget, background, pov_start, pov_end, team_roster"
            }
            SessionFileError::InvalidDate { .. } => "Write dates as \"2026-02-25\"",
        };
        return redact_secrets(&format!(
            "Error: {err}\n\nSuggestions:\n  • {suggestion}\n"
        ));
    }

    format!(
        "✗ Unexpected error: {}\n\n  Run with --verbose for more detailed output\n",
        redact_secrets(&format!("{error:#}"))
    )
}
