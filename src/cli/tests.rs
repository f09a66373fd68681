use clap::Parser;
use std::path::PathBuf;

use super::args::{Cli, Commands, build_cli};
use super::run::{exit_code_for, render_error};
use crate::session_file::SessionFileError;
use crate::{ConfigError, ExitCode, PoeError, StageId};

#[test]
fn test_run_arguments_parse() {
    let cli = Cli::try_parse_from([
        "poegen",
        "run",
        "--input",
        "session.toml",
        "--estimates",
        "estimates.csv",
        "--through",
        "diagram",
        "--out",
        "bundle",
        "--print-diagram",
        "-v",
    ])
    .unwrap();

    assert!(cli.verbose);
    match cli.command {
        Commands::Run {
            input,
            estimates,
            through,
            out,
            print_diagram,
            deployment,
        } => {
            assert_eq!(input, PathBuf::from("session.toml"));
            assert_eq!(estimates, Some(PathBuf::from("estimates.csv")));
            assert_eq!(through, Some(StageId::Diagram));
            assert_eq!(out, Some(PathBuf::from("bundle")));
            assert!(print_diagram);
            assert_eq!(deployment, None);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_through_accepts_stage_numbers_only_in_range() {
    let cli = Cli::try_parse_from(["poegen", "run", "-i", "s.toml", "--through", "2"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Run {
            through: Some(StageId::PovPlan),
            ..
        }
    ));
    assert!(Cli::try_parse_from(["poegen", "run", "-i", "s.toml", "--through", "5"]).is_err());
}

#[test]
fn test_run_requires_input() {
    assert!(Cli::try_parse_from(["poegen", "run"]).is_err());
}

#[test]
fn test_global_flags_defined() {
    let cli = build_cli();
    let names: Vec<_> = cli.get_arguments().filter_map(|a| a.get_long()).collect();
    assert!(names.contains(&"config"));
    assert!(names.contains(&"verbose"));
}

#[test]
fn test_exit_codes_for_command_errors() {
    let missing = anyhow::Error::from(PoeError::from(ConfigError::MissingRequired(vec![
        "AZURE_OPENAI_KEY".to_string(),
    ])));
    assert_eq!(exit_code_for(&missing), ExitCode::CONFIG);

    let prerequisite = anyhow::Error::from(PoeError::MissingPrerequisite {
        stage: StageId::Diagram,
        missing: StageId::PovPlan,
    });
    assert_eq!(exit_code_for(&prerequisite), ExitCode::MISSING_PREREQUISITE);

    let bad_file = anyhow::Error::from(SessionFileError::InvalidDate {
        field: "pov_end",
        value: "soon".to_string(),
    });
    assert_eq!(exit_code_for(&bad_file), ExitCode::MISSING_INPUT);

    assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), ExitCode::INTERNAL);
}

#[test]
fn test_error_report_names_missing_keys() {
    let err = anyhow::Error::from(PoeError::from(ConfigError::MissingRequired(vec![
        "AZURE_OPENAI_KEY".to_string(),
        "AZURE_OPENAI_ENDPOINT".to_string(),
    ])));
    let report = render_error(&err);
    assert!(report.contains("AZURE_OPENAI_KEY"));
    assert!(report.contains("AZURE_OPENAI_ENDPOINT"));
    assert!(report.contains("Suggestions"));
}

#[test]
fn test_invalid_output_report_points_to_saved_raw_file() {
    let err = anyhow::Error::from(PoeError::InvalidDiagramMarkup {
        reason: "unclosed <g>".to_string(),
        raw: "<svg><g></svg>".to_string(),
    });
    assert_eq!(exit_code_for(&err), ExitCode::INVALID_OUTPUT);
    let report = render_error(&err);
    assert!(report.contains("unclosed <g>"));
    assert!(report.contains("-raw.txt"));
}
