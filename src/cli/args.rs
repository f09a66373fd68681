//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use poegen_utils::types::StageId;

/// poegen - pre-sales document bundle generator
#[derive(Parser, Debug)]
#[command(name = "poegen")]
#[command(about = "Generate a pre-sales document bundle through a staged LLM pipeline")]
#[command(long_about = r#"
poegen turns a customer name, budget and background into a document bundle:
a solution architecture document, a POV deployment plan, an architecture
diagram and a migration spreadsheet. Each stage builds on the previous one.

EXAMPLES:
  # Generate stages 1-3 into ./out
  poegen run --input session.toml

  # All four stages, using an Azure Migrate resource export
  poegen run --input session.toml --estimates estimates.csv

  # Stop after the solution document
  poegen run --input session.toml --through 1

  # Check which templates were found
  poegen templates

  # Show the effective configuration and where each value came from
  poegen config

CONFIGURATION:
  Precedence: environment > .poegen/secrets.toml > .poegen/config.toml > defaults
  The config directory is found by searching upward from the working directory,
  or from POEGEN_HOME when set. Use --config for an explicit file.

STAGES:
  1 solution → 2 pov-plan → 3 diagram → 4 migration-csv
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate stages from a session file and write the artifacts
    Run {
        /// Session file (TOML) with customer name, budget, background, POV window and team
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Resource estimate export (CSV), required for stage 4
        #[arg(long)]
        estimates: Option<PathBuf>,

        /// Last stage to generate, 1-4 or a stage name [default: 4 with --estimates, else 3]
        #[arg(long)]
        through: Option<StageId>,

        /// Output directory (overrides [output] dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Model deployment name (overrides configuration)
        #[arg(long)]
        deployment: Option<String>,

        /// Print the SVG markup of the diagram to stdout
        #[arg(long)]
        print_diagram: bool,
    },

    /// Show which document templates were found
    Templates,

    /// Show the effective configuration with value sources
    Config,
}

/// Build the clap command, for help rendering and tests.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
