//! `poegen run`: generate stages from a session file.

use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

use poegen_render::tabular::parse_estimates;

use crate::bundle::{default_through, generate_bundle, save_raw_output};
use crate::session_file::load_session_inputs;
use crate::{Config, Orchestrator, PoeError, Session, StageId, TemplateSet};

#[derive(Debug)]
pub struct RunOptions {
    pub input: PathBuf,
    pub estimates: Option<PathBuf>,
    pub through: Option<StageId>,
    pub print_diagram: bool,
}

pub async fn execute_run_command(options: RunOptions, config: &Config) -> Result<()> {
    // Refuse to start without a usable model configuration.
    let settings = config.llm_settings().map_err(PoeError::from)?;

    let paths = config.template_paths();
    let templates = Arc::new(TemplateSet::load(
        &paths.solution,
        &paths.pov,
        &paths.migration_header,
    ));
    let orchestrator = Orchestrator::from_settings(&settings, templates)?;

    let inputs = load_session_inputs(&options.input, Local::now().date_naive())?;
    let session = Session::with_inputs(inputs);

    if let Some(path) = &options.estimates {
        let bytes = std::fs::read(path).map_err(PoeError::from)?;
        let estimates = parse_estimates(&bytes)
            .map_err(|e| PoeError::from_render(StageId::MigrationCsv, e))?;
        tracing::info!(rows = estimates.len(), file = %path.display(), "Resource estimates loaded");
        session.upload_estimates(estimates)?;
    }

    let through = options
        .through
        .unwrap_or_else(|| default_through(options.estimates.is_some()));
    let out_dir = config.output_dir();

    let written = match generate_bundle(&orchestrator, &session, through, &out_dir).await {
        Ok(written) => written,
        Err(err) => {
            match save_raw_output(&err, &session, &out_dir) {
                Ok(Some(path)) => eprintln!("Raw model output saved to {}", path.display()),
                Ok(None) => {}
                Err(save_err) => {
                    tracing::warn!(error = %save_err, "Could not save raw model output");
                    if let Some(raw) = err.raw_output() {
                        eprintln!("Raw model output:\n{raw}");
                    }
                }
            }
            return Err(err.into());
        }
    };

    let total = through.number();
    for artifact in &written {
        let mut notes = Vec::new();
        if artifact.degraded {
            notes.push("default formatting, template not loaded".to_string());
        }
        if artifact.dropped_rows > 0 {
            notes.push(format!("{} rows dropped", artifact.dropped_rows));
        }
        let marker = if notes.is_empty() { "✓" } else { "⚠" };
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        println!(
            "{marker} [{}/{total}] {:<14} {}{notes}",
            artifact.stage.number(),
            artifact.stage.as_str(),
            artifact.path.display()
        );
    }

    if options.print_diagram
        && let Some(diagram) = written.iter().find(|a| a.stage == StageId::Diagram)
    {
        println!();
        println!("{}", String::from_utf8_lossy(&diagram.result.artifact.bytes));
    }

    Ok(())
}
