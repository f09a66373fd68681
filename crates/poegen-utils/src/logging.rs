//! Structured logging for poegen.
//!
//! Sets up a `tracing` subscriber and provides span/event helpers so every
//! stage execution is logged with the same fields.

use tracing::{Level, error, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::redaction::redact_secrets;
use crate::types::StageId;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode logs poegen at debug
/// level with span timings, and the default logs info and above.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("poegen=debug,poegen_engine=debug,poegen_llm=debug,info")
            } else {
                EnvFilter::try_new("info")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one stage execution for one session.
pub fn stage_span(session_id: &str, stage: StageId) -> tracing::Span {
    span!(
        Level::INFO,
        "stage",
        session = %session_id,
        stage = %stage,
    )
}

pub fn log_stage_start(session_id: &str, stage: StageId) {
    info!(session = %session_id, stage = %stage, "Generating stage");
}

pub fn log_stage_complete(session_id: &str, stage: StageId, duration_ms: u128, file_name: &str) {
    info!(
        session = %session_id,
        stage = %stage,
        duration_ms = %duration_ms,
        artifact = %file_name,
        "Stage generated"
    );
}

/// Error messages are scrubbed before they reach the log.
pub fn log_stage_error(session_id: &str, stage: StageId, error: &str, duration_ms: u128) {
    error!(
        session = %session_id,
        stage = %stage,
        duration_ms = %duration_ms,
        error = %redact_secrets(error),
        "Stage generation failed"
    );
}

/// Missing templates are a degraded mode, not an error.
pub fn log_template_missing(name: &str, path: &str) {
    warn!(
        template = %name,
        path = %path,
        "Template not found; falling back to built-in formatting"
    );
}
