//! Run stages in order and write each artifact to disk.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use poegen_engine::{Orchestrator, Session, StageResult};
use poegen_utils::error::PoeError;
use poegen_utils::naming::raw_output_file_name;
use poegen_utils::types::StageId;

/// One artifact written by [`generate_bundle`].
#[derive(Debug, Clone)]
pub struct WrittenArtifact {
    pub stage: StageId,
    pub path: PathBuf,
    pub degraded: bool,
    pub dropped_rows: usize,
    pub result: Arc<StageResult>,
}

/// Last stage to run when the user does not say: the CSV stage only runs
/// when estimates were uploaded.
#[must_use]
pub fn default_through(has_estimates: bool) -> StageId {
    if has_estimates {
        StageId::MigrationCsv
    } else {
        StageId::Diagram
    }
}

/// Generate stages 1 through `through` and write each artifact into
/// `out_dir` as soon as it is produced.
///
/// Current results are reused, so calling this again after a failure only
/// pays for the stages that are still missing.
///
/// # Errors
///
/// Returns the first stage error, or `Io` if writing fails. Artifacts of the
/// stages before the failing one are already on disk.
pub async fn generate_bundle(
    orchestrator: &Orchestrator,
    session: &Session,
    through: StageId,
    out_dir: &Path,
) -> Result<Vec<WrittenArtifact>, PoeError> {
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::new();
    for stage in StageId::ALL.into_iter().take_while(|s| *s <= through) {
        let result = orchestrator.generate(session, stage).await?;
        let path = out_dir.join(&result.artifact.file_name);
        std::fs::write(&path, &result.artifact.bytes)?;
        tracing::debug!(stage = %stage, path = %path.display(), "Artifact written");

        written.push(WrittenArtifact {
            stage,
            path,
            degraded: result.artifact.degraded,
            dropped_rows: result.dropped_rows(),
            result,
        });
    }
    Ok(written)
}

/// Write the raw model output carried by `err` into `out_dir` so it can be
/// inspected or fixed by hand.
///
/// Returns `None` when the error carries no model output.
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn save_raw_output(
    err: &PoeError,
    session: &Session,
    out_dir: &Path,
) -> Result<Option<PathBuf>, PoeError> {
    let (Some(raw), Some(stage)) = (err.raw_output(), err.stage()) else {
        return Ok(None);
    };
    std::fs::create_dir_all(out_dir)?;
    let customer = session.inputs().customer_name;
    let path = out_dir.join(raw_output_file_name(
        Local::now().date_naive(),
        &customer,
        stage,
    ));
    std::fs::write(&path, raw)?;
    tracing::info!(stage = %stage, path = %path.display(), bytes = raw.len(), "Raw model output saved");
    Ok(Some(path))
}
