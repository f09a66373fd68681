//! Output renderer for poegen
//!
//! Turns the raw text of a stage into a downloadable artifact:
//! - document mode (stages 1-2): Markdown to a styled `.docx`
//! - diagram mode (stage 3): validated SVG markup
//! - tabular mode (stage 4): model mapping merged into the migration CSV
//!
//! Rendering is deterministic: the same input always yields the same bytes.

pub mod diagram;
pub mod docx;
pub mod tabular;
mod templates;

pub use templates::{TemplateSet, TemplateStatus};

use chrono::NaiveDate;
use std::sync::Arc;

use poegen_utils::error::RenderError;
use poegen_utils::naming::stage_file_name;
use poegen_utils::types::{ResourceEstimate, StageId};

pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";
pub const CSV_MEDIA_TYPE: &str = "text/csv";

/// A rendered, downloadable stage output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
    /// Stage 4 only: estimate rows the model mapped to no record.
    pub dropped_rows: usize,
    /// Document stages only: no template was available, default styling used.
    pub degraded: bool,
}

/// Everything needed to render one stage.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub stage: StageId,
    pub raw: &'a str,
    pub customer: &'a str,
    /// Local date used in the file name.
    pub generated_on: NaiveDate,
    /// Uploaded estimates, required by the migration stage.
    pub estimates: Option<&'a [ResourceEstimate]>,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    templates: Arc<TemplateSet>,
}

impl Renderer {
    #[must_use]
    pub fn new(templates: Arc<TemplateSet>) -> Self {
        Self { templates }
    }

    #[must_use]
    pub fn templates(&self) -> &Arc<TemplateSet> {
        &self.templates
    }

    /// Render the raw text of a stage.
    ///
    /// # Errors
    ///
    /// - `RenderError::InvalidDiagram` for malformed SVG
    /// - `RenderError::InvalidMapping` for an unparseable row mapping
    /// - `RenderError::InvalidUpload` when the migration stage has no estimates
    /// - `RenderError::Package` / `RenderError::Csv` on output failures
    pub fn render(&self, request: RenderRequest<'_>) -> Result<RenderedArtifact, RenderError> {
        let RenderRequest {
            stage,
            raw,
            customer,
            generated_on,
            estimates,
        } = request;
        let file_name = stage_file_name(generated_on, customer, stage);

        match stage {
            StageId::Solution | StageId::PovPlan => {
                let (bytes, degraded) =
                    docx::render_document(stage, raw, customer, self.templates.docx_for(stage))?;
                if degraded {
                    tracing::warn!(stage = %stage, "No template loaded; document uses default styling");
                }
                Ok(RenderedArtifact {
                    file_name,
                    media_type: DOCX_MEDIA_TYPE,
                    bytes,
                    dropped_rows: 0,
                    degraded,
                })
            }
            StageId::Diagram => {
                let markup = diagram::validate_svg(raw)?;
                Ok(RenderedArtifact {
                    file_name,
                    media_type: SVG_MEDIA_TYPE,
                    bytes: markup.into_bytes(),
                    dropped_rows: 0,
                    degraded: false,
                })
            }
            StageId::MigrationCsv => {
                let estimates = estimates.ok_or_else(|| RenderError::InvalidUpload {
                    reason: "no resource estimates uploaded".to_string(),
                })?;
                let (records, dropped_rows) = tabular::parse_mapped_records(raw, estimates)?;
                let bytes = tabular::merge(self.templates.migration_header(), &records)?;
                if dropped_rows > 0 {
                    tracing::info!(
                        dropped_rows,
                        mapped = records.len(),
                        "Some estimate rows have no migration record"
                    );
                }
                Ok(RenderedArtifact {
                    file_name,
                    media_type: CSV_MEDIA_TYPE,
                    bytes,
                    dropped_rows,
                    degraded: false,
                })
            }
        }
    }
}
