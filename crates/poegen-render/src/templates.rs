//! Template files, loaded once and shared read-only by every session.

use std::path::{Path, PathBuf};

use poegen_utils::logging::log_template_missing;
use poegen_utils::types::StageId;

use crate::docx::DocxTemplate;
use crate::tabular::{default_header, parse_header};

/// Load outcome of one template file, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStatus {
    pub name: &'static str,
    pub path: PathBuf,
    pub loaded: bool,
    /// Why the file was not used, when it exists but could not be read.
    pub problem: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TemplateSet {
    solution: Option<DocxTemplate>,
    pov: Option<DocxTemplate>,
    migration_header: Vec<String>,
    statuses: Vec<TemplateStatus>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl TemplateSet {
    /// A set with no templates: default document styling and the built-in
    /// migration header.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            solution: None,
            pov: None,
            migration_header: default_header(),
            statuses: Vec::new(),
        }
    }

    /// Load the three template files. Missing or unreadable files are
    /// logged and replaced by defaults; loading never fails.
    #[must_use]
    pub fn load(solution: &Path, pov: &Path, migration_header: &Path) -> Self {
        let mut statuses = Vec::with_capacity(3);

        let solution = load_docx("solution", solution, &mut statuses);
        let pov = load_docx("pov", pov, &mut statuses);

        let header = read_optional("migration_header", migration_header, &mut statuses, |path| {
            let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
            parse_header(&bytes).map_err(|e| e.to_string())
        });

        Self {
            solution,
            pov,
            migration_header: header.unwrap_or_else(default_header),
            statuses,
        }
    }

    /// Template package for a document stage.
    #[must_use]
    pub fn docx_for(&self, stage: StageId) -> Option<&DocxTemplate> {
        match stage {
            StageId::Solution => self.solution.as_ref(),
            StageId::PovPlan => self.pov.as_ref(),
            StageId::Diagram | StageId::MigrationCsv => None,
        }
    }

    /// Plain text of a document template, used as a style reference in
    /// prompts. `None` when the template is absent or has no text.
    #[must_use]
    pub fn reference_text(&self, stage: StageId) -> Option<String> {
        let template = self.docx_for(stage)?;
        match template.reference_text() {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(stage = %stage, error = %err, "Template text could not be extracted");
                None
            }
        }
    }

    #[must_use]
    pub fn migration_header(&self) -> &[String] {
        &self.migration_header
    }

    #[must_use]
    pub fn statuses(&self) -> &[TemplateStatus] {
        &self.statuses
    }
}

fn load_docx(
    name: &'static str,
    path: &Path,
    statuses: &mut Vec<TemplateStatus>,
) -> Option<DocxTemplate> {
    read_optional(name, path, statuses, |path| {
        DocxTemplate::load(path).map_err(|e| e.to_string())
    })
}

fn read_optional<T>(
    name: &'static str,
    path: &Path,
    statuses: &mut Vec<TemplateStatus>,
    read: impl FnOnce(&Path) -> Result<T, String>,
) -> Option<T> {
    let mut status = TemplateStatus {
        name,
        path: path.to_path_buf(),
        loaded: false,
        problem: None,
    };

    let value = if path.is_file() {
        match read(path) {
            Ok(value) => {
                status.loaded = true;
                tracing::debug!(template = name, path = %path.display(), "Template loaded");
                Some(value)
            }
            Err(problem) => {
                tracing::warn!(
                    template = name,
                    path = %path.display(),
                    error = %problem,
                    "Template unreadable; using defaults"
                );
                status.problem = Some(problem);
                None
            }
        }
    } else {
        log_template_missing(name, &path.display().to_string());
        None
    };

    statuses.push(status);
    value
}
