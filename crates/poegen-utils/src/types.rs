//! Core domain types shared by every poegen crate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifier of one of the four ordered generation stages.
///
/// Stages run in the fixed order Solution → PovPlan → Diagram → MigrationCsv.
/// Every stage except the first requires the current result of the stage
/// immediately before it.
///
/// # Serialization
///
/// `StageId` serializes to its kebab-case name (e.g. `"pov-plan"`).
///
/// ```rust
/// use poegen_utils::types::StageId;
///
/// assert_eq!(StageId::Diagram.number(), 3);
/// assert_eq!(StageId::Diagram.prerequisite(), Some(StageId::PovPlan));
/// assert_eq!(StageId::Solution.prerequisite(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageId {
    /// Stage 1: solution architecture document.
    Solution,
    /// Stage 2: phased POV deployment plan.
    PovPlan,
    /// Stage 3: architecture diagram as SVG markup.
    Diagram,
    /// Stage 4: migration/cost CSV merged against the import header.
    MigrationCsv,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [StageId; 4] = [
        StageId::Solution,
        StageId::PovPlan,
        StageId::Diagram,
        StageId::MigrationCsv,
    ];

    /// Canonical lowercase name used in logs and CLI output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Solution => "solution",
            Self::PovPlan => "pov-plan",
            Self::Diagram => "diagram",
            Self::MigrationCsv => "migration-csv",
        }
    }

    /// 1-based position in the pipeline.
    #[must_use]
    pub const fn number(&self) -> u8 {
        match self {
            Self::Solution => 1,
            Self::PovPlan => 2,
            Self::Diagram => 3,
            Self::MigrationCsv => 4,
        }
    }

    /// Look a stage up by its 1-based position.
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Solution),
            2 => Some(Self::PovPlan),
            3 => Some(Self::Diagram),
            4 => Some(Self::MigrationCsv),
            _ => None,
        }
    }

    /// The stage whose current result must exist before this one may run.
    #[must_use]
    pub const fn prerequisite(&self) -> Option<Self> {
        match self {
            Self::Solution => None,
            Self::PovPlan => Some(Self::Solution),
            Self::Diagram => Some(Self::PovPlan),
            Self::MigrationCsv => Some(Self::Diagram),
        }
    }

    /// This stage and every stage after it, in order.
    pub fn and_downstream(self) -> impl Iterator<Item = StageId> {
        Self::ALL.into_iter().filter(move |s| *s >= self)
    }

    /// Document-type label used in artifact file names.
    #[must_use]
    pub const fn doc_type(&self) -> &'static str {
        match self {
            Self::Solution => "AI解决方案架构文档",
            Self::PovPlan => "POV部署计划",
            Self::Diagram => "架构图",
            Self::MigrationCsv => "资源迁移清单",
        }
    }

    /// File extension of the rendered artifact.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Solution | Self::PovPlan => "docx",
            Self::Diagram => "svg",
            Self::MigrationCsv => "csv",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_number(n).ok_or_else(|| format!("stage number {n} is out of range 1-4"));
        }
        match s.to_lowercase().as_str() {
            "solution" => Ok(Self::Solution),
            "pov-plan" | "pov_plan" | "pov" => Ok(Self::PovPlan),
            "diagram" => Ok(Self::Diagram),
            "migration-csv" | "migration_csv" | "csv" => Ok(Self::MigrationCsv),
            other => Err(format!(
                "unknown stage '{other}'. Expected 1-4 or one of: solution, pov-plan, diagram, migration-csv"
            )),
        }
    }
}

/// Start and end date of the proof-of-value trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PovWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PovWindow {
    /// Two-week window starting on `start`, the form's default.
    #[must_use]
    pub fn two_weeks_from(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + chrono::Duration::days(14),
        }
    }

    /// Render as `YYYY/MM/DD - YYYY/MM/DD`.
    #[must_use]
    pub fn display_range(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%Y/%m/%d"),
            self.end.format("%Y/%m/%d")
        )
    }
}

/// User-editable inputs of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInputs {
    pub customer_name: String,
    /// Annual spend estimate, free text such as `50k+`.
    #[serde(default)]
    pub budget: String,
    pub background: String,
    pub pov: PovWindow,
    /// One team member per line, e.g. `技术负责人: 张三 (乙方)`.
    #[serde(default)]
    pub team_roster: String,
}

impl SessionInputs {
    /// Inputs with empty text fields and a two-week POV starting on `today`.
    #[must_use]
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            customer_name: String::new(),
            budget: String::new(),
            background: String::new(),
            pov: PovWindow::two_weeks_from(today),
            team_roster: String::new(),
        }
    }
}

/// One row of the uploaded resource-estimate spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Column name / cell value pairs in spreadsheet column order.
    pub fields: Vec<(String, String)>,
}

impl ResourceEstimate {
    /// Value of the named column, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    ConfigFile(PathBuf),
    SecretsFile(PathBuf),
    Environment,
    Cli,
}

impl ConfigSource {
    /// Short label for `poegen config` output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Defaults => "default",
            Self::ConfigFile(_) => "config",
            Self::SecretsFile(_) => "secrets",
            Self::Environment => "env",
            Self::Cli => "cli",
        }
    }
}

/// Provider details recorded on a stage result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmInfo {
    pub provider: Option<String>,
    pub model_used: Option<String>,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    pub finish_reason: Option<String>,
}
