//! Prompt construction for the four generation stages
//!
//! [`PromptBuilder::build`] is a pure function of the session state it reads
//! through [`PromptSource`] and the template reference material it was
//! created with. It never talks to the model.

mod system;

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate, Weekday};
use poegen_utils::error::PoeError;
use poegen_utils::types::{ResourceEstimate, SessionInputs, StageId};
use tracing::debug;

/// Read access to the session state a prompt is built from.
pub trait PromptSource {
    fn inputs(&self) -> &SessionInputs;

    /// Raw text of the current result for `stage`, if one exists.
    fn stage_text(&self, stage: StageId) -> Option<&str>;

    /// Uploaded resource estimates, if any.
    fn estimates(&self) -> Option<&[ResourceEstimate]>;
}

/// Template-derived text injected into prompts.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMaterial {
    /// Plain text of the solution template, if it was found.
    pub solution_reference: Option<String>,
    /// Plain text of the POV template, if it was found.
    pub pov_reference: Option<String>,
    /// Column names of the migration import template, in order.
    pub migration_header: Vec<String>,
}

/// A complete chat prompt for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub stage: StageId,
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    references: ReferenceMaterial,
}

const REFERENCE_HEADING: &str = "## 【参考模板文档：学习其风格和结构，不要照抄具体数据】";

impl PromptBuilder {
    #[must_use]
    pub fn new(references: ReferenceMaterial) -> Self {
        Self { references }
    }

    #[must_use]
    pub fn references(&self) -> &ReferenceMaterial {
        &self.references
    }

    /// Build the prompt for `stage`.
    ///
    /// # Errors
    ///
    /// - `MissingPrerequisite` when a stage result the prompt reads is absent
    /// - `MissingInput` when a required session field is empty
    pub fn build(&self, stage: StageId, source: &dyn PromptSource) -> Result<Prompt, PoeError> {
        if let Some(prerequisite) = stage.prerequisite()
            && source.stage_text(prerequisite).is_none()
        {
            return Err(PoeError::MissingPrerequisite {
                stage,
                missing: prerequisite,
            });
        }

        let prompt = match stage {
            StageId::Solution => self.solution(source)?,
            StageId::PovPlan => self.pov_plan(source)?,
            StageId::Diagram => Self::diagram(source)?,
            StageId::MigrationCsv => self.migration_csv(source)?,
        };

        debug!(
            stage = %stage,
            system_chars = prompt.system.chars().count(),
            user_chars = prompt.user.chars().count(),
            "Prompt built"
        );

        Ok(prompt)
    }

    fn solution(&self, source: &dyn PromptSource) -> Result<Prompt, PoeError> {
        let stage = StageId::Solution;
        let inputs = source.inputs();
        let customer = required(stage, "customer_name", &inputs.customer_name)?;
        let background = required(stage, "background", &inputs.background)?;

        let mut user = String::new();
        let _ = writeln!(user, "## 客户信息");
        let _ = writeln!(user, "- **客户名称**：{customer}");
        let _ = writeln!(user, "- **预估年消耗 (USD)**：{}", inputs.budget.trim());
        let _ = write!(user, "\n## 客户背景\n{background}");
        append_reference(&mut user, self.references.solution_reference.as_deref());

        Ok(Prompt {
            stage,
            system: system::SOLUTION.to_string(),
            user,
        })
    }

    fn pov_plan(&self, source: &dyn PromptSource) -> Result<Prompt, PoeError> {
        let stage = StageId::PovPlan;
        let inputs = source.inputs();
        let customer = required(stage, "customer_name", &inputs.customer_name)?;
        if inputs.pov.end < inputs.pov.start {
            return Err(PoeError::MissingInput {
                stage,
                field: "pov.end (must not be before pov.start)".to_string(),
            });
        }
        let solution = prior(source, stage, StageId::Solution)?;

        let mut user = String::new();
        let _ = write!(
            user,
            "以下是已生成的解决方案架构文档，请据此生成 POV 部署计划：\n\n{solution}\n\n"
        );
        let _ = writeln!(user, "## 补充信息");
        let _ = writeln!(user, "- **客户名称**：{customer}");
        let _ = writeln!(user, "- **POV 周期**：{}", inputs.pov.display_range());
        let _ = writeln!(
            user,
            "- **工作日天数**：{}",
            weekdays_between(inputs.pov.start, inputs.pov.end)
        );
        let _ = write!(user, "\n## 甲乙方项目人员\n{}", inputs.team_roster.trim());
        append_reference(&mut user, self.references.pov_reference.as_deref());

        Ok(Prompt {
            stage,
            system: system::POV_PLAN.to_string(),
            user,
        })
    }

    fn diagram(source: &dyn PromptSource) -> Result<Prompt, PoeError> {
        let stage = StageId::Diagram;
        let solution = prior(source, stage, StageId::Solution)?;
        let pov = prior(source, stage, StageId::PovPlan)?;

        let user = format!(
            "## 解决方案架构文档\n\n{solution}\n\n## POV 部署计划\n\n{pov}\n\n请输出架构总览图的 SVG。"
        );

        Ok(Prompt {
            stage,
            system: system::DIAGRAM.to_string(),
            user,
        })
    }

    fn migration_csv(&self, source: &dyn PromptSource) -> Result<Prompt, PoeError> {
        let stage = StageId::MigrationCsv;
        let estimates = match source.estimates() {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                return Err(PoeError::MissingInput {
                    stage,
                    field: "resource_estimates".to_string(),
                });
            }
        };
        let solution = prior(source, stage, StageId::Solution)?;

        let mut user = String::new();
        let _ = writeln!(user, "## 迁移导入模板列名（按顺序）");
        for column in &self.references.migration_header {
            let _ = writeln!(user, "- {column}");
        }
        let _ = writeln!(user, "\n## 资源估算清单（共 {} 行）", estimates.len());
        for estimate in estimates {
            let cells: Vec<String> = estimate
                .fields
                .iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(name, value)| format!("{name}={}", value.trim()))
                .collect();
            let _ = writeln!(user, "第 {} 行: {}", estimate.row, cells.join("; "));
        }
        let _ = write!(user, "\n## 解决方案架构文档（背景参考）\n\n{solution}");

        Ok(Prompt {
            stage,
            system: system::MIGRATION_CSV.to_string(),
            user,
        })
    }
}

fn required<'a>(stage: StageId, field: &str, value: &'a str) -> Result<&'a str, PoeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PoeError::MissingInput {
            stage,
            field: field.to_string(),
        });
    }
    Ok(trimmed)
}

fn prior<'a>(
    source: &'a dyn PromptSource,
    stage: StageId,
    needed: StageId,
) -> Result<&'a str, PoeError> {
    source
        .stage_text(needed)
        .ok_or(PoeError::MissingPrerequisite {
            stage,
            missing: needed,
        })
}

fn append_reference(user: &mut String, reference: Option<&str>) {
    if let Some(text) = reference.map(str::trim).filter(|t| !t.is_empty()) {
        let _ = write!(user, "\n\n---\n\n{REFERENCE_HEADING}\n\n{text}");
    }
}

/// Monday-to-Friday days in `[start, end]`.
fn weekdays_between(start: NaiveDate, end: NaiveDate) -> usize {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .count()
}
