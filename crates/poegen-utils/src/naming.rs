//! Artifact file naming: `MMDD-<customer-name>-<document-type>.<ext>`.

use chrono::{Datelike, NaiveDate};

use crate::types::StageId;

/// Characters that cannot appear in a file name on common platforms.
const ILLEGAL_FILE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Build an artifact file name from its parts.
///
/// ```rust
/// use chrono::NaiveDate;
/// use poegen_utils::naming::artifact_file_name;
///
/// let date = NaiveDate::from_ymd_opt(2026, 2, 26).unwrap();
/// assert_eq!(
///     artifact_file_name(date, "宇宙无敌科技", "AI解决方案架构文档", "docx"),
///     "0226-宇宙无敌科技-AI解决方案架构文档.docx"
/// );
/// ```
#[must_use]
pub fn artifact_file_name(date: NaiveDate, customer: &str, doc_type: &str, ext: &str) -> String {
    format!(
        "{:02}{:02}-{}-{}.{}",
        date.month(),
        date.day(),
        sanitize_component(customer),
        doc_type,
        ext
    )
}

/// File name of the artifact a stage produces.
#[must_use]
pub fn stage_file_name(date: NaiveDate, customer: &str, stage: StageId) -> String {
    artifact_file_name(date, customer, stage.doc_type(), stage.extension())
}

/// File name for raw model output that failed to render:
/// `MMDD-<customer-name>-<document-type>-raw.txt`.
#[must_use]
pub fn raw_output_file_name(date: NaiveDate, customer: &str, stage: StageId) -> String {
    artifact_file_name(date, customer, &format!("{}-raw", stage.doc_type()), "txt")
}

fn sanitize_component(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Customer".to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if ILLEGAL_FILE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 26).unwrap();
        assert_eq!(
            artifact_file_name(date, "宇宙无敌科技", "AI解决方案架构文档", "docx"),
            "0226-宇宙无敌科技-AI解决方案架构文档.docx"
        );
    }

    #[test]
    fn test_stage_file_names() {
        let date = NaiveDate::from_ymd_opt(2026, 11, 3).unwrap();
        assert_eq!(
            stage_file_name(date, "Contoso", StageId::PovPlan),
            "1103-Contoso-POV部署计划.docx"
        );
        assert_eq!(
            stage_file_name(date, "Contoso", StageId::Diagram),
            "1103-Contoso-架构图.svg"
        );
        assert_eq!(
            stage_file_name(date, "Contoso", StageId::MigrationCsv),
            "1103-Contoso-资源迁移清单.csv"
        );
        assert_eq!(
            raw_output_file_name(date, "Contoso", StageId::Diagram),
            "1103-Contoso-架构图-raw.txt"
        );
    }

    #[test]
    fn test_customer_name_sanitized() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(
            artifact_file_name(date, " A/B: Co ", "Doc", "csv"),
            "0109-A_B_ Co-Doc.csv"
        );
        assert_eq!(artifact_file_name(date, "  ", "Doc", "csv"), "0109-Customer-Doc.csv");
    }

    proptest! {
        #[test]
        fn prop_file_name_has_no_separators(customer in "\\PC{0,40}", month in 1u32..=12, day in 1u32..=28) {
            let date = NaiveDate::from_ymd_opt(2026, month, day).unwrap();
            let name = artifact_file_name(date, &customer, "Doc", "docx");
            let expected_prefix = format!("{month:02}{day:02}-");
            prop_assert!(name.starts_with(&expected_prefix));
            prop_assert!(name.ends_with("-Doc.docx"));
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
        }
    }
}
