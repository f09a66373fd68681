//! Document mode: Markdown answers rendered as styled Word documents.

mod markdown;
mod ooxml;
mod package;

pub use markdown::{Block, Run, parse_blocks, split_title};
pub use package::{DocxTemplate, extract_reference_text};

use poegen_utils::error::RenderError;
use poegen_utils::types::StageId;

/// Body text size in points.
const BODY_PT: u32 = 9;

/// Layout choices that differ between the two document stages.
struct Layout {
    cover_pt: u32,
    cover_color: &'static str,
    with_toc: bool,
    fallback_label: &'static str,
}

fn layout(stage: StageId) -> Layout {
    match stage {
        StageId::PovPlan => Layout {
            cover_pt: 22,
            cover_color: ooxml::ACCENT_DARK,
            with_toc: false,
            fallback_label: "POV 部署计划",
        },
        _ => Layout {
            cover_pt: 18,
            cover_color: ooxml::ACCENT_BLUE,
            with_toc: true,
            fallback_label: "AI 解决方案架构文档",
        },
    }
}

/// Body markup for a document stage: cover, optional table of contents,
/// then the content.
#[must_use]
pub fn document_body(stage: StageId, markdown: &str, customer: &str) -> String {
    let layout = layout(stage);
    let (title, blocks) = split_title(parse_blocks(markdown));
    let title = title.unwrap_or_else(|| format!("{} - {}", customer.trim(), layout.fallback_label));

    let mut body = String::with_capacity(markdown.len() * 4);
    ooxml::cover(&mut body, &title, layout.cover_pt, layout.cover_color);
    ooxml::page_break(&mut body);
    if layout.with_toc {
        ooxml::table_of_contents(&mut body);
        ooxml::page_break(&mut body);
    }
    ooxml::blocks(&mut body, &blocks, BODY_PT);
    body
}

/// Render a document stage into `.docx` bytes.
///
/// Returns the bytes and whether the built-in default package had to be
/// used because no template was available.
///
/// # Errors
///
/// Returns `RenderError::Package` if the package cannot be written.
pub fn render_document(
    stage: StageId,
    markdown: &str,
    customer: &str,
    template: Option<&DocxTemplate>,
) -> Result<(Vec<u8>, bool), RenderError> {
    let body = document_body(stage, markdown, customer);
    let bytes = package::write_package(template, &body)?;
    Ok((bytes, template.is_none()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_has_toc_and_title_from_heading() {
        let body = document_body(
            StageId::Solution,
            "# 京华数码 - 智能外贸 AI 平台方案\n\n## 一、摘要\n\n正文。\n",
            "京华数码",
        );
        assert!(body.contains("京华数码 - 智能外贸 AI 平台方案"));
        assert!(body.contains("TOC \\o"));
        assert!(body.contains(r#"<w:color w:val="4874CB"/>"#));
        assert_eq!(body.matches(r#"<w:br w:type="page"/>"#).count(), 2);
        // The title heading is not repeated in the body.
        assert!(!body.contains(r#"<w:pStyle w:val="Heading1"/>"#));
    }

    #[test]
    fn test_pov_plan_has_no_toc_and_falls_back_to_customer_title() {
        let body = document_body(StageId::PovPlan, "## 一、执行周期\n\n2026年2月25日\n", "京华数码");
        assert!(body.contains("京华数码 - POV 部署计划"));
        assert!(!body.contains("TOC \\o"));
        assert!(body.contains(r#"<w:sz w:val="44"/>"#));
        assert_eq!(body.matches(r#"<w:br w:type="page"/>"#).count(), 1);
    }

    #[test]
    fn test_render_without_template_is_degraded() {
        let (bytes, degraded) =
            render_document(StageId::Solution, "# 标题\n\n正文\n", "客户", None).unwrap();
        assert!(degraded);
        assert!(bytes.starts_with(b"PK"));
    }
}
