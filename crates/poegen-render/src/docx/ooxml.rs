//! WordprocessingML body markup.

use quick_xml::escape::escape;
use std::fmt::Write as _;

use super::markdown::{Block, Run};

/// Body font for CJK and Latin text.
pub const CN_FONT: &str = "微软雅黑";
/// Cover title font.
pub const CN_FONT_ALT: &str = "Microsoft YaHei UI";

/// Table header fill and cover colour of the POV plan.
pub const ACCENT_DARK: &str = "156082";
/// Cover colour of the solution document.
pub const ACCENT_BLUE: &str = "4874CB";

/// Usable text width of an A4 page with 1 inch margins, in twips.
const TEXT_WIDTH_TWIPS: usize = 9026;

#[derive(Debug, Clone, Copy)]
struct RunStyle<'a> {
    font: &'a str,
    size_pt: u32,
    bold: bool,
    italic: bool,
    color: Option<&'a str>,
}

impl RunStyle<'static> {
    const fn body(size_pt: u32) -> Self {
        Self {
            font: CN_FONT,
            size_pt,
            bold: false,
            italic: false,
            color: None,
        }
    }
}

fn write_run(out: &mut String, text: &str, style: RunStyle<'_>) {
    let font = escape(style.font);
    let _ = write!(
        out,
        r#"<w:r><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/>"#
    );
    if style.bold {
        out.push_str("<w:b/><w:bCs/>");
    }
    if style.italic {
        out.push_str("<w:i/><w:iCs/>");
    }
    if let Some(color) = style.color {
        let _ = write!(out, r#"<w:color w:val="{color}"/>"#);
    }
    let half_points = style.size_pt * 2;
    let _ = write!(
        out,
        r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    );
}

fn write_runs(out: &mut String, runs: &[Run], base: RunStyle<'_>) {
    for run in runs {
        write_run(
            out,
            &run.text,
            RunStyle {
                bold: base.bold || run.bold,
                italic: base.italic || run.italic,
                ..base
            },
        );
    }
}

pub fn empty_paragraph(out: &mut String) {
    out.push_str("<w:p/>");
}

pub fn page_break(out: &mut String) {
    out.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
}

/// Cover page: spacer paragraphs, then the centered title.
pub fn cover(out: &mut String, title: &str, size_pt: u32, color: &str) {
    for _ in 0..8 {
        empty_paragraph(out);
    }
    out.push_str(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>"#);
    write_run(
        out,
        title,
        RunStyle {
            font: CN_FONT_ALT,
            size_pt,
            bold: true,
            italic: false,
            color: Some(color),
        },
    );
    out.push_str("</w:p>");
}

/// Table-of-contents heading and field. Word fills the field on open
/// because the settings part asks it to update fields.
pub fn table_of_contents(out: &mut String) {
    out.push_str(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>"#);
    write_run(
        out,
        "目录",
        RunStyle {
            bold: true,
            ..RunStyle::body(16)
        },
    );
    out.push_str("</w:p>");
    empty_paragraph(out);
    out.push_str(concat!(
        r#"<w:p><w:r><w:fldChar w:fldCharType="begin" w:dirty="true"/></w:r>"#,
        r#"<w:r><w:instrText xml:space="preserve"> TOC \o "1-3" \h \z \u </w:instrText></w:r>"#,
        r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r>"#,
        r#"<w:r><w:t>（右键点击此处，选择“更新域”生成目录）</w:t></w:r>"#,
        r#"<w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#,
    ));
}

/// Append the markup of `blocks` with the body text at `body_pt`.
pub fn blocks(out: &mut String, blocks: &[Block], body_pt: u32) {
    for block in blocks {
        match block {
            Block::Heading { level, runs } => heading(out, *level, runs),
            Block::Paragraph(runs) => {
                out.push_str("<w:p>");
                write_runs(out, runs, RunStyle::body(body_pt));
                out.push_str("</w:p>");
            }
            Block::ListItem {
                marker,
                depth,
                runs,
            } => {
                let left = 360 * (depth + 1);
                let _ = write!(
                    out,
                    r#"<w:p><w:pPr><w:ind w:left="{left}" w:hanging="360"/></w:pPr>"#
                );
                write_run(out, &format!("{marker}  "), RunStyle::body(body_pt));
                write_runs(out, runs, RunStyle::body(body_pt));
                out.push_str("</w:p>");
            }
            Block::Table(rows) => {
                table(out, rows, body_pt);
                empty_paragraph(out);
            }
        }
    }
}

fn heading(out: &mut String, level: u8, runs: &[Run]) {
    let size_pt = match level {
        1 => 18,
        2 => 14,
        _ => 12,
    };
    let _ = write!(
        out,
        r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/><w:keepNext/><w:outlineLvl w:val="{}"/></w:pPr>"#,
        level.saturating_sub(1)
    );
    write_runs(
        out,
        runs,
        RunStyle {
            bold: true,
            ..RunStyle::body(size_pt)
        },
    );
    out.push_str("</w:p>");
}

fn table(out: &mut String, rows: &[Vec<Vec<Run>>], body_pt: u32) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let width = TEXT_WIDTH_TWIPS / columns;

    out.push_str(concat!(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="5000" w:type="pct"/>"#,
        "<w:tblBorders>",
        r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        "</w:tblBorders></w:tblPr><w:tblGrid>",
    ));
    for _ in 0..columns {
        let _ = write!(out, r#"<w:gridCol w:w="{width}"/>"#);
    }
    out.push_str("</w:tblGrid>");

    for (index, row) in rows.iter().enumerate() {
        let header = index == 0;
        out.push_str(if header {
            "<w:tr><w:trPr><w:tblHeader/></w:trPr>"
        } else {
            "<w:tr>"
        });
        for column in 0..columns {
            let _ = write!(out, r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/>"#);
            if header {
                let _ = write!(
                    out,
                    r#"<w:shd w:val="clear" w:color="auto" w:fill="{ACCENT_DARK}"/>"#
                );
            }
            out.push_str("</w:tcPr><w:p>");
            if let Some(runs) = row.get(column) {
                let style = if header {
                    RunStyle {
                        bold: true,
                        color: Some("FFFFFF"),
                        ..RunStyle::body(body_pt)
                    }
                } else {
                    RunStyle::body(body_pt)
                };
                write_runs(out, runs, style);
            }
            out.push_str("</w:p></w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}
