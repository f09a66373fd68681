//! OOXML package handling: template loading, body replacement, zip output.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use poegen_utils::error::RenderError;

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";

const DOCUMENT_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    "<w:body>",
);

const DOCUMENT_CLOSE: &str = "</w:body></w:document>";

/// A4 portrait, 1 inch margins.
const DEFAULT_SECT_PR: &str = concat!(
    r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/>"#,
    r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="851" w:footer="992" w:gutter="0"/>"#,
    "</w:sectPr>",
);

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    r#"<Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/>"#,
    "</Types>",
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    "</Relationships>",
);

const DOCUMENT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/>"#,
    "</Relationships>",
);

const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="微软雅黑" w:hAnsi="微软雅黑" w:eastAsia="微软雅黑" w:cs="微软雅黑"/>"#,
    r#"<w:sz w:val="18"/><w:szCs w:val="18"/><w:lang w:val="en-US" w:eastAsia="zh-CN"/></w:rPr></w:rPrDefault>"#,
    r#"<w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="300" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults>"#,
    r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
    r#"<w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
    r#"<w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
    r#"<w:pPr><w:keepNext/><w:spacing w:before="200" w:after="80"/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style>"#,
    r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/>"#,
    r#"<w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
    r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
    r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/></w:tblBorders></w:tblPr></w:style>"#,
    "</w:styles>",
);

const SETTINGS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:updateFields w:val="true"/><w:defaultTabStop w:val="420"/>"#,
    "</w:settings>",
);

/// An existing `.docx` whose styles, headers, footers and section
/// properties are kept while the body is replaced.
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    /// Every part of the package in its original order.
    entries: Vec<(String, Vec<u8>)>,
    document: String,
}

impl DocxTemplate {
    /// Read a template from disk.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Package` if the file cannot be read or is not a
    /// Word package.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::Package(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a template from the bytes of a `.docx` file.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Package` if the bytes are not a zip archive or
    /// have no `word/document.xml` part.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| RenderError::Package(e.to_string()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| RenderError::Package(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)
                .map_err(|e| RenderError::Package(format!("{}: {e}", file.name())))?;
            entries.push((file.name().to_string(), data));
        }

        let document = entries
            .iter()
            .find(|(name, _)| name == DOCUMENT_PART)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .ok_or_else(|| RenderError::Package(format!("missing {DOCUMENT_PART}")))?;

        Ok(Self { entries, document })
    }

    /// Plain text of the template body, for use as a style reference.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Xml` if the document part is malformed.
    pub fn reference_text(&self) -> Result<String, RenderError> {
        extract_reference_text(&self.document)
    }

    /// Rebuild `word/document.xml` around `body`, keeping everything outside
    /// the body element and the trailing section properties.
    fn document_with_body(&self, body: &str) -> Result<String, RenderError> {
        let body_start = self
            .document
            .find("<w:body")
            .and_then(|start| {
                self.document[start..]
                    .find('>')
                    .map(|close| start + close + 1)
            })
            .ok_or_else(|| RenderError::Package("document part has no <w:body>".to_string()))?;
        let body_end = self
            .document
            .rfind("</w:body>")
            .filter(|end| *end >= body_start)
            .ok_or_else(|| RenderError::Package("document part has no </w:body>".to_string()))?;

        let sect_pr = body_section_properties(&self.document[body_start..body_end])
            .unwrap_or(DEFAULT_SECT_PR);

        let mut out = String::with_capacity(self.document.len() + body.len());
        out.push_str(&self.document[..body_start]);
        out.push_str(body);
        out.push_str(sect_pr);
        out.push_str(&self.document[body_end..]);
        Ok(out)
    }
}

/// The section properties that are a direct child of the body: the last
/// `<w:sectPr` not followed by the end of a paragraph.
fn body_section_properties(body: &str) -> Option<&str> {
    let mut search_end = body.len();
    while let Some(start) = body[..search_end].rfind("<w:sectPr") {
        let tail = &body[start..];
        let is_element = matches!(
            tail.as_bytes().get("<w:sectPr".len()),
            Some(b' ' | b'>' | b'/')
        );
        if is_element {
            return (!tail.contains("</w:p>")).then(|| tail.trim_end());
        }
        search_end = start;
    }
    None
}

/// Write a complete `.docx` with `body` as the document body.
///
/// With a template the template's parts are copied in their original order
/// and only the document part changes; otherwise a minimal package with
/// default styles is produced. Entry timestamps are fixed so identical input
/// yields identical bytes.
///
/// # Errors
///
/// Returns `RenderError::Package` on zip failures.
pub fn write_package(template: Option<&DocxTemplate>, body: &str) -> Result<Vec<u8>, RenderError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mut write_entry = |name: &str, data: &[u8]| -> Result<(), RenderError> {
        writer
            .start_file(name, options)
            .map_err(|e| RenderError::Package(e.to_string()))?;
        writer
            .write_all(data)
            .map_err(|e| RenderError::Package(e.to_string()))
    };

    match template {
        Some(template) => {
            let document = template.document_with_body(body)?;
            for (name, data) in &template.entries {
                if name == DOCUMENT_PART {
                    write_entry(name, document.as_bytes())?;
                } else {
                    write_entry(name, data)?;
                }
            }
        }
        None => {
            let document = format!("{DOCUMENT_OPEN}{body}{DEFAULT_SECT_PR}{DOCUMENT_CLOSE}");
            write_entry("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
            write_entry("_rels/.rels", PACKAGE_RELS.as_bytes())?;
            write_entry(DOCUMENT_PART, document.as_bytes())?;
            write_entry("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes())?;
            write_entry("word/styles.xml", STYLES.as_bytes())?;
            write_entry("word/settings.xml", SETTINGS.as_bytes())?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| RenderError::Package(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[derive(Default)]
struct TableText {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

impl TableText {
    fn to_markdown(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| c.replace('|', "/")).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
            if index == 0 {
                lines.push(format!("|{}|", vec!["---"; row.len().max(1)].join("|")));
            }
        }
        lines
    }
}

/// Paragraph text and tables of a `word/document.xml`, in document order.
///
/// Tables become Markdown pipe tables; nested tables fold into the
/// enclosing cell.
///
/// # Errors
///
/// Returns `RenderError::Xml` on malformed XML.
pub fn extract_reference_text(document_xml: &str) -> Result<String, RenderError> {
    let mut reader = Reader::from_str(document_xml);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;

    let mut lines: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut table_depth = 0usize;
    let mut table = TableText::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => paragraph.clear(),
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        table = TableText::default();
                    }
                }
                b"tr" if table_depth == 1 => table.row.clear(),
                b"tc" if table_depth == 1 => table.cell.clear(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" | b"br" => paragraph.push(' '),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = paragraph.trim().to_string();
                    paragraph.clear();
                    if text.is_empty() {
                        continue;
                    }
                    if table_depth == 0 {
                        lines.push(text);
                    } else {
                        table.cell.push(text);
                    }
                }
                b"tc" if table_depth == 1 => {
                    let cell = table.cell.join(" ");
                    table.row.push(cell);
                }
                b"tr" if table_depth == 1 => {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        lines.extend(table.to_markdown());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|err| RenderError::Xml(err.to_string()))?;
                paragraph.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(RenderError::Xml(format!(
                    "at byte {}: {err}",
                    reader.error_position()
                )));
            }
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> String {
        format!("{DOCUMENT_OPEN}{body}{DOCUMENT_CLOSE}")
    }

    fn template_bytes(body: &str) -> Vec<u8> {
        let options = SimpleFileOptions::default().last_modified_time(DateTime::default());
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("word/document.xml", document(body)),
            ("word/footer1.xml", "<w:ftr/>".to_string()),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_default_package_is_complete() {
        let bytes = write_package(None, "<w:p/>").unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/settings.xml",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }
        let doc = read_part(&bytes, DOCUMENT_PART);
        assert!(doc.contains("<w:body><w:p/><w:sectPr>"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = write_package(None, "<w:p/>").unwrap();
        let b = write_package(None, "<w:p/>").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_template_body_replaced_and_section_kept() {
        let sect = r#"<w:sectPr><w:footerReference w:type="default" r:id="rId9"/></w:sectPr>"#;
        let body = format!("<w:p><w:r><w:t>旧内容</w:t></w:r></w:p>{sect}");
        let template = DocxTemplate::from_bytes(&template_bytes(&body)).unwrap();

        let bytes = write_package(Some(&template), "<w:p><w:r><w:t>新内容</w:t></w:r></w:p>").unwrap();
        let doc = read_part(&bytes, DOCUMENT_PART);
        assert!(doc.contains("新内容"));
        assert!(!doc.contains("旧内容"));
        assert!(doc.contains(sect));
        assert_eq!(read_part(&bytes, "word/footer1.xml"), "<w:ftr/>");

        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "word/document.xml", "word/footer1.xml"]
        );
    }

    #[test]
    fn test_paragraph_section_properties_are_not_body_level() {
        let body = r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="1"/></w:sectPr></w:pPr></w:p><w:p/>"#;
        assert_eq!(body_section_properties(body), None);

        let body = r#"<w:p/><w:sectPr/>"#;
        assert_eq!(body_section_properties(body), Some("<w:sectPr/>"));
    }

    #[test]
    fn test_template_without_document_part_is_rejected() {
        let options = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("readme.txt", options).unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(
            DocxTemplate::from_bytes(&bytes),
            Err(RenderError::Package(_))
        ));
        assert!(DocxTemplate::from_bytes(b"not a zip").is_err());
    }

    #[test]
    fn test_reference_text_keeps_order_and_tables() {
        let body = concat!(
            "<w:p><w:r><w:t>一、摘要</w:t></w:r></w:p>",
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>类别</w:t></w:r></w:p></w:tc>",
            "<w:tc><w:p><w:r><w:t>需求描述</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>业务需求</w:t></w:r></w:p></w:tc>",
            "<w:tc><w:p><w:r><w:t>降本 &amp; 增效</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
            "<w:p><w:r><w:t>结尾</w:t></w:r></w:p>",
        );
        let text = extract_reference_text(&document(body)).unwrap();
        assert_eq!(
            text,
            "一、摘要\n| 类别 | 需求描述 |\n|---|---|\n| 业务需求 | 降本 & 增效 |\n结尾"
        );
    }

    #[test]
    fn test_reference_text_ignores_field_instructions() {
        let body = concat!(
            "<w:p><w:r><w:instrText> TOC \\o </w:instrText></w:r>",
            "<w:r><w:t>A</w:t></w:r><w:r><w:tab/><w:t>B</w:t></w:r></w:p>",
        );
        assert_eq!(extract_reference_text(&document(body)).unwrap(), "A B");
    }
}
