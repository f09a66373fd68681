//! Diagram mode: the model's SVG answer, checked for well-formedness.

use quick_xml::Reader;
use quick_xml::events::Event;

use poegen_utils::error::RenderError;

/// Remove a surrounding Markdown code fence, if present.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```svg, ```xml) with the rest of the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Validate the model's answer and return the cleaned SVG markup.
///
/// The markup must be well-formed XML with exactly one root element named
/// `svg` and no text outside it.
///
/// # Errors
///
/// Returns `RenderError::InvalidDiagram` carrying the raw answer.
pub fn validate_svg(raw: &str) -> Result<String, RenderError> {
    let markup = strip_code_fence(raw);
    check_markup(markup).map_err(|reason| RenderError::InvalidDiagram {
        reason,
        raw: raw.to_string(),
    })?;
    Ok(markup.to_string())
}

fn check_markup(markup: &str) -> Result<(), String> {
    if markup.is_empty() {
        return Err("empty output".to_string());
    }

    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;

    let mut open: Vec<String> = Vec::new();
    let mut roots = 0usize;

    let mut enter_root = |name: &str, depth: usize| -> Result<(), String> {
        if depth > 0 {
            return Ok(());
        }
        roots += 1;
        if roots > 1 {
            return Err(format!("second root element <{name}>"));
        }
        if name != "svg" {
            return Err(format!("root element is <{name}>, expected <svg>"));
        }
        Ok(())
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                enter_root(&name, open.len())?;
                open.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                enter_root(&name, open.len())?;
            }
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Text(e)) if open.is_empty() => {
                let text = String::from_utf8_lossy(&e).into_owned();
                if !text.trim().is_empty() {
                    return Err(format!("text outside the root element: {}", preview(&text)));
                }
            }
            Ok(Event::CData(_)) if open.is_empty() => {
                return Err("CDATA outside the root element".to_string());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!("at byte {}: {err}", reader.error_position()));
            }
        }
    }

    if let Some(name) = open.last() {
        return Err(format!("unclosed element <{name}>"));
    }
    if roots == 0 {
        return Err("no <svg> element".to_string());
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(40) {
        Some((index, _)) => format!("{}…", &trimmed[..index]),
        None => trimmed.to_string(),
    }
}
