//! Markdown to document blocks.
//!
//! Only the subset the document prompts ask for is modelled: headings 1-3,
//! paragraphs with bold/italic runs, bullet and numbered lists, pipe tables.
//! Everything else degrades to plain paragraphs.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A span of text with uniform formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, runs: Vec<Run> },
    Paragraph(Vec<Run>),
    ListItem {
        /// `•` for bullets, `3.` for ordered items.
        marker: String,
        depth: usize,
        runs: Vec<Run>,
    },
    /// First row is the header; every cell is a list of runs.
    Table(Vec<Vec<Vec<Run>>>),
}

impl Block {
    /// Plain text of a run list.
    #[must_use]
    pub fn plain_text(runs: &[Run]) -> String {
        runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Default)]
struct InlineState {
    runs: Vec<Run>,
    bold: usize,
    italic: usize,
}

impl InlineState {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let bold = self.bold > 0;
        let italic = self.italic > 0;
        match self.runs.last_mut() {
            Some(last) if last.bold == bold && last.italic == italic => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_string(),
                bold,
                italic,
            }),
        }
    }

    fn take(&mut self) -> Vec<Run> {
        let mut runs = std::mem::take(&mut self.runs);
        if let Some(first) = runs.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = runs.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        runs.retain(|r| !r.text.is_empty());
        runs
    }
}

/// List nesting frame: next number for ordered lists, `None` for bullets.
struct ListFrame {
    next: Option<u64>,
}

enum Container {
    Heading(u8),
    Paragraph,
    Item { marker: String, depth: usize },
    Cell,
    CodeBlock,
}

/// Parse Markdown into blocks in document order.
#[must_use]
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES);

    let mut blocks = Vec::new();
    let mut inline = InlineState::default();
    let mut containers: Vec<Container> = Vec::new();
    let mut lists: Vec<ListFrame> = Vec::new();
    let mut table: Option<Vec<Vec<Vec<Run>>>> = None;
    let mut row: Vec<Vec<Run>> = Vec::new();

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                containers.push(Container::Heading(heading_level(level)));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(Container::Heading(level)) = containers.pop() {
                    let runs = inline.take();
                    if !runs.is_empty() {
                        blocks.push(Block::Heading { level, runs });
                    }
                }
            }
            Event::Start(Tag::Paragraph) => {
                // Paragraphs inside list items belong to the item.
                if !matches!(containers.last(), Some(Container::Item { .. })) {
                    containers.push(Container::Paragraph);
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if matches!(containers.last(), Some(Container::Paragraph)) {
                    containers.pop();
                    flush_paragraph(&mut inline, &mut blocks);
                }
            }
            Event::Start(Tag::List(start)) => {
                // A nested list ends the text of the enclosing item.
                flush_item(&containers, &mut inline, &mut blocks);
                lists.push(ListFrame { next: start });
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                let depth = lists.len().saturating_sub(1);
                let marker = match lists.last_mut() {
                    Some(ListFrame { next: Some(n) }) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                containers.push(Container::Item { marker, depth });
            }
            Event::End(TagEnd::Item) => {
                flush_item(&containers, &mut inline, &mut blocks);
                containers.pop();
            }
            Event::Start(Tag::Table(_)) => {
                table = Some(Vec::new());
            }
            Event::End(TagEnd::Table) => {
                if let Some(rows) = table.take()
                    && !rows.is_empty()
                {
                    blocks.push(Block::Table(rows));
                }
            }
            // The header row's cells sit directly under TableHead.
            Event::Start(Tag::TableHead | Tag::TableRow) => row.clear(),
            Event::End(TagEnd::TableHead | TagEnd::TableRow) => {
                if let Some(rows) = table.as_mut() {
                    rows.push(std::mem::take(&mut row));
                }
            }
            Event::Start(Tag::TableCell) => containers.push(Container::Cell),
            Event::End(TagEnd::TableCell) => {
                containers.pop();
                row.push(inline.take());
            }
            Event::Start(Tag::CodeBlock(_)) => containers.push(Container::CodeBlock),
            Event::End(TagEnd::CodeBlock) => {
                containers.pop();
                let text = Block::plain_text(&inline.take());
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    blocks.push(Block::Paragraph(vec![Run {
                        text: line.to_string(),
                        bold: false,
                        italic: false,
                    }]));
                }
            }
            Event::Start(Tag::Strong) => inline.bold += 1,
            Event::End(TagEnd::Strong) => inline.bold = inline.bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => inline.italic += 1,
            Event::End(TagEnd::Emphasis) => inline.italic = inline.italic.saturating_sub(1),
            Event::Text(text) | Event::Code(text) => inline.push_text(&text),
            Event::InlineHtml(html) | Event::Html(html) => inline.push_text(&html),
            Event::SoftBreak | Event::HardBreak => match containers.last() {
                // Each source line of a paragraph becomes its own paragraph.
                Some(Container::Paragraph) => flush_paragraph(&mut inline, &mut blocks),
                Some(Container::CodeBlock) => inline.push_text("\n"),
                _ => inline.push_text(" "),
            },
            _ => {}
        }
    }

    // Unterminated inline content (should not happen with a conforming parser).
    flush_paragraph(&mut inline, &mut blocks);
    blocks
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        _ => 3,
    }
}

fn flush_paragraph(inline: &mut InlineState, blocks: &mut Vec<Block>) {
    let runs = inline.take();
    if !runs.is_empty() {
        blocks.push(Block::Paragraph(runs));
    }
}

fn flush_item(containers: &[Container], inline: &mut InlineState, blocks: &mut Vec<Block>) {
    if let Some(Container::Item { marker, depth }) = containers.last() {
        let runs = inline.take();
        if !runs.is_empty() {
            blocks.push(Block::ListItem {
                marker: marker.clone(),
                depth: *depth,
                runs,
            });
        }
    }
}

/// Split off the first level-1 heading as the document title.
///
/// Returns the title text (if any) and the remaining blocks.
#[must_use]
pub fn split_title(mut blocks: Vec<Block>) -> (Option<String>, Vec<Block>) {
    let position = blocks
        .iter()
        .position(|b| matches!(b, Block::Heading { level: 1, .. }));
    match position {
        Some(index) => {
            let title = match blocks.remove(index) {
                Block::Heading { runs, .. } => Block::plain_text(&runs).trim().to_string(),
                _ => String::new(),
            };
            (Some(title).filter(|t| !t.is_empty()), blocks)
        }
        None => (None, blocks),
    }
}
