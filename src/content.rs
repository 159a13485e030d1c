//! Plain-text classification into a closed set of block kinds.
//!
//! Caller-supplied text (section overrides, line-item descriptions, terms)
//! carries only line-level markers. It is classified once here and the
//! renderers work on the resulting `TextBlock`s.

const BULLET_GLYPHS: [char; 5] = ['•', '-', '*', '◦', '▪'];
const SUB_HEADER_MAX_CHARS: usize = 60;
const INDENT_PER_LEVEL: usize = 2;
const MAX_BULLET_LEVEL: u8 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextBlock {
    Paragraph(String),
    Bullet { text: String, level: u8 },
    SubHeader(String),
}

pub fn parse_text_blocks(text: &str) -> Vec<TextBlock> {
    text.lines().filter_map(classify_line).collect()
}

fn classify_line(line: &str) -> Option<TextBlock> {
    let line = line.trim_end();
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }

    let indent: usize = line[..line.len() - trimmed.len()]
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();

    if let Some(rest) = strip_bullet(trimmed) {
        let level = (indent / INDENT_PER_LEVEL).min(MAX_BULLET_LEVEL as usize) as u8;
        return Some(TextBlock::Bullet {
            text: rest.to_string(),
            level,
        });
    }

    if trimmed.ends_with(':') && trimmed.chars().count() <= SUB_HEADER_MAX_CHARS {
        return Some(TextBlock::SubHeader(trimmed.to_string()));
    }

    Some(TextBlock::Paragraph(trimmed.to_string()))
}

fn strip_bullet(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !BULLET_GLYPHS.contains(&first) {
        return None;
    }
    let rest = chars.as_str();
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    (!rest.is_empty()).then_some(rest)
}
