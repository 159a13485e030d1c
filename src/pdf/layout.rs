use crate::fonts::{FontBook, FontId};
use crate::theme::{Rgb, TextRole, ThemeConfig};

use super::cursor::FlowCursor;
use super::page::{DrawOp, LinkArea};

/// Result of measuring one string in one role.
#[derive(Clone, Debug, PartialEq)]
pub struct Measured {
    pub lines: Vec<String>,
    pub height: f32,
    pub line_height: f32,
    /// A single word was wider than the available width and got a line of
    /// its own, overflowing it.
    pub overflow: bool,
}

/// A styled span of text. Adjacent runs join without a space unless one side
/// carries whitespace at the boundary.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Run<'t> {
    pub(crate) text: &'t str,
    pub(crate) role: TextRole,
    pub(crate) color: Rgb,
    pub(crate) link: Option<&'t str>,
}

impl<'t> Run<'t> {
    pub(crate) fn new(text: &'t str, role: TextRole, color: Rgb) -> Self {
        Self {
            text,
            role,
            color,
            link: None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Chunk {
    run: usize,
    role: TextRole,
    font: FontId,
    size: f32,
    color: Rgb,
    text: String,
    x: f32,
    width: f32,
    link: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct TextLine {
    chunks: Vec<Chunk>,
    width: f32,
}

impl TextLine {
    fn text(&self) -> String {
        let mut out = String::new();
        let mut end = 0.0f32;
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i > 0 && chunk.x > end + 0.01 {
                out.push(' ');
            }
            out.push_str(&chunk.text);
            end = chunk.x + chunk.width;
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
    Right,
}

fn finish_line(chunks: &mut Vec<Chunk>) -> TextLine {
    let width = chunks.last().map(|c| c.x + c.width).unwrap_or(0.0);
    TextLine {
        chunks: std::mem::take(chunks),
        width,
    }
}

/// Word-wrapping over the faces resolved for one render. Pure: identical
/// input always yields identical lines.
#[derive(Clone, Copy)]
pub struct TextMetrics<'a> {
    fonts: &'a FontBook,
    theme: &'a ThemeConfig,
}

impl<'a> TextMetrics<'a> {
    pub fn new(fonts: &'a FontBook, theme: &'a ThemeConfig) -> Self {
        Self { fonts, theme }
    }

    pub fn measure(&self, text: &str, role: TextRole, max_width: f32) -> Measured {
        let color = self.theme.colors.text;
        let lines = self.build_lines(&[Run::new(text, role, color)], max_width);
        let line_height = self.line_height(role);
        let overflow = lines.iter().any(|l| l.width > max_width + 0.01);
        if overflow {
            log::debug!("unbreakable word wider than {max_width:.1}pt, placed on its own line");
        }
        Measured {
            height: lines.len() as f32 * line_height,
            lines: lines.iter().map(TextLine::text).collect(),
            line_height,
            overflow,
        }
    }

    pub fn line_height(&self, role: TextRole) -> f32 {
        self.theme.typography.role(role).line_height()
    }

    pub fn text_width(&self, text: &str, role: TextRole) -> f32 {
        let spec = self.theme.typography.role(role);
        self.fonts
            .text_width(self.fonts.font_for(role), text, spec.size_pt)
    }

    /// Line height for a set of runs: the tallest role among them.
    pub(crate) fn runs_line_height(&self, runs: &[Run]) -> f32 {
        runs.iter()
            .map(|r| self.line_height(r.role))
            .fold(0.0, f32::max)
    }

    /// Greedy wrap on whitespace. Newlines force a break. A word wider than
    /// `max_width` goes on its own line untruncated.
    pub(crate) fn build_lines(&self, runs: &[Run], max_width: f32) -> Vec<TextLine> {
        let mut lines: Vec<TextLine> = Vec::new();
        let mut current: Vec<Chunk> = Vec::new();
        let mut current_x = 0.0f32;
        let mut prev_ended_with_ws = false;
        let mut prev_space_w = 0.0f32;

        for (run_idx, run) in runs.iter().enumerate() {
            let spec = self.theme.typography.role(run.role);
            let font = self.fonts.font_for(run.role);
            let face = self.fonts.face(font);
            let size = spec.size_pt;
            let space_w = face.space_width(size);

            for (seg_idx, segment) in run.text.split('\n').enumerate() {
                if seg_idx > 0 {
                    lines.push(finish_line(&mut current));
                    current_x = 0.0;
                    prev_ended_with_ws = false;
                }
                let starts_with_ws = segment.starts_with(char::is_whitespace);

                for (i, word) in segment.split_whitespace().enumerate() {
                    let ww = face.text_width(word, size);
                    let need_space =
                        !current.is_empty() && (i > 0 || starts_with_ws || prev_ended_with_ws);
                    let gap = if !need_space {
                        0.0
                    } else if i > 0 || starts_with_ws {
                        space_w
                    } else {
                        prev_space_w
                    };

                    let proposed_x = current_x + gap;
                    if !current.is_empty() && proposed_x + ww > max_width {
                        lines.push(finish_line(&mut current));
                        current_x = 0.0;
                    } else {
                        current_x = proposed_x;
                    }

                    let same_run = current.last().is_some_and(|c| c.run == run_idx);
                    match current.last_mut() {
                        Some(chunk) if same_run => {
                            if current_x > chunk.x + chunk.width + 0.001 {
                                chunk.text.push(' ');
                            }
                            chunk.text.push_str(word);
                            chunk.width = current_x + ww - chunk.x;
                        }
                        _ => current.push(Chunk {
                            run: run_idx,
                            role: run.role,
                            font,
                            size,
                            color: run.color,
                            text: word.to_string(),
                            x: current_x,
                            width: ww,
                            link: run.link.map(str::to_string),
                        }),
                    }
                    current_x += ww;
                }

                prev_ended_with_ws = segment.ends_with(char::is_whitespace);
            }
            prev_space_w = space_w;
        }

        if !current.is_empty() {
            lines.push(finish_line(&mut current));
        }
        while lines.last().is_some_and(|l| l.chunks.is_empty()) {
            lines.pop();
        }
        let leading = lines.iter().take_while(|l| l.chunks.is_empty()).count();
        lines.drain(..leading);
        lines
    }

    /// Emit pre-built lines starting at `top`, one `line_height` apart.
    pub(crate) fn draw_lines(
        &self,
        cursor: &mut FlowCursor,
        lines: &[TextLine],
        x: f32,
        top: f32,
        width: f32,
        line_height: f32,
        align: Align,
    ) {
        for (i, line) in lines.iter().enumerate() {
            let line_top = top + i as f32 * line_height;
            let start_x = match align {
                Align::Left => x,
                Align::Center => x + (width - line.width) / 2.0,
                Align::Right => x + width - line.width,
            };
            for chunk in &line.chunks {
                let spec = self.theme.typography.role(chunk.role);
                let ascender = self.fonts.face(chunk.font).ascender_ratio;
                let baseline = line_top
                    + (line_height - spec.line_height()) / 2.0
                    + spec.line_gap_pt / 2.0
                    + chunk.size * ascender;
                let cx = start_x + chunk.x;
                cursor.draw(DrawOp::Text {
                    x: cx,
                    baseline,
                    font: chunk.font,
                    size: chunk.size,
                    color: chunk.color,
                    text: chunk.text.clone(),
                });
                if let Some(url) = &chunk.link {
                    let thick = (chunk.size * 0.05).max(0.5);
                    let ul_y = baseline + chunk.size * 0.12;
                    cursor.draw(DrawOp::Line {
                        x1: cx,
                        y1: ul_y,
                        x2: cx + chunk.width,
                        y2: ul_y,
                        width: thick,
                        color: chunk.color,
                    });
                    cursor.link(LinkArea {
                        x: cx,
                        y: line_top,
                        width: chunk.width,
                        height: line_height,
                        url: url.clone(),
                    });
                }
            }
        }
    }
}
