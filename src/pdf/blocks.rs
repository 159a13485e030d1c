//! One renderer per block kind. Every renderer measures first, reserves its
//! height through the cursor, then draws into the reserved band.

use crate::assets::{AssetClass, AssetResolver, ImageId, MissingImagePolicy};
use crate::content::{TextBlock, parse_text_blocks};
use crate::error::Error;
use crate::model::{Hyperlink, ImageAsset, SignatureRecord};
use crate::theme::{Colors, Rgb, TextRole, ThemeConfig};

use super::cursor::FlowCursor;
use super::layout::{Align, Run, TextLine, TextMetrics};
use super::page::{DrawOp, PlacementKind};
use super::table::{self, Table, TotalLine};

const RULE_BAND: f32 = 10.0;
const BULLET_GLYPH: &str = "\u{2022}";

pub(crate) struct RenderContext<'a> {
    pub(crate) theme: &'a ThemeConfig,
    pub(crate) metrics: TextMetrics<'a>,
    pub(crate) assets: AssetResolver<'a>,
}

#[derive(Clone, Debug)]
pub(crate) struct BulletItem {
    pub(crate) text: String,
    pub(crate) level: u8,
    pub(crate) link: Option<Hyperlink>,
}

impl BulletItem {
    pub(crate) fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: 0,
            link: None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ImageSource<'d> {
    /// An asset in the renderer's store.
    Named(String),
    /// Bytes carried on the document itself, such as a signature image.
    Inline {
        key: &'static str,
        asset: Option<&'d ImageAsset>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct ImageBlock<'d> {
    pub(crate) source: ImageSource<'d>,
    pub(crate) class: AssetClass,
    pub(crate) max_width: Option<f32>,
    pub(crate) max_height: Option<f32>,
    pub(crate) align: Align,
}

#[derive(Clone, Debug)]
pub(crate) struct SignatureColumn<'d> {
    pub(crate) heading: String,
    pub(crate) key: &'static str,
    pub(crate) record: Option<&'d SignatureRecord>,
}

#[derive(Clone, Debug)]
pub(crate) enum Block<'d> {
    Heading(String),
    SubHeading(String),
    Paragraph {
        text: String,
        role: TextRole,
        align: Align,
    },
    Bullets(Vec<BulletItem>),
    KeyValue {
        key: String,
        value: String,
    },
    Image(ImageBlock<'d>),
    Rule,
    Spacer(f32),
    PageBreak,
    Table(Table),
    Totals(Vec<TotalLine>),
    Signatures([SignatureColumn<'d>; 2]),
}

impl Block<'_> {
    pub(crate) fn paragraph(text: impl Into<String>, role: TextRole) -> Self {
        Block::Paragraph {
            text: text.into(),
            role,
            align: Align::Left,
        }
    }

    pub(crate) fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Block::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Block::Heading(_) => "heading",
            Block::SubHeading(_) => "sub-heading",
            Block::Paragraph { .. } => "paragraph",
            Block::Bullets(_) => "bullet list",
            Block::KeyValue { .. } => "key-value pair",
            Block::Image(_) => "image",
            Block::Rule => "rule",
            Block::Spacer(_) => "spacer",
            Block::PageBreak => "page break",
            Block::Table(_) => "table",
            Block::Totals(_) => "totals",
            Block::Signatures(_) => "signature block",
        }
    }
}

/// Classified text as blocks: consecutive bullets become one list.
pub(crate) fn text_blocks(text: &str, role: TextRole) -> Vec<Block<'static>> {
    let mut blocks = Vec::new();
    for item in parse_text_blocks(text) {
        match item {
            TextBlock::Paragraph(text) => blocks.push(Block::paragraph(text, role)),
            TextBlock::SubHeader(text) => blocks.push(Block::SubHeading(text)),
            TextBlock::Bullet { text, level } => {
                let bullet = BulletItem {
                    text,
                    level,
                    link: None,
                };
                match blocks.last_mut() {
                    Some(Block::Bullets(items)) => items.push(bullet),
                    _ => blocks.push(Block::Bullets(vec![bullet])),
                }
            }
        }
    }
    blocks
}

pub(crate) fn role_color(colors: &Colors, role: TextRole) -> Rgb {
    match role {
        TextRole::PageTitle | TextRole::SectionHeading | TextRole::SubHeading => colors.heading,
        TextRole::Subtitle => colors.accent,
        TextRole::Caption | TextRole::Footer => colors.muted,
        TextRole::Link => colors.link,
        TextRole::TableHeader => colors.table_header_text,
        TextRole::Body | TextRole::Label | TextRole::Bullet | TextRole::TableBody => colors.text,
    }
}

/// `following` is the rest of the section; headings look into it to stay
/// with the content they introduce.
pub(crate) fn render_block(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    block: &Block,
    following: &[Block],
) -> Result<(), Error> {
    match block {
        Block::Heading(text) => {
            let s = &ctx.theme.spacing;
            let (before, after) = (s.before_section, s.after_heading);
            let extra = keep_next_extra(ctx, cursor, following);
            render_heading(ctx, cursor, text, TextRole::SectionHeading, before, after, extra)
        }
        Block::SubHeading(text) => {
            let s = &ctx.theme.spacing;
            let (before, after) = (s.between_paragraphs, s.after_sub_heading);
            let extra = keep_next_extra(ctx, cursor, following);
            render_heading(ctx, cursor, text, TextRole::SubHeading, before, after, extra)
        }
        Block::Paragraph { text, role, align } => render_paragraph(ctx, cursor, text, *role, *align),
        Block::Bullets(items) => render_bullets(ctx, cursor, items),
        Block::KeyValue { key, value } => render_key_value(ctx, cursor, key, value),
        Block::Image(image) => render_image(ctx, cursor, image),
        Block::Rule => {
            render_rule(ctx, cursor);
            Ok(())
        }
        Block::Spacer(dy) => {
            cursor.advance(*dy);
            Ok(())
        }
        Block::PageBreak => {
            if !cursor.at_page_top() {
                cursor.break_page();
            }
            Ok(())
        }
        Block::Table(t) => table::render_table(ctx, cursor, t),
        Block::Totals(lines) => table::render_totals(ctx, cursor, lines),
        Block::Signatures(columns) => render_signatures(ctx, cursor, columns),
    }
}

fn check_width(block: &'static str, width: f32) -> Result<(), Error> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(Error::SectionRender {
            block,
            reason: format!("no horizontal room ({width:.1}pt)"),
        })
    }
}

/// Lay out `text` in `role` at an absolute position; returns the height used.
/// The caller must already have reserved that height.
pub(crate) fn draw_text(
    ctx: &RenderContext,
    cursor: &mut FlowCursor,
    text: &str,
    role: TextRole,
    x: f32,
    top: f32,
    width: f32,
    align: Align,
) -> f32 {
    let color = role_color(&ctx.theme.colors, role);
    let lines = ctx.metrics.build_lines(&[Run::new(text, role, color)], width);
    let lh = ctx.metrics.line_height(role);
    ctx.metrics.draw_lines(cursor, &lines, x, top, width, lh, align);
    lines.len() as f32 * lh
}

/// Height that must fit below a heading so it is not left alone at the
/// bottom of a page. Runs of headings chain into the first content block.
fn keep_next_extra(ctx: &RenderContext, cursor: &FlowCursor, following: &[Block]) -> f32 {
    let s = &ctx.theme.spacing;
    let width = cursor.content_width();
    let mut extra = 0.0;
    for block in following {
        let (text, role, before, after) = match block {
            Block::Heading(text) => (text, TextRole::SectionHeading, s.before_section, s.after_heading),
            Block::SubHeading(text) => (text, TextRole::SubHeading, s.between_paragraphs, s.after_sub_heading),
            other => return extra + leading_height(ctx, cursor, other),
        };
        let measured = ctx.metrics.measure(text, role, width);
        if !measured.lines.is_empty() {
            extra += before + measured.height + after;
        }
    }
    extra
}

/// The part of `block` that moves with a heading: a whole paragraph (or its
/// first line when it is taller than a page), the first bullet, a key-value
/// row, or a table's header and first row.
fn leading_height(ctx: &RenderContext, cursor: &FlowCursor, block: &Block) -> f32 {
    let s = &ctx.theme.spacing;
    let width = cursor.content_width();
    match block {
        Block::Paragraph { text, role, .. } => {
            let m = ctx.metrics.measure(text, *role, width);
            if m.lines.is_empty() {
                0.0
            } else if m.height <= cursor.page_capacity() {
                s.between_paragraphs + m.height
            } else {
                s.between_paragraphs + m.line_height
            }
        }
        Block::Bullets(items) => items
            .iter()
            .find_map(|item| {
                let (lines, lh) = bullet_item_lines(ctx, item, bullet_text_width(ctx, cursor, item))?;
                Some(s.between_paragraphs + lines.len() as f32 * lh)
            })
            .unwrap_or(0.0),
        Block::KeyValue { key, value } => match key_value_height(ctx, cursor, key, value) {
            h if h > 0.0 => s.between_bullets + h,
            _ => 0.0,
        },
        Block::Table(t) => s.between_paragraphs + table::leading_height(ctx, t, width),
        _ => 0.0,
    }
}

/// The heading, the gap after it and `keep_with` of the next block move to
/// the next page together.
fn render_heading(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    text: &str,
    role: TextRole,
    before: f32,
    after: f32,
    keep_with: f32,
) -> Result<(), Error> {
    let width = cursor.content_width();
    let measured = ctx.metrics.measure(text, role, width);
    if measured.lines.is_empty() {
        return Ok(());
    }
    cursor.gap(before);
    cursor.ensure_room((measured.height + after + keep_with).min(cursor.page_capacity()));
    let kind = if role == TextRole::SectionHeading {
        PlacementKind::Heading
    } else {
        PlacementKind::SubHeading
    };
    let top = cursor.reserve(measured.height, kind);
    let left = cursor.left();
    draw_text(ctx, cursor, text, role, left, top, width, Align::Left);
    if role == TextRole::SectionHeading {
        let y = top + measured.height;
        cursor.draw(DrawOp::Line {
            x1: left,
            y1: y,
            x2: left + width,
            y2: y,
            width: ctx.theme.spacing.rule_thickness,
            color: ctx.theme.colors.accent,
        });
    }
    cursor.gap(after);
    Ok(())
}

/// Moves to a fresh page when the whole paragraph would fit there. A
/// paragraph taller than a page is split between lines.
fn render_paragraph(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    text: &str,
    role: TextRole,
    align: Align,
) -> Result<(), Error> {
    let width = cursor.content_width();
    check_width("paragraph", width)?;
    let color = role_color(&ctx.theme.colors, role);
    let lines = ctx.metrics.build_lines(&[Run::new(text, role, color)], width);
    if lines.is_empty() {
        return Ok(());
    }
    let lh = ctx.metrics.line_height(role);
    let total = lines.len() as f32 * lh;

    cursor.gap(ctx.theme.spacing.between_paragraphs);
    if !cursor.fits(total) && !cursor.at_page_top() && total <= cursor.page_capacity() {
        cursor.break_page();
    }

    let mut rest = &lines[..];
    while !rest.is_empty() {
        let room = ((cursor.safe_bottom() - cursor.y() + 0.01) / lh).floor() as usize;
        if room == 0 && !cursor.at_page_top() {
            cursor.break_page();
            continue;
        }
        let n = room.max(1).min(rest.len());
        let top = cursor.reserve(n as f32 * lh, PlacementKind::Paragraph);
        let left = cursor.left();
        ctx.metrics.draw_lines(cursor, &rest[..n], left, top, width, lh, align);
        rest = &rest[n..];
        if !rest.is_empty() {
            cursor.break_page();
        }
    }
    Ok(())
}

fn bullet_text_width(ctx: &RenderContext, cursor: &FlowCursor, item: &BulletItem) -> f32 {
    cursor.content_width() - ctx.theme.spacing.bullet_indent * (item.level as f32 + 1.0)
}

/// Wrapped lines and line height of one item; `None` when it has no text.
fn bullet_item_lines(ctx: &RenderContext, item: &BulletItem, width: f32) -> Option<(Vec<TextLine>, f32)> {
    let colors = &ctx.theme.colors;
    let text = match &item.link {
        Some(_) => format!("{} ", item.text.trim_end()),
        None => item.text.clone(),
    };
    let mut runs = vec![Run::new(&text, TextRole::Bullet, colors.text)];
    if let Some(link) = &item.link {
        runs.push(Run {
            link: Some(&link.url),
            ..Run::new(&link.label, TextRole::Link, colors.link)
        });
    }
    let lines = ctx.metrics.build_lines(&runs, width);
    if lines.is_empty() {
        None
    } else {
        Some((lines, ctx.metrics.runs_line_height(&runs)))
    }
}

/// Each item is reserved whole, so a break only ever falls between items.
fn render_bullets(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    items: &[BulletItem],
) -> Result<(), Error> {
    let s = &ctx.theme.spacing;
    let (indent, between) = (s.bullet_indent, s.between_bullets);
    let text_color = ctx.theme.colors.text;

    cursor.gap(s.between_paragraphs);
    for (i, item) in items.iter().enumerate() {
        let glyph_x = cursor.left() + indent * item.level as f32;
        let text_x = glyph_x + indent;
        let width = bullet_text_width(ctx, cursor, item);
        check_width("bullet list", width)?;

        let Some((lines, lh)) = bullet_item_lines(ctx, item, width) else {
            continue;
        };
        let height = lines.len() as f32 * lh;

        if i > 0 {
            cursor.gap(between);
        }
        let top = cursor.reserve(height, PlacementKind::BulletItem);
        let glyph = ctx
            .metrics
            .build_lines(&[Run::new(BULLET_GLYPH, TextRole::Bullet, text_color)], indent.max(1.0));
        ctx.metrics.draw_lines(cursor, &glyph, glyph_x, top, indent, lh, Align::Left);
        ctx.metrics.draw_lines(cursor, &lines, text_x, top, width, lh, Align::Left);
    }
    Ok(())
}

fn render_key_value(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    key: &str,
    value: &str,
) -> Result<(), Error> {
    let key_width = ctx.theme.spacing.key_column_width;
    let value_width = cursor.content_width() - key_width;
    check_width("key-value pair", value_width)?;

    let height = key_value_height(ctx, cursor, key, value);
    if height <= 0.0 {
        return Ok(());
    }

    cursor.gap(ctx.theme.spacing.between_bullets);
    let top = cursor.reserve(height, PlacementKind::KeyValue);
    let left = cursor.left();
    draw_text(ctx, cursor, key, TextRole::Label, left, top, key_width - 6.0, Align::Left);
    draw_text(ctx, cursor, value, TextRole::Body, left + key_width, top, value_width, Align::Left);
    Ok(())
}

fn key_value_height(ctx: &RenderContext, cursor: &FlowCursor, key: &str, value: &str) -> f32 {
    let key_width = ctx.theme.spacing.key_column_width;
    let value_width = cursor.content_width() - key_width;
    let key_h = ctx.metrics.measure(key, TextRole::Label, key_width - 6.0).height;
    let value_h = ctx.metrics.measure(value, TextRole::Body, value_width).height;
    key_h.max(value_h)
}

fn resolve_image(assets: &mut AssetResolver, source: &ImageSource) -> Result<ImageId, Error> {
    match source {
        ImageSource::Named(name) => assets.resolve_named(name),
        ImageSource::Inline {
            key,
            asset: Some(asset),
        } => assets.resolve_inline(key, asset),
        ImageSource::Inline { key, asset: None } => Err(Error::AssetMissing((*key).to_string())),
    }
}

fn render_image(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    image: &ImageBlock,
) -> Result<(), Error> {
    let id = match resolve_image(&mut ctx.assets, &image.source) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("Image unavailable ({:?}): {e}", image.class);
            return match image.class.on_missing() {
                MissingImagePolicy::Skip => Ok(()),
                MissingImagePolicy::Placeholder(text) => render_placeholder(ctx, cursor, text),
            };
        }
    };

    let aspect = ctx.assets.get(id).aspect_ratio();
    let limit_w = image
        .max_width
        .unwrap_or(f32::INFINITY)
        .min(cursor.content_width());
    let limit_h = image
        .max_height
        .unwrap_or(f32::INFINITY)
        .min(cursor.page_capacity());
    let (width, height) = fit_box(aspect, limit_w, limit_h);

    cursor.gap(ctx.theme.spacing.between_paragraphs);
    let top = cursor.reserve(height, PlacementKind::Image);
    let x = match image.align {
        Align::Left => cursor.left(),
        Align::Center => cursor.left() + (cursor.content_width() - width) / 2.0,
        Align::Right => cursor.left() + cursor.content_width() - width,
    };
    cursor.draw(DrawOp::Image {
        x,
        y: top,
        width,
        height,
        image: id,
    });
    Ok(())
}

/// Largest box with the given height/width ratio inside `max_w` x `max_h`.
fn fit_box(aspect: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    let mut width = max_w;
    let mut height = width * aspect;
    if height > max_h {
        height = max_h;
        width = height / aspect;
    }
    (width, height)
}

fn render_placeholder(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    text: &str,
) -> Result<(), Error> {
    let width = cursor.content_width();
    let measured = ctx.metrics.measure(text, TextRole::Caption, width);
    cursor.gap(ctx.theme.spacing.between_paragraphs);
    let top = cursor.reserve(measured.height, PlacementKind::Placeholder);
    let left = cursor.left();
    draw_text(ctx, cursor, text, TextRole::Caption, left, top, width, Align::Left);
    Ok(())
}

fn render_rule(ctx: &RenderContext, cursor: &mut FlowCursor) {
    let top = cursor.reserve(RULE_BAND, PlacementKind::Rule);
    let (left, width) = (cursor.left(), cursor.content_width());
    let y = top + RULE_BAND / 2.0;
    cursor.draw(DrawOp::Line {
        x1: left,
        y1: y,
        x2: left + width,
        y2: y,
        width: ctx.theme.spacing.rule_thickness,
        color: ctx.theme.colors.rule,
    });
}

fn signature_lines(record: Option<&SignatureRecord>) -> Vec<(String, TextRole)> {
    let Some(record) = record else {
        return vec![
            ("Name:".to_string(), TextRole::Body),
            ("Date:".to_string(), TextRole::Caption),
        ];
    };
    let mut lines = vec![(record.signer_name.clone(), TextRole::Body)];
    if let Some(title) = &record.signer_title {
        lines.push((title.clone(), TextRole::Caption));
    }
    if !record.signer_email.is_empty() {
        lines.push((record.signer_email.clone(), TextRole::Caption));
    }
    let date = match record.signed_at_utc {
        Some(at) => format!("Signed {}", at.format("%B %-d, %Y %H:%M UTC")),
        None => "Date:".to_string(),
    };
    lines.push((date, TextRole::Caption));
    lines
}

/// Two signature columns side by side, reserved as one unit.
fn render_signatures(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    columns: &[SignatureColumn; 2],
) -> Result<(), Error> {
    let s = &ctx.theme.spacing;
    let (gap, box_h) = (s.column_gap, s.signature_height);
    let col_w = (cursor.content_width() - gap) / 2.0;
    check_width("signature block", col_w)?;

    let heading_h = ctx.metrics.line_height(TextRole::Label);
    let column_height = |col: &SignatureColumn| {
        let below: f32 = signature_lines(col.record)
            .iter()
            .map(|(text, role)| ctx.metrics.measure(text, *role, col_w).height)
            .sum();
        heading_h + box_h + 4.0 + below
    };
    let height = column_height(&columns[0]).max(column_height(&columns[1]));

    cursor.gap(ctx.theme.spacing.between_paragraphs * 2.0);
    let top = cursor.reserve(height, PlacementKind::Signature);
    for (i, col) in columns.iter().enumerate() {
        let x = cursor.left() + i as f32 * (col_w + gap);
        draw_signature_column(ctx, cursor, col, x, top, col_w);
    }
    Ok(())
}

fn draw_signature_column(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    col: &SignatureColumn,
    x: f32,
    top: f32,
    width: f32,
) {
    let box_h = ctx.theme.spacing.signature_height;
    let mut y = top + draw_text(ctx, cursor, &col.heading, TextRole::Label, x, top, width, Align::Left);

    if let Some(record) = col.record {
        let source = ImageSource::Inline {
            key: col.key,
            asset: record.image.as_ref(),
        };
        let wants_image = record.image.is_some() || record.is_signed();
        match resolve_image(&mut ctx.assets, &source) {
            Ok(id) => {
                let aspect = ctx.assets.get(id).aspect_ratio();
                let (w, h) = fit_box(aspect, width, box_h);
                cursor.draw(DrawOp::Image {
                    x,
                    y: y + box_h - h,
                    width: w,
                    height: h,
                    image: id,
                });
            }
            Err(e) if wants_image => {
                log::warn!("Signature image for {} unusable: {e}", col.key);
                if let MissingImagePolicy::Placeholder(text) = AssetClass::Signature.on_missing() {
                    let lh = ctx.metrics.line_height(TextRole::Caption);
                    draw_text(ctx, cursor, text, TextRole::Caption, x, y + box_h - lh - 2.0, width, Align::Left);
                }
            }
            Err(_) => {}
        }
    }

    y += box_h;
    cursor.draw(DrawOp::Line {
        x1: x,
        y1: y,
        x2: x + width,
        y2: y,
        width: ctx.theme.spacing.rule_thickness,
        color: ctx.theme.colors.text,
    });
    y += 4.0;
    for (text, role) in signature_lines(col.record) {
        y += draw_text(ctx, cursor, &text, role, x, y, width, Align::Left);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::fonts::{FontBook, FontLibrary};
    use crate::pdf::page::Layout;
    use crate::pdf::table::{Cell, ColumnSpec, ColumnWidth};

    fn run_blocks(theme: &ThemeConfig, store: &AssetStore, blocks: &[Block]) -> Layout {
        let fonts = FontBook::new(theme, &FontLibrary::new());
        let mut ctx = RenderContext {
            theme,
            metrics: TextMetrics::new(&fonts, theme),
            assets: AssetResolver::new(store),
        };
        let mut cursor = FlowCursor::new(theme);
        cursor.start_page();
        for (i, block) in blocks.iter().enumerate() {
            render_block(&mut ctx, &mut cursor, block, &blocks[i + 1..]).unwrap();
        }
        cursor.finish()
    }

    #[test]
    fn text_blocks_group_consecutive_bullets() {
        let blocks = text_blocks("Intro\n• one\n  - two\nScope:\nTail", TextRole::Body);
        assert_eq!(blocks.len(), 4);
        match &blocks[1] {
            Block::Bullets(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].level, 1);
            }
            other => panic!("expected bullets, got {}", other.name()),
        }
        assert!(matches!(&blocks[2], Block::SubHeading(t) if t == "Scope:"));
    }

    #[test]
    fn heading_is_not_orphaned_at_page_bottom() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let capacity = theme.page.safe_bottom(theme.spacing.footer_reserve) - theme.page.margin_top;
        let body_lh = theme.typography.body.line_height();
        let filler_lines = ((capacity - 20.0) / body_lh).floor() as usize;
        let filler = vec!["filler"; filler_lines].join("\n");
        let layout = run_blocks(
            &theme,
            &store,
            &[
                Block::paragraph(filler, TextRole::Body),
                Block::Heading("Scope of Work".into()),
            ],
        );
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.pages_containing("Scope of Work"), vec![1]);
    }

    /// A paragraph of filler that leaves `room` points (give or take a line)
    /// at the bottom of the first page.
    fn filler_leaving(theme: &ThemeConfig, room: f32) -> Block {
        let capacity = theme.page.safe_bottom(theme.spacing.footer_reserve) - theme.page.margin_top;
        let lines = ((capacity - room) / theme.typography.body.line_height()).floor() as usize;
        Block::paragraph(vec!["filler"; lines].join("\n"), TextRole::Body)
    }

    #[test]
    fn sub_heading_moves_with_the_paragraph_it_introduces() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let paragraph = "first line\nsecond line\nthird line\nfourth line\nfifth line";
        let layout = run_blocks(
            &theme,
            &store,
            &[
                filler_leaving(&theme, 40.0),
                Block::SubHeading("Overview".into()),
                Block::paragraph(paragraph, TextRole::Body),
            ],
        );
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.pages_containing("Overview"), vec![1]);
        assert_eq!(layout.pages_containing("first line"), vec![1]);
        assert_eq!(layout.pages_containing("fifth line"), vec![1]);
    }

    #[test]
    fn sub_heading_moves_with_a_table_header() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let row = vec![Cell::Text("Deposit".into()), Cell::Text("$500.00".into())];
        let table = Table {
            columns: vec![
                ColumnSpec::new("Milestone", ColumnWidth::Flex, Align::Left),
                ColumnSpec::new("Amount", ColumnWidth::Fixed(100.0), Align::Right),
            ],
            rows: vec![row; 3],
        };
        let layout = run_blocks(
            &theme,
            &store,
            &[
                filler_leaving(&theme, 40.0),
                Block::SubHeading("Payment Schedule".into()),
                Block::Table(table),
            ],
        );
        let header_pages: Vec<usize> = layout
            .pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.placements.iter().any(|pl| pl.kind == PlacementKind::TableHeader))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(header_pages, vec![1]);
        assert_eq!(layout.pages_containing("Payment Schedule"), vec![1]);
        assert_eq!(layout.pages_containing("Milestone"), vec![1]);
    }

    #[test]
    fn stacked_headings_keep_with_the_first_content() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let layout = run_blocks(
            &theme,
            &store,
            &[
                filler_leaving(&theme, 70.0),
                Block::Heading("Scope of Work".into()),
                Block::SubHeading("Phase One".into()),
                Block::paragraph("one\ntwo\nthree\nfour", TextRole::Body),
            ],
        );
        assert_eq!(layout.pages_containing("Scope of Work"), vec![1]);
        assert_eq!(layout.pages_containing("Phase One"), vec![1]);
        assert_eq!(layout.pages_containing("four"), vec![1]);
    }

    #[test]
    fn bullet_items_are_never_split() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let long = "word ".repeat(60);
        let items: Vec<BulletItem> = (0..40).map(|_| BulletItem::plain(long.clone())).collect();
        let layout = run_blocks(&theme, &store, &[Block::Bullets(items)]);
        assert!(layout.page_count() >= 2);
        let mut count = 0;
        for page in &layout.pages {
            for p in &page.placements {
                if p.kind == PlacementKind::BulletItem {
                    count += 1;
                    assert!(p.bottom() <= page.safe_bottom + 0.01);
                }
            }
        }
        assert_eq!(count, 40);
    }

    #[test]
    fn long_paragraph_splits_between_lines_within_bounds() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let text = vec!["line"; 200].join("\n");
        let layout = run_blocks(&theme, &store, &[Block::paragraph(text, TextRole::Body)]);
        assert!(layout.page_count() >= 3);
        for page in &layout.pages {
            for p in &page.placements {
                assert!(p.bottom() <= page.safe_bottom + 0.01);
            }
        }
    }

    #[test]
    fn missing_decorative_image_is_skipped() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let layout = run_blocks(
            &theme,
            &store,
            &[Block::Image(ImageBlock {
                source: ImageSource::Named("team-photo".into()),
                class: AssetClass::Decorative,
                max_width: None,
                max_height: None,
                align: Align::Center,
            })],
        );
        assert!(layout.pages[0].ops.is_empty());
        assert!(layout.pages[0].placements.is_empty());
    }

    #[test]
    fn malformed_signature_shows_placeholder() {
        let theme = ThemeConfig::classic();
        let store = AssetStore::new();
        let record = SignatureRecord {
            image: Some(ImageAsset {
                data: b"not an image".to_vec(),
                pixel_width: 10,
                pixel_height: 10,
            }),
            signer_name: "Dana Client".into(),
            ..SignatureRecord::default()
        };
        let layout = run_blocks(
            &theme,
            &store,
            &[Block::Signatures([
                SignatureColumn {
                    heading: "Client".into(),
                    key: "client",
                    record: Some(&record),
                },
                SignatureColumn {
                    heading: "Sender".into(),
                    key: "sender",
                    record: None,
                },
            ])],
        );
        let page = &layout.pages[0];
        assert!(page.contains_text("[Signature on file]"));
        assert!(page.contains_text("Dana Client"));
        assert_eq!(page.image_count(), 0);
    }

    #[test]
    fn no_horizontal_room_is_a_block_error() {
        let mut theme = ThemeConfig::classic();
        theme.spacing.bullet_indent = 1000.0;
        let store = AssetStore::new();
        let fonts = FontBook::new(&theme, &FontLibrary::new());
        let mut ctx = RenderContext {
            theme: &theme,
            metrics: TextMetrics::new(&fonts, &theme),
            assets: AssetResolver::new(&store),
        };
        let mut cursor = FlowCursor::new(&theme);
        cursor.start_page();
        let result = render_block(&mut ctx, &mut cursor, &Block::Bullets(vec![BulletItem::plain("x")]), &[]);
        assert!(matches!(result, Err(Error::SectionRender { .. })));
    }
}
