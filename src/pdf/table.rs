use crate::content::TextBlock;
use crate::error::Error;
use crate::theme::TextRole;

use super::blocks::{RenderContext, draw_text, role_color};
use super::cursor::FlowCursor;
use super::layout::{Align, Run, TextLine};
use super::page::{DrawOp, PlacementKind};

const TOTALS_VALUE_WIDTH: f32 = 110.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ColumnWidth {
    Fixed(f32),
    /// Shares whatever the fixed columns leave.
    Flex,
}

#[derive(Clone, Debug)]
pub(crate) struct ColumnSpec {
    pub(crate) header: String,
    pub(crate) width: ColumnWidth,
    pub(crate) align: Align,
}

impl ColumnSpec {
    pub(crate) fn new(header: &str, width: ColumnWidth, align: Align) -> Self {
        Self {
            header: header.to_string(),
            width,
            align,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Cell {
    Text(String),
    /// Bold item name over a classified description.
    Item {
        name: String,
        description: Vec<TextBlock>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Table {
    pub(crate) columns: Vec<ColumnSpec>,
    pub(crate) rows: Vec<Vec<Cell>>,
}

#[derive(Clone, Debug)]
pub(crate) struct TotalLine {
    pub(crate) label: String,
    pub(crate) value: String,
    pub(crate) emphasis: bool,
}

pub(crate) fn compute_column_widths(
    columns: &[ColumnSpec],
    content_width: f32,
) -> Result<Vec<f32>, Error> {
    let fixed: f32 = columns
        .iter()
        .filter_map(|c| match c.width {
            ColumnWidth::Fixed(w) => Some(w),
            ColumnWidth::Flex => None,
        })
        .sum();
    let flex_count = columns
        .iter()
        .filter(|c| c.width == ColumnWidth::Flex)
        .count();
    let remaining = content_width - fixed;
    if remaining < 0.0 || (flex_count > 0 && remaining < 1.0) {
        return Err(Error::SectionRender {
            block: "table",
            reason: format!("fixed columns need {fixed:.1}pt of {content_width:.1}pt"),
        });
    }
    let share = if flex_count > 0 {
        remaining / flex_count as f32
    } else {
        0.0
    };
    Ok(columns
        .iter()
        .map(|c| match c.width {
            ColumnWidth::Fixed(w) => w,
            ColumnWidth::Flex => share,
        })
        .collect())
}

/// A block of pre-wrapped lines at an offset inside a cell's padding box.
struct Piece {
    dx: f32,
    dy: f32,
    width: f32,
    lines: Vec<TextLine>,
    line_height: f32,
    align: Align,
}

#[derive(Default)]
struct CellLayout {
    pieces: Vec<Piece>,
    height: f32,
}

struct RowLayout {
    height: f32,
    name_height: f32,
    description_height: f32,
    cells: Vec<CellLayout>,
}

fn text_piece(
    ctx: &RenderContext,
    text: &str,
    role: TextRole,
    dx: f32,
    dy: f32,
    width: f32,
    align: Align,
) -> Piece {
    let color = role_color(&ctx.theme.colors, role);
    let lines = ctx.metrics.build_lines(&[Run::new(text, role, color)], width);
    Piece {
        dx,
        dy,
        width,
        lines,
        line_height: ctx.metrics.line_height(role),
        align,
    }
}

impl Piece {
    fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Item name plus description; returns the layout and the two heights.
fn layout_item_cell(
    ctx: &RenderContext,
    name: &str,
    description: &[TextBlock],
    width: f32,
) -> (CellLayout, f32, f32) {
    let indent = ctx.theme.spacing.bullet_indent;
    let mut pieces = Vec::new();

    let name_piece = text_piece(ctx, name, TextRole::Label, 0.0, 0.0, width, Align::Left);
    let name_height = name_piece.height();
    pieces.push(name_piece);

    let mut y = name_height;
    for block in description {
        match block {
            TextBlock::Paragraph(text) => {
                let piece = text_piece(ctx, text, TextRole::TableBody, 0.0, y, width, Align::Left);
                y += piece.height();
                pieces.push(piece);
            }
            TextBlock::SubHeader(text) => {
                let piece = text_piece(ctx, text, TextRole::Label, 0.0, y, width, Align::Left);
                y += piece.height();
                pieces.push(piece);
            }
            TextBlock::Bullet { text, level } => {
                let glyph_dx = indent * *level as f32;
                let text_dx = glyph_dx + indent;
                let text_w = (width - text_dx).max(1.0);
                let piece = text_piece(ctx, text, TextRole::TableBody, text_dx, y, text_w, Align::Left);
                if !piece.lines.is_empty() {
                    pieces.push(text_piece(
                        ctx,
                        "\u{2022}",
                        TextRole::TableBody,
                        glyph_dx,
                        y,
                        indent,
                        Align::Left,
                    ));
                }
                y += piece.height();
                pieces.push(piece);
            }
        }
    }
    let description_height = y - name_height;
    (
        CellLayout {
            pieces,
            height: y,
        },
        name_height,
        description_height,
    )
}

fn compute_row_layouts(
    ctx: &RenderContext,
    columns: &[ColumnSpec],
    rows: &[Vec<Cell>],
    col_widths: &[f32],
) -> Vec<RowLayout> {
    let pad = ctx.theme.spacing.table_cell_padding;
    let min_row_height = ctx.theme.spacing.min_row_height;
    rows.iter()
        .map(|row| {
            let mut name_height = 0.0f32;
            let mut description_height = 0.0f32;
            let mut max_h = 0.0f32;
            let cells: Vec<CellLayout> = row
                .iter()
                .zip(col_widths.iter().zip(columns))
                .map(|(cell, (&col_w, column))| {
                    let text_w = (col_w - 2.0 * pad).max(1.0);
                    let layout = match cell {
                        Cell::Text(text) => {
                            let piece = text_piece(ctx, text, TextRole::TableBody, 0.0, 0.0, text_w, column.align);
                            CellLayout {
                                height: piece.height(),
                                pieces: vec![piece],
                            }
                        }
                        Cell::Item { name, description } => {
                            let (layout, name_h, desc_h) =
                                layout_item_cell(ctx, name, description, text_w);
                            name_height = name_h;
                            description_height = desc_h;
                            layout
                        }
                    };
                    max_h = max_h.max(layout.height);
                    layout
                })
                .collect();

            RowLayout {
                height: min_row_height.max(max_h + 2.0 * pad),
                name_height,
                description_height,
                cells,
            }
        })
        .collect()
}

fn draw_cells(
    ctx: &RenderContext,
    cursor: &mut FlowCursor,
    cells: &[CellLayout],
    col_widths: &[f32],
    top: f32,
) {
    let pad = ctx.theme.spacing.table_cell_padding;
    let mut cell_x = cursor.left();
    for (cell, &col_w) in cells.iter().zip(col_widths) {
        for piece in &cell.pieces {
            ctx.metrics.draw_lines(
                cursor,
                &piece.lines,
                cell_x + pad + piece.dx,
                top + pad + piece.dy,
                piece.width,
                piece.line_height,
                piece.align,
            );
        }
        cell_x += col_w;
    }
}

fn header_cells(ctx: &RenderContext, columns: &[ColumnSpec], col_widths: &[f32]) -> Vec<CellLayout> {
    let pad = ctx.theme.spacing.table_cell_padding;
    columns
        .iter()
        .zip(col_widths)
        .map(|(column, &col_w)| {
            let piece = text_piece(
                ctx,
                &column.header,
                TextRole::TableHeader,
                0.0,
                0.0,
                (col_w - 2.0 * pad).max(1.0),
                column.align,
            );
            CellLayout {
                height: piece.height(),
                pieces: vec![piece],
            }
        })
        .collect()
}

fn header_height(ctx: &RenderContext, cells: &[CellLayout]) -> f32 {
    cells.iter().map(|c| c.height).fold(0.0, f32::max) + 2.0 * ctx.theme.spacing.table_cell_padding
}

/// Height of the header and first row, the part a table keeps together.
/// Zero when the columns cannot be laid out at `content_width`.
pub(crate) fn leading_height(ctx: &RenderContext, table: &Table, content_width: f32) -> f32 {
    let Ok(col_widths) = compute_column_widths(&table.columns, content_width) else {
        return 0.0;
    };
    let header = header_cells(ctx, &table.columns, &col_widths);
    let first = &table.rows[..table.rows.len().min(1)];
    let first_row_h = compute_row_layouts(ctx, &table.columns, first, &col_widths)
        .first()
        .map_or(0.0, |r| r.height);
    header_height(ctx, &header) + first_row_h
}

/// Header is kept with the first row and is not repeated after a page
/// break. Zebra striping follows the row index across pages.
pub(crate) fn render_table(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    table: &Table,
) -> Result<(), Error> {
    let col_widths = compute_column_widths(&table.columns, cursor.content_width())?;
    let row_layouts = compute_row_layouts(ctx, &table.columns, &table.rows, &col_widths);
    let pad = ctx.theme.spacing.table_cell_padding;
    let colors = &ctx.theme.colors;
    let min_row_height = ctx.theme.spacing.min_row_height;

    let header_cells = header_cells(ctx, &table.columns, &col_widths);
    let header_h = header_height(ctx, &header_cells);
    let first_row_h = row_layouts.first().map_or(0.0, |r| r.height);

    cursor.gap(ctx.theme.spacing.between_paragraphs);
    cursor.ensure_room(header_h + first_row_h);
    let top = cursor.reserve(header_h, PlacementKind::TableHeader);
    let table_w: f32 = col_widths.iter().sum();
    let left = cursor.left();
    cursor.draw(DrawOp::Rect {
        x: left,
        y: top,
        width: table_w,
        height: header_h,
        fill: colors.table_header_fill,
    });
    draw_cells(ctx, cursor, &header_cells, &col_widths, top);

    for (index, row) in row_layouts.iter().enumerate() {
        log::debug!(
            "TABLE row={} row_h={:.2} name_h={:.2} desc_h={:.2} y={:.2}",
            index,
            row.height,
            row.name_height,
            row.description_height,
            cursor.y()
        );
        let top = cursor.reserve(
            row.height,
            PlacementKind::TableRow {
                index,
                min_height: min_row_height,
                name_height: row.name_height,
                description_height: row.description_height,
                padding: 2.0 * pad,
            },
        );
        if index % 2 == 1 {
            cursor.draw(DrawOp::Rect {
                x: left,
                y: top,
                width: table_w,
                height: row.height,
                fill: colors.zebra_fill,
            });
        }
        draw_cells(ctx, cursor, &row.cells, &col_widths, top);
        let bottom = top + row.height;
        cursor.draw(DrawOp::Line {
            x1: left,
            y1: bottom,
            x2: left + table_w,
            y2: bottom,
            width: ctx.theme.spacing.rule_thickness * 0.5,
            color: colors.rule,
        });
    }
    Ok(())
}

/// Subtotal through total, reserved as one block straight after the table.
pub(crate) fn render_totals(
    ctx: &mut RenderContext,
    cursor: &mut FlowCursor,
    lines: &[TotalLine],
) -> Result<(), Error> {
    if lines.is_empty() {
        return Ok(());
    }
    let pad = ctx.theme.spacing.table_cell_padding;
    let label_w = cursor.content_width() - TOTALS_VALUE_WIDTH - 2.0 * pad;
    if label_w <= 0.0 {
        return Err(Error::SectionRender {
            block: "totals",
            reason: format!("no room for labels ({label_w:.1}pt)"),
        });
    }
    let role_of = |line: &TotalLine| {
        if line.emphasis {
            TextRole::Label
        } else {
            TextRole::TableBody
        }
    };
    let height: f32 = lines
        .iter()
        .map(|l| ctx.metrics.line_height(role_of(l)))
        .sum::<f32>()
        + 2.0 * pad;

    let top = cursor.reserve(height, PlacementKind::Totals);
    let left = cursor.left();
    let value_x = left + label_w + pad;
    let mut y = top + pad;
    for line in lines {
        let role = role_of(line);
        if line.emphasis {
            cursor.draw(DrawOp::Line {
                x1: value_x,
                y1: y,
                x2: value_x + TOTALS_VALUE_WIDTH,
                y2: y,
                width: ctx.theme.spacing.rule_thickness,
                color: ctx.theme.colors.text,
            });
        }
        draw_text(ctx, cursor, &line.label, role, left, y, label_w, Align::Right);
        draw_text(ctx, cursor, &line.value, role, value_x, y, TOTALS_VALUE_WIDTH, Align::Right);
        y += ctx.metrics.line_height(role);
    }
    Ok(())
}
