use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::assets::{ImageData, ImageId, JpegColor, ResolvedImage};
use crate::fonts::{EmbeddedFont, FontBook, FontId, embed_face, encode_as_gids, to_winansi_bytes};
use crate::theme::{Rgb, TextRole, ThemeConfig};

use super::blocks::role_color;
use super::page::{DrawOp, LaidOutPage, Layout};

const FOOTER_RULE_GAP: f32 = 4.0;

/// Entries for the document information dictionary.
pub(crate) struct DocumentInfo<'a> {
    pub(crate) title: &'a str,
    pub(crate) author: &'a str,
    pub(crate) subject: String,
    pub(crate) date: NaiveDate,
}

struct FooterText {
    left: String,
    right: String,
}

fn rgb(color: Rgb) -> (f32, f32, f32) {
    (
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
    )
}

fn footer_texts(layout: &Layout) -> Vec<Option<FooterText>> {
    let total = layout.page_count();
    layout
        .pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            page.footer.as_ref().map(|left| FooterText {
                left: left.clone(),
                right: format!("Page {} of {}", i + 1, total),
            })
        })
        .collect()
}

fn embed_image(pdf: &mut Pdf, image: &ResolvedImage, xobj_ref: Ref, alloc: &mut impl FnMut() -> Ref) {
    let (w, h) = (image.pixel_width as i32, image.pixel_height as i32);
    match &image.data {
        ImageData::Jpeg { data, color } => {
            let mut xobj = pdf.image_xobject(xobj_ref, data);
            xobj.filter(Filter::DctDecode);
            xobj.width(w);
            xobj.height(h);
            match color {
                JpegColor::Gray => xobj.color_space().device_gray(),
                JpegColor::Rgb => xobj.color_space().device_rgb(),
                JpegColor::Cmyk => xobj.color_space().device_cmyk(),
            }
            xobj.bits_per_component(8);
        }
        ImageData::Raw { rgb, alpha } => {
            let smask_ref = alpha.as_ref().map(|alpha| {
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(alpha, 6);
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w);
                mask.height(h);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                mask_ref
            });

            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(rgb, 6);
            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
}

fn font_name(id: FontId) -> String {
    format!("F{}", id.0)
}

fn image_name(id: ImageId) -> String {
    format!("Im{}", id.0)
}

fn show_text(
    content: &mut Content,
    embedded: &BTreeMap<FontId, EmbeddedFont>,
    font: FontId,
    size: f32,
    color: Rgb,
    x: f32,
    y: f32,
    text: &str,
) {
    let bytes = match embedded.get(&font).and_then(|e| e.char_to_gid.as_ref()) {
        Some(gids) => encode_as_gids(text, gids),
        None => to_winansi_bytes(text),
    };
    let (r, g, b) = rgb(color);
    content.begin_text();
    content.set_fill_rgb(r, g, b);
    content.set_font(Name(font_name(font).as_bytes()), size);
    content.next_line(x, y);
    content.show(Str(&bytes));
    content.end_text();
}

fn page_content(
    page: &LaidOutPage,
    page_height: f32,
    embedded: &BTreeMap<FontId, EmbeddedFont>,
) -> Content {
    let mut content = Content::new();
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                baseline,
                font,
                size,
                color,
                text,
            } => show_text(
                &mut content,
                embedded,
                *font,
                *size,
                *color,
                *x,
                page_height - baseline,
                text,
            ),
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                let (r, g, b) = rgb(*fill);
                content.save_state();
                content.set_fill_rgb(r, g, b);
                content.rect(*x, page_height - y - height, *width, *height);
                content.fill_nonzero();
                content.restore_state();
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
            } => {
                let (r, g, b) = rgb(*color);
                content.save_state();
                content.set_stroke_rgb(r, g, b);
                content.set_line_width(*width);
                content.move_to(*x1, page_height - y1);
                content.line_to(*x2, page_height - y2);
                content.stroke();
                content.restore_state();
            }
            DrawOp::Image {
                x,
                y,
                width,
                height,
                image,
            } => {
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, page_height - y - height]);
                content.x_object(Name(image_name(*image).as_bytes()));
                content.restore_state();
            }
        }
    }
    content
}

fn draw_footer(
    content: &mut Content,
    footer: &FooterText,
    page: &LaidOutPage,
    layout: &Layout,
    theme: &ThemeConfig,
    fonts: &FontBook,
    embedded: &BTreeMap<FontId, EmbeddedFont>,
) {
    let spec = theme.typography.role(TextRole::Footer);
    let font = fonts.font_for(TextRole::Footer);
    let color = role_color(&theme.colors, TextRole::Footer);
    let left = theme.page.margin_left;
    let right = layout.page_width - theme.page.margin_right;
    let rule_y = page.safe_bottom + theme.spacing.footer_reserve;

    let (r, g, b) = rgb(theme.colors.rule);
    content.save_state();
    content.set_stroke_rgb(r, g, b);
    content.set_line_width(theme.spacing.rule_thickness * 0.5);
    content.move_to(left, layout.page_height - rule_y);
    content.line_to(right, layout.page_height - rule_y);
    content.stroke();
    content.restore_state();

    let ascender = fonts.face(font).ascender_ratio;
    let baseline = rule_y + FOOTER_RULE_GAP + spec.size_pt * ascender;
    let y = layout.page_height - baseline;
    show_text(content, embedded, font, spec.size_pt, color, left, y, &footer.left);
    let right_w = fonts.text_width(font, &footer.right, spec.size_pt);
    show_text(content, embedded, font, spec.size_pt, color, right - right_w, y, &footer.right);
}

/// Serialize a finished layout. Object numbering follows layout order, so
/// identical layouts produce identical bytes.
pub(crate) fn write_pdf(
    layout: &Layout,
    fonts: &FontBook,
    images: &[ResolvedImage],
    theme: &ThemeConfig,
    info: &DocumentInfo,
) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    let footers = footer_texts(layout);
    let footer_font = fonts.font_for(TextRole::Footer);

    // Phase 1: characters used per face, so library fonts are subset once
    let mut used_chars: BTreeMap<FontId, BTreeSet<char>> = BTreeMap::new();
    for page in &layout.pages {
        for op in &page.ops {
            if let DrawOp::Text { font, text, .. } = op {
                used_chars.entry(*font).or_default().extend(text.chars());
            }
        }
    }
    for footer in footers.iter().flatten() {
        let chars = used_chars.entry(footer_font).or_default();
        chars.extend(footer.left.chars());
        chars.extend(footer.right.chars());
    }

    let mut embedded: BTreeMap<FontId, EmbeddedFont> = BTreeMap::new();
    for (&id, chars) in &used_chars {
        embedded.insert(id, embed_face(&mut pdf, fonts.face(id), chars, &mut alloc));
    }

    // Phase 2: images referenced by the layout, each written once
    let used_images: BTreeSet<ImageId> = layout
        .pages
        .iter()
        .flat_map(|p| &p.ops)
        .filter_map(|op| match op {
            DrawOp::Image { image, .. } => Some(*image),
            _ => None,
        })
        .collect();
    let mut image_xobjects: Vec<(String, Ref)> = Vec::new();
    for &id in &used_images {
        let Some(image) = images.get(id.0) else {
            continue;
        };
        let xobj_ref = alloc();
        embed_image(&mut pdf, image, xobj_ref, &mut alloc);
        image_xobjects.push((image_name(id), xobj_ref));
    }

    // Phase 3: pages, content streams and link annotations
    let n = layout.page_count();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    let page_annot_refs: Vec<Vec<Ref>> = layout
        .pages
        .iter()
        .map(|page| {
            page.links
                .iter()
                .map(|link| {
                    let annot_ref = alloc();
                    let rect = Rect::new(
                        link.x,
                        layout.page_height - link.y - link.height,
                        link.x + link.width,
                        layout.page_height - link.y,
                    );
                    let mut annot = pdf.annotation(annot_ref);
                    annot
                        .subtype(pdf_writer::types::AnnotationType::Link)
                        .rect(rect)
                        .border(0.0, 0.0, 0.0, None);
                    annot
                        .action()
                        .action_type(pdf_writer::types::ActionType::Uri)
                        .uri(Str(link.url.as_bytes()));
                    annot_ref
                })
                .collect()
        })
        .collect();

    for (i, page) in layout.pages.iter().enumerate() {
        let mut content = page_content(page, layout.page_height, &embedded);
        if let Some(footer) = &footers[i] {
            draw_footer(&mut content, footer, page, layout, theme, fonts, &embedded);
        }
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, layout.page_width, layout.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        if !page_annot_refs[i].is_empty() {
            page.annotations(page_annot_refs[i].iter().copied());
        }
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for (id, font) in &embedded {
                font_dict.pair(Name(font_name(*id).as_bytes()), font.font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    let date = Date::new(info.date.year().clamp(0, 9999) as u16)
        .month(info.date.month() as u8)
        .day(info.date.day() as u8);
    pdf.document_info(info_id)
        .title(TextStr(info.title))
        .author(TextStr(info.author))
        .subject(TextStr(&info.subject))
        .creator(TextStr("proposal-pdf"))
        .producer(TextStr("pdf-writer"))
        .creation_date(date);

    pdf.finish()
}
