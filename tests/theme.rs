mod common;

use std::path::PathBuf;

use proposal_pdf::{
    Error, FontBook, FontLibrary, PlacementKind, ProposalRenderer, TextMetrics, TextRole,
    ThemeConfig, layout_proposal, render_proposal,
};

#[test]
fn invalid_theme_is_rejected_before_layout() {
    common::init_logging();
    let doc = common::sample_document(1);

    let mut zero_height = ThemeConfig::classic();
    zero_height.page.height = 0.0;
    assert!(matches!(
        render_proposal(&doc, &zero_height),
        Err(Error::InvalidTheme(_))
    ));

    let mut negative_margin = ThemeConfig::modern();
    negative_margin.page.margin_left = -4.0;
    assert!(matches!(
        layout_proposal(&doc, &negative_margin),
        Err(Error::InvalidTheme(_))
    ));

    let mut no_room = ThemeConfig::minimal();
    no_room.spacing.footer_reserve = 700.0;
    assert!(matches!(
        render_proposal(&doc, &no_room),
        Err(Error::InvalidTheme(_))
    ));
}

#[test]
fn every_preset_renders_on_letter_paper() {
    common::init_logging();
    let doc = common::sample_document(8);
    for name in ["classic", "modern", "minimal"] {
        let theme = ThemeConfig::preset(name).unwrap();
        let layout = layout_proposal(&doc, &theme).unwrap();
        assert_eq!((layout.page_width, layout.page_height), (612.0, 792.0));
        assert!(layout.page_count() >= 5, "{name}: {} pages", layout.page_count());

        let rendered = render_proposal(&doc, &theme).unwrap();
        let pdf = lopdf::Document::load_mem(&rendered.bytes).unwrap();
        for (_, page_id) in pdf.get_pages() {
            let page = pdf.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            let dims: Vec<f32> = media_box.iter().map(|v| v.as_float().unwrap()).collect();
            assert_eq!(dims, vec![0.0, 0.0, 612.0, 792.0]);
        }
    }
}

#[test]
fn json_theme_changes_geometry() {
    common::init_logging();
    let theme = ThemeConfig::from_json(
        r#"{
            "name": "a4-brand",
            "page": {"width": 595.0, "height": 842.0, "marginTop": 60, "marginBottom": 60,
                     "marginLeft": 50, "marginRight": 50},
            "colors": {"accent": [200, 80, 0]},
            "spacing": {"minRowHeight": 30}
        }"#,
    )
    .unwrap();
    assert_eq!(theme.typography, ThemeConfig::classic().typography);

    let doc = common::sample_document(3);
    let layout = layout_proposal(&doc, &theme).unwrap();
    assert_eq!((layout.page_width, layout.page_height), (595.0, 842.0));
    for page in &layout.pages {
        for p in &page.placements {
            if let PlacementKind::TableRow { .. } = p.kind {
                assert!(p.height >= 30.0);
            }
        }
    }

    assert!(matches!(
        ThemeConfig::from_json(r#"{"page": {"height": -1}}"#),
        Err(Error::InvalidTheme(_))
    ));
    assert!(matches!(
        ThemeConfig::from_json("{not json"),
        Err(Error::ThemeParse(_))
    ));
}

#[test]
fn partial_typography_role_renders() {
    common::init_logging();
    let theme = ThemeConfig::from_json(
        r#"{"typography":{"body":{"fontFamily":"Times","weight":"regular","sizePt":11,"lineGapPt":3}}}"#,
    )
    .unwrap();
    assert_eq!(theme.typography.body.size_pt, 11.0);
    assert_eq!(theme.typography.bullet, ThemeConfig::classic().typography.bullet);

    let fonts = FontBook::new(&theme, &FontLibrary::new());
    assert_eq!(fonts.face_name(fonts.font_for(TextRole::Body)), "Times-Roman");
    let rendered = render_proposal(&common::sample_document(2), &theme).unwrap();
    assert_eq!(common::pdf_page_count(&rendered.bytes), rendered.page_count);
}

#[test]
fn failing_blocks_are_dropped_and_the_rest_renders() {
    common::init_logging();
    let doc = common::sample_document(2);
    let mut theme = ThemeConfig::classic();
    // Wider than the content box: every bullet list fails to lay out.
    theme.spacing.bullet_indent = 1000.0;

    let layout = layout_proposal(&doc, &theme).unwrap();
    let bullets = layout
        .pages
        .iter()
        .flat_map(|p| &p.placements)
        .filter(|p| p.kind == PlacementKind::BulletItem)
        .count();
    assert_eq!(bullets, 0);
    for heading in ["Project Details", "Scope of Work", "Estimate", "Payment Terms", "Acceptance"] {
        assert!(
            !layout.pages_containing(heading).is_empty(),
            "{heading} missing after bullet failures"
        );
    }
    assert!(layout.pages.iter().all(|p| p.links.is_empty()));

    let rendered = render_proposal(&doc, &theme).unwrap();
    assert_eq!(common::pdf_page_count(&rendered.bytes), rendered.page_count);
}

#[test]
fn unknown_font_family_falls_back_to_its_class() {
    common::init_logging();
    let mut theme = ThemeConfig::classic();
    theme.typography.body.font_family = "Garamond Premier".into();
    theme.typography.page_title.font_family = "Nonexistent Slab".into();

    let fonts = FontBook::new(&theme, &FontLibrary::new());
    assert_eq!(fonts.face_name(fonts.font_for(TextRole::Body)), "Helvetica");
    assert_eq!(fonts.face_name(fonts.font_for(TextRole::PageTitle)), "Times-Bold");

    let doc = common::sample_document(2);
    let substituted = layout_proposal(&doc, &theme).unwrap();
    let reference = layout_proposal(&doc, &ThemeConfig::classic()).unwrap();
    assert_eq!(substituted.page_count(), reference.page_count());
    let text = |l: &proposal_pdf::Layout| l.pages.iter().map(|p| p.text()).collect::<Vec<_>>();
    assert_eq!(text(&substituted), text(&reference));
}

#[test]
fn text_metrics_follow_the_theme() {
    let theme = ThemeConfig::classic();
    let fonts = FontBook::new(&theme, &FontLibrary::new());
    let metrics = TextMetrics::new(&fonts, &theme);

    let measured = metrics.measure("Crew time and materials for this phase.", TextRole::Body, 80.0);
    assert!(measured.lines.len() > 1);
    assert_eq!(measured.line_height, 14.0);
    assert_eq!(measured.height, measured.lines.len() as f32 * 14.0);
    assert!(!measured.overflow);

    let wide = metrics.text_width("Proposal", TextRole::PageTitle);
    let narrow = metrics.text_width("Proposal", TextRole::Caption);
    assert!(wide > narrow);
}

#[test]
fn font_directory_scan() {
    common::init_logging();
    let mut library = FontLibrary::new();
    assert!(matches!(
        library.load_dir("/definitely/not/a/font/dir"),
        Err(Error::Io(_))
    ));

    let dir = std::env::temp_dir().join(format!("proposal-pdf-fonts-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("nested")).unwrap();
    std::fs::write(dir.join("broken.ttf"), b"not a font at all").unwrap();
    std::fs::write(dir.join("nested").join("readme.txt"), b"ignored").unwrap();
    let indexed = library.load_dir(&dir).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
    assert_eq!(indexed, 0);
    assert!(library.families().is_empty());
}

fn system_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

#[test]
fn library_font_is_used_when_available() {
    common::init_logging();
    let Some(path) = system_font() else {
        eprintln!("no system TrueType font found, skipping");
        return;
    };
    let mut renderer = ProposalRenderer::new();
    let family = renderer
        .fonts
        .add_font(std::fs::read(&path).unwrap())
        .unwrap();

    let mut theme = ThemeConfig::classic();
    theme.typography.body.font_family = family.clone();
    let fonts = FontBook::new(&theme, &renderer.fonts);
    assert_eq!(fonts.face_name(fonts.font_for(TextRole::Body)), family);

    let doc = common::sample_document(2);
    let rendered = renderer.render_proposal(&doc, &theme).unwrap();
    assert_eq!(common::pdf_page_count(&rendered.bytes), rendered.page_count);
    assert!(common::contains_bytes(&rendered.bytes, b"/FontFile2"));
}

#[test]
fn library_font_measures_characters_outside_winansi() {
    let Some(path) = system_font() else {
        eprintln!("no system TrueType font found, skipping");
        return;
    };
    let mut library = FontLibrary::new();
    let family = library.add_font(std::fs::read(&path).unwrap()).unwrap();
    let mut theme = ThemeConfig::classic();
    theme.typography.body.font_family = family;
    let fonts = FontBook::new(&theme, &library);
    let metrics = TextMetrics::new(&fonts, &theme);

    // Latin Extended-A and Greek, both covered by DejaVu Sans and Arial.
    let single = metrics.text_width("\u{0100}", TextRole::Body);
    assert!(single > 0.0);
    let repeated = metrics.text_width(&"\u{0100}\u{03A9}".repeat(50), TextRole::Body);
    let pair = metrics.text_width("\u{0100}\u{03A9}", TextRole::Body);
    assert!((repeated - pair * 50.0).abs() < 0.01);
}
