mod common;

use proposal_pdf::{
    AssetStore, CustomSection, CustomSectionKind, ImageAsset, ProposalRenderer, SectionBody,
    ThemeConfig,
};

fn renderer() -> ProposalRenderer {
    let mut assets = AssetStore::new();
    assets.insert("logo", common::png(200, 80, [20, 40, 80, 255]));
    assets.insert("crew-photo", common::png(300, 200, [120, 140, 90, 255]));
    assets.insert("license", common::png(850, 1100, [250, 250, 250, 255]));
    assets.insert("insurance", common::png(850, 1100, [245, 245, 240, 255]));
    assets.insert("badge", common::png(64, 64, [200, 30, 30, 128]));
    ProposalRenderer::with_assets(assets)
}

fn with_about_images(images: &[&str]) -> proposal_pdf::ProposalDocument {
    let mut doc = common::sample_document(2);
    doc.custom_sections[0].images = images.iter().map(|s| s.to_string()).collect();
    doc
}

fn standards_section(images: &[&str]) -> CustomSection {
    CustomSection {
        kind: CustomSectionKind::Standards,
        title: None,
        body: SectionBody::Boilerplate,
        images: images.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn repeated_image_is_embedded_once() {
    common::init_logging();
    let renderer = renderer();
    let mut doc = with_about_images(&["logo"]);
    doc.cover.logo = Some("logo".into());
    let theme = ThemeConfig::classic();

    let layout = renderer.layout_proposal(&doc, &theme).unwrap();
    let draws: usize = layout.pages.iter().map(|p| p.image_count()).sum();
    assert_eq!(draws, 2);
    assert_eq!(layout.pages[0].image_count(), 1);

    let rendered = renderer.render_proposal(&doc, &theme).unwrap();
    assert_eq!(common::pdf_image_count(&rendered.bytes), 1);
}

#[test]
fn unused_assets_are_not_embedded() {
    common::init_logging();
    let rendered = renderer()
        .render_proposal(&common::sample_document(1), &ThemeConfig::classic())
        .unwrap();
    assert_eq!(common::pdf_image_count(&rendered.bytes), 0);
}

#[test]
fn missing_decorative_image_is_skipped() {
    common::init_logging();
    let renderer = renderer();
    let theme = ThemeConfig::classic();

    let plain = renderer
        .layout_proposal(&with_about_images(&[]), &theme)
        .unwrap();
    let missing = renderer
        .layout_proposal(&with_about_images(&["no-such-asset"]), &theme)
        .unwrap();
    assert_eq!(missing, plain);

    let mut broken = renderer.clone();
    broken.assets.insert(
        "corrupt",
        ImageAsset {
            data: b"\x89PNG\r\n\x1a\ntruncated".to_vec(),
            pixel_width: 10,
            pixel_height: 10,
        },
    );
    let corrupt = broken
        .render_proposal(&with_about_images(&["corrupt", "crew-photo"]), &theme)
        .unwrap();
    assert_eq!(common::pdf_image_count(&corrupt.bytes), 1);
}

#[test]
fn standards_get_one_page_per_usable_image() {
    common::init_logging();
    let renderer = renderer();
    let theme = ThemeConfig::classic();
    let base = common::sample_document(2);
    let baseline = renderer.layout_proposal(&base, &theme).unwrap();

    let mut doc = base.clone();
    doc.custom_sections
        .push(standards_section(&["license", "missing-permit", "insurance"]));
    let layout = renderer.layout_proposal(&doc, &theme).unwrap();
    assert_eq!(layout.page_count(), baseline.page_count() + 2);

    let image_pages: Vec<_> = layout
        .pages
        .iter()
        .filter(|p| p.image_count() > 0)
        .collect();
    assert_eq!(image_pages.len(), 2);
    for page in image_pages {
        assert_eq!(page.image_count(), 1);
        assert!(page.text().is_empty());
    }

    let mut none_usable = base.clone();
    none_usable
        .custom_sections
        .push(standards_section(&["missing-permit"]));
    let layout = renderer.layout_proposal(&none_usable, &theme).unwrap();
    assert_eq!(layout.page_count(), baseline.page_count());
}

#[test]
fn translucent_png_gets_a_soft_mask() {
    common::init_logging();
    let renderer = renderer();
    let theme = ThemeConfig::classic();

    let opaque = renderer
        .render_proposal(&with_about_images(&["crew-photo"]), &theme)
        .unwrap();
    assert!(!common::contains_bytes(&opaque.bytes, b"/SMask"));

    let translucent = renderer
        .render_proposal(&with_about_images(&["badge"]), &theme)
        .unwrap();
    assert!(common::contains_bytes(&translucent.bytes, b"/SMask"));
    assert_eq!(common::pdf_image_count(&translucent.bytes), 1);
}

#[test]
fn jpeg_is_passed_through() {
    common::init_logging();
    // SOI, then a baseline SOF0 for a 32x16 three-component image.
    let jpeg = vec![
        0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x10, 0x00, 0x20, 0x03, 0x01, 0x22,
        0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01, 0xFF, 0xD9,
    ];
    let mut renderer = renderer();
    renderer.assets.insert(
        "photo",
        ImageAsset {
            data: jpeg,
            pixel_width: 32,
            pixel_height: 16,
        },
    );
    let rendered = renderer
        .render_proposal(&with_about_images(&["photo"]), &ThemeConfig::classic())
        .unwrap();
    assert!(common::contains_bytes(&rendered.bytes, b"/DCTDecode"));
    assert_eq!(common::pdf_image_count(&rendered.bytes), 1);
}

#[test]
fn hyperlinks_become_uri_annotations() {
    common::init_logging();
    let doc = common::sample_document(1);
    let theme = ThemeConfig::classic();
    let layout = renderer().layout_proposal(&doc, &theme).unwrap();
    let links: Vec<_> = layout.pages.iter().flat_map(|p| &p.links).collect();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, "https://permits.example.com/p-2041");
    assert!(links[0].width > 0.0 && links[0].height > 0.0);

    let rendered = renderer().render_proposal(&doc, &theme).unwrap();
    assert!(common::contains_bytes(
        &rendered.bytes,
        b"https://permits.example.com/p-2041"
    ));
    assert!(common::contains_bytes(&rendered.bytes, b"/URI"));
}
