mod blocks;
mod cursor;
mod layout;
mod page;
mod sections;
mod table;
mod writer;

use std::time::Instant;

use crate::assets::{AssetResolver, AssetStore, ResolvedImage};
use crate::fonts::{FontBook, FontLibrary};
use crate::model::ProposalDocument;
use crate::theme::ThemeConfig;

use blocks::{Block, RenderContext, render_block};
use cursor::FlowCursor;
use sections::SectionKind;
use writer::{DocumentInfo, write_pdf};

pub use layout::{Measured, TextMetrics};
pub use page::{DrawOp, LaidOutPage, Layout, LinkArea, Placement, PlacementKind};

/// Drives the fixed section order against one cursor. Each section opens a
/// page, renders its blocks and finalizes its last page.
struct Assembler<'a, 'd> {
    doc: &'d ProposalDocument,
    ctx: RenderContext<'a>,
    cursor: FlowCursor,
}

impl<'a, 'd> Assembler<'a, 'd> {
    fn new(
        doc: &'d ProposalDocument,
        theme: &'a ThemeConfig,
        fonts: &'a FontBook,
        assets: &'a AssetStore,
    ) -> Self {
        let mut cursor = FlowCursor::new(theme);
        cursor.set_footer_text(sections::footer_text(doc));
        Self {
            doc,
            ctx: RenderContext {
                theme,
                metrics: TextMetrics::new(fonts, theme),
                assets: AssetResolver::new(assets),
            },
            cursor,
        }
    }

    fn run(mut self) -> (Layout, Vec<ResolvedImage>) {
        for kind in SectionKind::ORDER {
            if kind == SectionKind::Certificate && !self.doc.is_fully_signed() {
                log::debug!("Certificate of signature skipped: not signed by both parties");
                continue;
            }
            self.section(kind);
        }
        (self.cursor.finish(), self.ctx.assets.into_images())
    }

    fn section(&mut self, kind: SectionKind) {
        let blocks = sections::build(kind, self.doc, self.ctx.theme, &mut self.ctx.assets);
        if blocks.is_empty() {
            log::debug!("Section {} has no content", kind.name());
            return;
        }
        self.cursor.start_page();
        let first_page = self.cursor.page_index();
        for (i, block) in blocks.iter().enumerate() {
            self.block(kind, block, &blocks[i + 1..]);
        }
        self.cursor.finalize_current_page();
        log::debug!(
            "Section {} on pages {}..={}",
            kind.name(),
            first_page + 1,
            self.cursor.page_index() + 1
        );
    }

    /// A failed block is rolled back to nothing; the rest of the document
    /// still renders.
    fn block(&mut self, kind: SectionKind, block: &Block, following: &[Block]) {
        let checkpoint = self.cursor.checkpoint();
        if let Err(e) = render_block(&mut self.ctx, &mut self.cursor, block, following) {
            log::warn!(
                "Dropped {} in {} section: {e}",
                block.name(),
                kind.name()
            );
            self.cursor.rollback(checkpoint);
        }
    }
}

pub(crate) fn layout(
    doc: &ProposalDocument,
    theme: &ThemeConfig,
    library: &FontLibrary,
    assets: &AssetStore,
) -> Layout {
    let fonts = FontBook::new(theme, library);
    Assembler::new(doc, theme, &fonts, assets).run().0
}

pub(crate) fn render(
    doc: &ProposalDocument,
    theme: &ThemeConfig,
    library: &FontLibrary,
    assets: &AssetStore,
) -> (Layout, Vec<u8>) {
    let t0 = Instant::now();

    let fonts = FontBook::new(theme, library);
    let t_fonts = t0.elapsed();

    let (layout, images) = Assembler::new(doc, theme, &fonts, assets).run();
    let t_layout = t0.elapsed();

    let sender = &doc.cover.sender;
    let info = DocumentInfo {
        title: &doc.cover.title,
        author: sender.company.as_deref().unwrap_or(&sender.name),
        subject: format!("Proposal {}", doc.cover.proposal_number),
        date: doc.cover.date,
    };
    let bytes = write_pdf(&layout, &fonts, &images, theme, &info);
    let t_write = t0.elapsed();

    log::info!(
        "Render phases: resolve={:.1}ms, layout={:.1}ms, write={:.1}ms ({} pages, {} bytes)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_layout - t_fonts).as_secs_f64() * 1000.0,
        (t_write - t_layout).as_secs_f64() * 1000.0,
        layout.page_count(),
        bytes.len(),
    );

    (layout, bytes)
}
