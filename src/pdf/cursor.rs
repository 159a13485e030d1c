use super::page::{DrawOp, LaidOutPage, Layout, LinkArea, Placement, PlacementKind};
use crate::theme::ThemeConfig;

const EPSILON: f32 = 0.01;

/// Owns the page list and the vertical write position. Renderers change
/// document state only through this type.
pub(crate) struct FlowCursor {
    page_width: f32,
    page_height: f32,
    left: f32,
    content_width: f32,
    top: f32,
    safe_bottom: f32,
    pages: Vec<LaidOutPage>,
    y: f32,
    footer_text: String,
    open: bool,
}

/// Enough state to undo everything drawn after it was taken.
#[derive(Clone, Debug)]
pub(crate) struct Checkpoint {
    pages: usize,
    ops: usize,
    links: usize,
    placements: usize,
    footer: Option<String>,
    y: f32,
    open: bool,
}

impl FlowCursor {
    pub(crate) fn new(theme: &ThemeConfig) -> Self {
        let page = &theme.page;
        Self {
            page_width: page.width,
            page_height: page.height,
            left: page.margin_left,
            content_width: page.content_width(),
            top: page.margin_top,
            safe_bottom: page.safe_bottom(theme.spacing.footer_reserve),
            pages: Vec::new(),
            y: page.margin_top,
            footer_text: String::new(),
            open: false,
        }
    }

    pub(crate) fn set_footer_text(&mut self, text: impl Into<String>) {
        self.footer_text = text.into();
    }

    pub(crate) fn start_page(&mut self) {
        if self.open {
            log::debug!("start_page with page {} still open, finalizing it", self.pages.len());
            self.finalize_current_page();
        }
        self.pages.push(LaidOutPage {
            safe_bottom: self.safe_bottom,
            ..LaidOutPage::default()
        });
        self.y = self.top;
        self.open = true;
    }

    /// Attach the footer to the current page and close it. A page gets at
    /// most one footer.
    pub(crate) fn finalize_current_page(&mut self) {
        if !self.open {
            return;
        }
        if let Some(page) = self.pages.last_mut()
            && page.footer.is_none()
        {
            page.footer = Some(self.footer_text.clone());
        }
        self.open = false;
    }

    pub(crate) fn break_page(&mut self) {
        log::debug!("page break after page {} at y={:.2}", self.pages.len(), self.y);
        self.finalize_current_page();
        self.start_page();
    }

    pub(crate) fn y(&self) -> f32 {
        self.y
    }

    pub(crate) fn left(&self) -> f32 {
        self.left
    }

    pub(crate) fn content_width(&self) -> f32 {
        self.content_width
    }

    pub(crate) fn safe_bottom(&self) -> f32 {
        self.safe_bottom
    }

    /// Height usable on a fresh page.
    pub(crate) fn page_capacity(&self) -> f32 {
        self.safe_bottom - self.top
    }

    pub(crate) fn page_index(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    pub(crate) fn at_page_top(&self) -> bool {
        (self.y - self.top).abs() < EPSILON
    }

    pub(crate) fn fits(&self, height: f32) -> bool {
        self.y + height <= self.safe_bottom + EPSILON
    }

    /// Break the page first if `height` does not fit in what remains. A block
    /// taller than a whole page is drawn from the top of a fresh page anyway.
    pub(crate) fn ensure_room(&mut self, height: f32) {
        if !self.open {
            self.start_page();
        }
        if self.fits(height) {
            return;
        }
        if self.at_page_top() {
            log::warn!(
                "block of {height:.1}pt exceeds page capacity of {:.1}pt, drawing oversized",
                self.page_capacity()
            );
        } else {
            self.break_page();
        }
    }

    /// Reserve `height` atomically and return the top of the reserved band.
    pub(crate) fn reserve(&mut self, height: f32, kind: PlacementKind) -> f32 {
        self.ensure_room(height);
        let top = self.y;
        self.current().placements.push(Placement { kind, top, height });
        self.y += height;
        top
    }

    /// Vertical gap between blocks. Dropped at the top of a page; clamped at
    /// the bottom so the next reservation breaks.
    pub(crate) fn gap(&mut self, dy: f32) {
        if !self.open || self.at_page_top() {
            return;
        }
        self.y = (self.y + dy).min(self.safe_bottom);
    }

    /// Explicit vertical offset. Unlike `gap`, applies at the top of a page.
    pub(crate) fn advance(&mut self, dy: f32) {
        if !self.open {
            self.start_page();
        }
        self.y = (self.y + dy).min(self.safe_bottom);
    }

    pub(crate) fn draw(&mut self, op: DrawOp) {
        self.current().ops.push(op);
    }

    pub(crate) fn link(&mut self, area: LinkArea) {
        self.current().links.push(area);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        let last = self.pages.last();
        Checkpoint {
            pages: self.pages.len(),
            ops: last.map_or(0, |p| p.ops.len()),
            links: last.map_or(0, |p| p.links.len()),
            placements: last.map_or(0, |p| p.placements.len()),
            footer: last.and_then(|p| p.footer.clone()),
            y: self.y,
            open: self.open,
        }
    }

    pub(crate) fn rollback(&mut self, cp: Checkpoint) {
        self.pages.truncate(cp.pages);
        if let Some(page) = self.pages.last_mut() {
            page.ops.truncate(cp.ops);
            page.links.truncate(cp.links);
            page.placements.truncate(cp.placements);
            page.footer = cp.footer;
        }
        self.y = cp.y;
        self.open = cp.open;
    }

    pub(crate) fn finish(mut self) -> Layout {
        self.finalize_current_page();
        Layout {
            page_width: self.page_width,
            page_height: self.page_height,
            pages: self.pages,
        }
    }

    fn current(&mut self) -> &mut LaidOutPage {
        if !self.open {
            self.start_page();
        }
        let index = self.pages.len() - 1;
        &mut self.pages[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> FlowCursor {
        let mut c = FlowCursor::new(&ThemeConfig::classic());
        c.set_footer_text("Acme | Proposal 7");
        c.start_page();
        c
    }

    #[test]
    fn reserve_breaks_before_overflow() {
        let mut c = cursor();
        let capacity = c.page_capacity();
        c.reserve(capacity - 10.0, PlacementKind::Paragraph);
        let top = c.reserve(20.0, PlacementKind::Paragraph);
        assert_eq!(c.page_index(), 1);
        assert_eq!(top, c.top);
        let layout = c.finish();
        assert_eq!(layout.page_count(), 2);
        for page in &layout.pages {
            assert_eq!(page.footer.as_deref(), Some("Acme | Proposal 7"));
            for p in &page.placements {
                assert!(p.bottom() <= page.safe_bottom + EPSILON);
            }
        }
    }

    #[test]
    fn gap_is_dropped_at_page_top() {
        let mut c = cursor();
        c.gap(30.0);
        assert!(c.at_page_top());
        c.reserve(10.0, PlacementKind::Rule);
        c.gap(30.0);
        assert!((c.y() - (c.top + 40.0)).abs() < EPSILON);
    }

    #[test]
    fn footer_is_attached_once() {
        let mut c = cursor();
        c.finalize_current_page();
        c.set_footer_text("changed");
        c.finalize_current_page();
        let layout = c.finish();
        assert_eq!(layout.pages[0].footer.as_deref(), Some("Acme | Proposal 7"));
    }

    #[test]
    fn rollback_undoes_page_breaks_and_ops() {
        let mut c = cursor();
        c.reserve(100.0, PlacementKind::Paragraph);
        let cp = c.checkpoint();
        let capacity = c.page_capacity();
        c.reserve(capacity, PlacementKind::Paragraph);
        c.draw(DrawOp::Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            fill: [0, 0, 0],
        });
        assert_eq!(c.page_index(), 1);
        c.rollback(cp);
        assert_eq!(c.page_index(), 0);
        let layout = c.finish();
        assert_eq!(layout.pages[0].placements.len(), 1);
        assert!(layout.pages[0].ops.is_empty());
        assert!(layout.pages[0].footer.is_some());
    }
}
