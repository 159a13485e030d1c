use crate::assets::ImageId;
use crate::fonts::FontId;
use crate::theme::Rgb;

/// A drawing primitive. Coordinates are in points, y measured from the page top.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        font: FontId,
        size: f32,
        color: Rgb,
        text: String,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Rgb,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Rgb,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: ImageId,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub url: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlacementKind {
    Heading,
    SubHeading,
    Paragraph,
    BulletItem,
    KeyValue,
    Image,
    Placeholder,
    Rule,
    TableHeader,
    TableRow {
        index: usize,
        min_height: f32,
        name_height: f32,
        description_height: f32,
        padding: f32,
    },
    Totals,
    Signature,
}

/// Vertical extent reserved for one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub kind: PlacementKind,
    pub top: f32,
    pub height: f32,
}

impl Placement {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaidOutPage {
    pub ops: Vec<DrawOp>,
    pub links: Vec<LinkArea>,
    pub placements: Vec<Placement>,
    /// Left footer text; the page number is added when the document is written.
    pub footer: Option<String>,
    pub safe_bottom: f32,
}

impl LaidOutPage {
    /// All text on the page in draw order, one op per line.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            if let DrawOp::Text { text, .. } = op {
                out.push_str(text);
                out.push('\n');
            }
        }
        out
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.ops.iter().any(|op| match op {
            DrawOp::Text { text, .. } => text.contains(needle),
            _ => false,
        })
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }
}

/// The paginated display list of a whole document, before serialization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<LaidOutPage>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_containing(&self, needle: &str) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.contains_text(needle))
            .map(|(i, _)| i)
            .collect()
    }
}
