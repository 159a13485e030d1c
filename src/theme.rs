//! Page geometry, typography, colors and spacing for one render.
//!
//! Visual variants are values, not code: each preset below is a complete
//! `ThemeConfig`, and JSON themes fill missing fields from the classic preset.

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type Rgb = [u8; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Regular,
    Bold,
}

/// Metric class used to pick a substitute when a family is unavailable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontClass {
    Serif,
    Sans,
}

impl FontClass {
    /// Best guess from a family name, for theme files that leave `class` out.
    pub fn guess(family: &str) -> Option<Self> {
        let family = family.to_ascii_lowercase();
        if family.contains("sans") {
            return Some(FontClass::Sans);
        }
        const SERIF: [&str; 7] = ["serif", "times", "georgia", "garamond", "roman", "cambria", "baskerville"];
        const SANS: [&str; 6] = ["helvetica", "arial", "inter", "roboto", "verdana", "futura"];
        if SERIF.iter().any(|s| family.contains(s)) {
            Some(FontClass::Serif)
        } else if SANS.iter().any(|s| family.contains(s)) {
            Some(FontClass::Sans)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub font_family: String,
    pub weight: FontWeight,
    pub size_pt: f32,
    pub line_gap_pt: f32,
    pub class: FontClass,
}

impl FontSpec {
    fn new(family: &str, weight: FontWeight, class: FontClass, size_pt: f32, line_gap_pt: f32) -> Self {
        Self {
            font_family: family.to_string(),
            weight,
            size_pt,
            line_gap_pt,
            class,
        }
    }

    pub fn line_height(&self) -> f32 {
        self.size_pt + self.line_gap_pt
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextRole {
    PageTitle,
    Subtitle,
    SectionHeading,
    SubHeading,
    Body,
    Label,
    Bullet,
    Link,
    TableHeader,
    TableBody,
    Caption,
    Footer,
}

impl TextRole {
    pub const ALL: [TextRole; 12] = [
        TextRole::PageTitle,
        TextRole::Subtitle,
        TextRole::SectionHeading,
        TextRole::SubHeading,
        TextRole::Body,
        TextRole::Label,
        TextRole::Bullet,
        TextRole::Link,
        TextRole::TableHeader,
        TextRole::TableBody,
        TextRole::Caption,
        TextRole::Footer,
    ];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PartialTypography")]
pub struct Typography {
    pub page_title: FontSpec,
    pub subtitle: FontSpec,
    pub section_heading: FontSpec,
    pub sub_heading: FontSpec,
    pub body: FontSpec,
    pub label: FontSpec,
    pub bullet: FontSpec,
    pub link: FontSpec,
    pub table_header: FontSpec,
    pub table_body: FontSpec,
    pub caption: FontSpec,
    pub footer: FontSpec,
}

impl Typography {
    pub fn role(&self, role: TextRole) -> &FontSpec {
        match role {
            TextRole::PageTitle => &self.page_title,
            TextRole::Subtitle => &self.subtitle,
            TextRole::SectionHeading => &self.section_heading,
            TextRole::SubHeading => &self.sub_heading,
            TextRole::Body => &self.body,
            TextRole::Label => &self.label,
            TextRole::Bullet => &self.bullet,
            TextRole::Link => &self.link,
            TextRole::TableHeader => &self.table_header,
            TextRole::TableBody => &self.table_body,
            TextRole::Caption => &self.caption,
            TextRole::Footer => &self.footer,
        }
    }

    /// Every role with a heading family and a body family of the given classes.
    fn with_families(heading: (&str, FontClass), body: (&str, FontClass), scale: f32) -> Self {
        use FontWeight::{Bold, Regular};
        let (hf, hc) = heading;
        let (bf, bc) = body;
        Self {
            page_title: FontSpec::new(hf, Bold, hc, 28.0 * scale, 6.0),
            subtitle: FontSpec::new(hf, Regular, hc, 15.0 * scale, 4.0),
            section_heading: FontSpec::new(hf, Bold, hc, 18.0 * scale, 4.0),
            sub_heading: FontSpec::new(bf, Bold, bc, 11.5 * scale, 3.0),
            body: FontSpec::new(bf, Regular, bc, 10.0 * scale, 4.0),
            label: FontSpec::new(bf, Bold, bc, 10.0 * scale, 4.0),
            bullet: FontSpec::new(bf, Regular, bc, 10.0 * scale, 3.0),
            link: FontSpec::new(bf, Regular, bc, 10.0 * scale, 3.0),
            table_header: FontSpec::new(bf, Bold, bc, 9.0 * scale, 3.0),
            table_body: FontSpec::new(bf, Regular, bc, 9.0 * scale, 3.0),
            caption: FontSpec::new(bf, Regular, bc, 8.5 * scale, 2.5),
            footer: FontSpec::new(bf, Regular, bc, 8.0 * scale, 2.0),
        }
    }
}

impl Default for Typography {
    fn default() -> Self {
        Typography::with_families(("Times", FontClass::Serif), ("Helvetica", FontClass::Sans), 1.0)
    }
}

/// One role as written in a theme file. Absent fields keep the classic
/// preset's value for the same role.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PartialFontSpec {
    font_family: Option<String>,
    weight: Option<FontWeight>,
    size_pt: Option<f32>,
    line_gap_pt: Option<f32>,
    class: Option<FontClass>,
}

impl PartialFontSpec {
    fn apply(self, spec: &mut FontSpec) {
        if let Some(family) = self.font_family {
            spec.class = FontClass::guess(&family).unwrap_or(spec.class);
            spec.font_family = family;
        }
        if let Some(class) = self.class {
            spec.class = class;
        }
        if let Some(weight) = self.weight {
            spec.weight = weight;
        }
        if let Some(size) = self.size_pt {
            spec.size_pt = size;
        }
        if let Some(gap) = self.line_gap_pt {
            spec.line_gap_pt = gap;
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PartialTypography {
    page_title: PartialFontSpec,
    subtitle: PartialFontSpec,
    section_heading: PartialFontSpec,
    sub_heading: PartialFontSpec,
    body: PartialFontSpec,
    label: PartialFontSpec,
    bullet: PartialFontSpec,
    link: PartialFontSpec,
    table_header: PartialFontSpec,
    table_body: PartialFontSpec,
    caption: PartialFontSpec,
    footer: PartialFontSpec,
}

impl From<PartialTypography> for Typography {
    fn from(partial: PartialTypography) -> Self {
        let mut t = Typography::default();
        partial.page_title.apply(&mut t.page_title);
        partial.subtitle.apply(&mut t.subtitle);
        partial.section_heading.apply(&mut t.section_heading);
        partial.sub_heading.apply(&mut t.sub_heading);
        partial.body.apply(&mut t.body);
        partial.label.apply(&mut t.label);
        partial.bullet.apply(&mut t.bullet);
        partial.link.apply(&mut t.link);
        partial.table_header.apply(&mut t.table_header);
        partial.table_body.apply(&mut t.table_body);
        partial.caption.apply(&mut t.caption);
        partial.footer.apply(&mut t.footer);
        t
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Colors {
    pub text: Rgb,
    pub heading: Rgb,
    pub accent: Rgb,
    pub muted: Rgb,
    pub rule: Rgb,
    pub link: Rgb,
    pub table_header_fill: Rgb,
    pub table_header_text: Rgb,
    pub zebra_fill: Rgb,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            text: [33, 37, 41],
            heading: [20, 40, 80],
            accent: [20, 40, 80],
            muted: [120, 124, 130],
            rule: [200, 204, 210],
            link: [26, 86, 178],
            table_header_fill: [20, 40, 80],
            table_header_text: [255, 255, 255],
            zebra_fill: [242, 244, 248],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Spacing {
    pub after_title: f32,
    pub before_section: f32,
    pub after_heading: f32,
    pub after_sub_heading: f32,
    pub between_paragraphs: f32,
    pub between_bullets: f32,
    pub bullet_indent: f32,
    pub key_column_width: f32,
    pub table_cell_padding: f32,
    pub min_row_height: f32,
    pub rule_thickness: f32,
    pub footer_reserve: f32,
    pub cover_top: f32,
    pub signature_height: f32,
    pub column_gap: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            after_title: 18.0,
            before_section: 16.0,
            after_heading: 10.0,
            after_sub_heading: 4.0,
            between_paragraphs: 8.0,
            between_bullets: 3.0,
            bullet_indent: 14.0,
            key_column_width: 140.0,
            table_cell_padding: 5.0,
            min_row_height: 24.0,
            rule_thickness: 0.75,
            footer_reserve: 18.0,
            cover_top: 96.0,
            signature_height: 42.0,
            column_gap: 24.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    pub fn letter(margin: f32) -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin_top: margin,
            margin_bottom: margin,
            margin_left: margin,
            margin_right: margin,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest y (measured from the page top) a block may reach.
    pub fn safe_bottom(&self, footer_reserve: f32) -> f32 {
        self.height - self.margin_bottom - footer_reserve
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::letter(54.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeConfig {
    pub name: String,
    pub page: PageGeometry,
    pub typography: Typography,
    pub colors: Colors,
    pub spacing: Spacing,
    /// Substitute family for unavailable serif fonts.
    pub fallback_serif: String,
    /// Substitute family for unavailable sans-serif fonts.
    pub fallback_sans: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        ThemeConfig::classic()
    }
}

impl ThemeConfig {
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            page: PageGeometry::default(),
            typography: Typography::default(),
            colors: Colors::default(),
            spacing: Spacing::default(),
            fallback_serif: "Times".to_string(),
            fallback_sans: "Helvetica".to_string(),
        }
    }

    pub fn modern() -> Self {
        let sans = ("Helvetica", FontClass::Sans);
        Self {
            name: "modern".to_string(),
            page: PageGeometry::letter(48.0),
            typography: Typography::with_families(sans, sans, 1.0),
            colors: Colors {
                heading: [15, 23, 42],
                accent: [13, 148, 136],
                table_header_fill: [13, 148, 136],
                zebra_fill: [240, 253, 250],
                link: [13, 116, 144],
                ..Colors::default()
            },
            spacing: Spacing {
                after_heading: 12.0,
                min_row_height: 26.0,
                table_cell_padding: 6.0,
                ..Spacing::default()
            },
            ..ThemeConfig::classic()
        }
    }

    pub fn minimal() -> Self {
        let sans = ("Helvetica", FontClass::Sans);
        Self {
            name: "minimal".to_string(),
            page: PageGeometry::letter(72.0),
            typography: Typography::with_families(sans, sans, 0.95),
            colors: Colors {
                text: [40, 40, 40],
                heading: [40, 40, 40],
                accent: [90, 90, 90],
                table_header_fill: [230, 230, 230],
                table_header_text: [40, 40, 40],
                zebra_fill: [250, 250, 250],
                ..Colors::default()
            },
            spacing: Spacing {
                before_section: 20.0,
                between_paragraphs: 10.0,
                min_row_height: 22.0,
                ..Spacing::default()
            },
            ..ThemeConfig::classic()
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "classic" => Some(ThemeConfig::classic()),
            "modern" => Some(ThemeConfig::modern()),
            "minimal" => Some(ThemeConfig::minimal()),
            _ => None,
        }
    }

    /// Parse a JSON theme. Missing fields are taken from the classic preset.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let theme: ThemeConfig = serde_json::from_str(json)?;
        theme.validate()?;
        Ok(theme)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let p = &self.page;
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;

        if !positive(p.width) || !positive(p.height) {
            return Err(Error::InvalidTheme(format!(
                "page size must be positive, got {}x{}",
                p.width, p.height
            )));
        }
        for (name, v) in [
            ("margin_top", p.margin_top),
            ("margin_bottom", p.margin_bottom),
            ("margin_left", p.margin_left),
            ("margin_right", p.margin_right),
        ] {
            if !non_negative(v) {
                return Err(Error::InvalidTheme(format!("{name} must be non-negative, got {v}")));
            }
        }
        if p.content_width() <= 0.0 {
            return Err(Error::InvalidTheme("horizontal margins leave no content width".into()));
        }
        if p.safe_bottom(self.spacing.footer_reserve) <= p.margin_top {
            return Err(Error::InvalidTheme(
                "vertical margins and footer reserve leave no content height".into(),
            ));
        }

        for role in TextRole::ALL {
            let spec = self.typography.role(role);
            if !positive(spec.size_pt) {
                return Err(Error::InvalidTheme(format!(
                    "{role:?} font size must be positive, got {}",
                    spec.size_pt
                )));
            }
            if !non_negative(spec.line_gap_pt) {
                return Err(Error::InvalidTheme(format!(
                    "{role:?} line gap must be non-negative, got {}",
                    spec.line_gap_pt
                )));
            }
            if spec.font_family.trim().is_empty() {
                return Err(Error::InvalidTheme(format!("{role:?} has an empty font family")));
            }
        }

        let s = &self.spacing;
        for (name, v) in [
            ("after_title", s.after_title),
            ("before_section", s.before_section),
            ("after_heading", s.after_heading),
            ("after_sub_heading", s.after_sub_heading),
            ("between_paragraphs", s.between_paragraphs),
            ("between_bullets", s.between_bullets),
            ("bullet_indent", s.bullet_indent),
            ("key_column_width", s.key_column_width),
            ("table_cell_padding", s.table_cell_padding),
            ("min_row_height", s.min_row_height),
            ("rule_thickness", s.rule_thickness),
            ("footer_reserve", s.footer_reserve),
            ("cover_top", s.cover_top),
            ("signature_height", s.signature_height),
            ("column_gap", s.column_gap),
        ] {
            if !non_negative(v) {
                return Err(Error::InvalidTheme(format!("spacing {name} must be non-negative, got {v}")));
            }
        }
        if s.key_column_width >= p.content_width() {
            return Err(Error::InvalidTheme("key column is wider than the content box".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for name in ["classic", "modern", "minimal"] {
            let theme = ThemeConfig::preset(name).unwrap();
            assert_eq!(theme.name, name);
            theme.validate().unwrap();
        }
        assert!(ThemeConfig::preset("neon").is_none());
    }

    #[test]
    fn zero_page_height_is_rejected() {
        let mut theme = ThemeConfig::classic();
        theme.page.height = 0.0;
        assert!(matches!(theme.validate(), Err(Error::InvalidTheme(_))));
    }

    #[test]
    fn json_fills_missing_fields_from_classic() {
        let theme = ThemeConfig::from_json(r#"{"name":"brand","colors":{"accent":[255,0,0]}}"#).unwrap();
        assert_eq!(theme.name, "brand");
        assert_eq!(theme.colors.accent, [255, 0, 0]);
        assert_eq!(theme.colors.text, Colors::default().text);
        assert_eq!(theme.page.width, 612.0);
    }

    #[test]
    fn partial_role_keeps_the_rest_of_the_classic_spec() {
        let theme = ThemeConfig::from_json(
            r#"{"typography":{"body":{"fontFamily":"Times","weight":"regular","sizePt":11,"lineGapPt":3}}}"#,
        )
        .unwrap();
        let classic = Typography::default();
        assert_eq!(theme.typography.body.font_family, "Times");
        assert_eq!(theme.typography.body.size_pt, 11.0);
        assert_eq!(theme.typography.body.line_gap_pt, 3.0);
        assert_eq!(theme.typography.body.class, FontClass::Serif);
        assert_eq!(theme.typography.caption, classic.caption);
        assert_eq!(theme.typography.section_heading, classic.section_heading);

        let theme = ThemeConfig::from_json(r#"{"typography":{"footer":{"sizePt":7}}}"#).unwrap();
        assert_eq!(theme.typography.footer.size_pt, 7.0);
        assert_eq!(theme.typography.footer.font_family, classic.footer.font_family);
        assert_eq!(theme.typography.footer.class, classic.footer.class);
    }

    #[test]
    fn font_class_from_family_name() {
        assert_eq!(FontClass::guess("Times New Roman"), Some(FontClass::Serif));
        assert_eq!(FontClass::guess("Noto Serif"), Some(FontClass::Serif));
        assert_eq!(FontClass::guess("DejaVu Sans"), Some(FontClass::Sans));
        assert_eq!(FontClass::guess("Helvetica"), Some(FontClass::Sans));
        assert_eq!(FontClass::guess("Brand Slab"), None);
    }
}
