use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::Error;
use crate::theme::{FontClass, FontSpec, FontWeight, TextRole, ThemeConfig};

/// PDF standard fonts usable without embedding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Builtin {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
}

impl Builtin {
    fn from_family(family: &str, bold: bool) -> Option<Self> {
        let serif = match family.trim().to_lowercase().as_str() {
            "helvetica" | "arial" | "sans-serif" | "sans" => false,
            "times" | "times new roman" | "times-roman" | "serif" => true,
            _ => return None,
        };
        Some(match (serif, bold) {
            (false, false) => Builtin::Helvetica,
            (false, true) => Builtin::HelveticaBold,
            (true, false) => Builtin::TimesRoman,
            (true, true) => Builtin::TimesBold,
        })
    }

    pub(crate) fn base_font(self) -> &'static str {
        match self {
            Builtin::Helvetica => "Helvetica",
            Builtin::HelveticaBold => "Helvetica-Bold",
            Builtin::TimesRoman => "Times-Roman",
            Builtin::TimesBold => "Times-Bold",
        }
    }

    fn is_serif(self) -> bool {
        matches!(self, Builtin::TimesRoman | Builtin::TimesBold)
    }

    fn ascender_ratio(self) -> f32 {
        if self.is_serif() { 0.683 } else { 0.718 }
    }

    fn ascii_widths(self) -> &'static [u16; 95] {
        match self {
            Builtin::Helvetica => &HELVETICA_WIDTHS,
            Builtin::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
            Builtin::TimesRoman => &TIMES_ROMAN_WIDTHS,
            Builtin::TimesBold => &TIMES_BOLD_WIDTHS,
        }
    }

    /// Widths at 1000 units/em for WinAnsi bytes 32..=255.
    fn widths_1000(self) -> Vec<f32> {
        let ascii = self.ascii_widths();
        let serif = self.is_serif();
        let bold = matches!(self, Builtin::HelveticaBold | Builtin::TimesBold);
        (32u8..=255u8)
            .map(|b| match b {
                32..=126 => ascii[(b - 32) as usize] as f32,
                0x95 => 350.0,                                 // bullet
                0x85 | 0x97 => 1000.0,                         // ellipsis, em dash
                0x96 | 0x80 => if serif { 500.0 } else { 556.0 }, // en dash, euro
                0x91 | 0x92 => match (serif, bold) {
                    (true, _) => 333.0,
                    (false, false) => 222.0,
                    (false, true) => 278.0,
                },
                0x93 | 0x94 => match (serif, bold) {
                    (true, false) => 444.0,
                    _ => 500.0,
                },
                0xA0 => ascii[0] as f32, // no-break space
                0xB7 => if serif { 250.0 } else { 278.0 },
                0xA9 | 0xAE => if serif { 760.0 } else { 737.0 },
                _ => if serif { 500.0 } else { 556.0 },
            })
            .collect()
    }
}

// AFM advance widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
    722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
    556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

pub(crate) enum FaceSource {
    Builtin(Builtin),
    TrueType {
        family: String,
        data: Arc<[u8]>,
        face_index: u32,
    },
}

pub(crate) struct FontFace {
    pub(crate) source: FaceSource,
    widths_1000: Vec<f32>,
    /// Characters outside WinAnsi, read from the cmap when the face is loaded.
    other_widths_1000: HashMap<char, f32>,
    pub(crate) ascender_ratio: f32,
}

impl FontFace {
    fn builtin(builtin: Builtin) -> Self {
        Self {
            source: FaceSource::Builtin(builtin),
            widths_1000: builtin.widths_1000(),
            other_widths_1000: HashMap::new(),
            ascender_ratio: builtin.ascender_ratio(),
        }
    }

    fn truetype(family: &str, data: Arc<[u8]>, face_index: u32) -> Option<Self> {
        let face = Face::parse(&data, face_index).ok()?;
        let units = face.units_per_em() as f32;
        let advance = |ch: char| {
            face.glyph_index(ch)
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| adv as f32 / units * 1000.0)
        };
        let widths_1000 = (32u8..=255u8)
            .map(|byte| advance(winansi_to_char(byte)).unwrap_or(0.0))
            .collect();

        let mut other_widths_1000 = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables.into_iter().filter(|t| t.is_unicode()) {
                subtable.codepoints(|cp| {
                    let Some(ch) = char::from_u32(cp) else {
                        return;
                    };
                    if char_to_winansi(ch) >= 32 || other_widths_1000.contains_key(&ch) {
                        return;
                    }
                    if let Some(w) = advance(ch) {
                        other_widths_1000.insert(ch, w);
                    }
                });
            }
        }
        let ascender_ratio = face.ascender() as f32 / units;
        Some(Self {
            source: FaceSource::TrueType {
                family: family.to_string(),
                data: data.clone(),
                face_index,
            },
            widths_1000,
            other_widths_1000,
            ascender_ratio,
        })
    }

    /// Width of a single character in 1000-units. Builtin faces only cover
    /// WinAnsi; anything else is dropped at encode time and measures zero.
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            return self.widths_1000[(byte - 32) as usize];
        }
        self.other_widths_1000.get(&ch).copied().unwrap_or(0.0)
    }

    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub(crate) fn space_width(&self, font_size: f32) -> f32 {
        self.widths_1000[0] * font_size / 1000.0
    }

    pub(crate) fn display_name(&self) -> String {
        match &self.source {
            FaceSource::Builtin(b) => b.base_font().to_string(),
            FaceSource::TrueType { family, .. } => family.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub(crate) usize);

#[derive(Clone)]
enum LibraryFace {
    Memory { data: Arc<[u8]>, face_index: u32 },
    File { path: PathBuf, face_index: u32 },
}

/// Caller-supplied TrueType/OpenType fonts, keyed by family name and weight.
#[derive(Clone, Default)]
pub struct FontLibrary {
    faces: HashMap<(String, bool), LibraryFace>,
}

impl FontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every face in a font file or collection. Returns the family of
    /// the first face.
    pub fn add_font(&mut self, data: Vec<u8>) -> Result<String, Error> {
        let data: Arc<[u8]> = Arc::from(data);
        let face_count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        let mut first_family = None;
        for face_index in 0..face_count {
            if let Some((family, bold)) = read_font_style(&data, face_index) {
                self.faces
                    .entry((family.to_lowercase(), bold))
                    .or_insert_with(|| LibraryFace::Memory {
                        data: data.clone(),
                        face_index,
                    });
                first_family.get_or_insert(family);
            }
        }
        first_family.ok_or_else(|| Error::FontUnavailable("not a TrueType/OpenType font".into()))
    }

    /// Index every font file under `dir`, recursively. Files are memory-mapped
    /// for the scan and only read in full when a theme asks for them.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, Error> {
        let t0 = std::time::Instant::now();
        let root = dir.as_ref();
        std::fs::read_dir(root)?;

        let mut indexed = 0usize;
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
            paths.sort();

            for path in paths {
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                if !is_font_file(&path) {
                    continue;
                }
                let Ok(file) = std::fs::File::open(&path) else {
                    continue;
                };
                let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                    continue;
                };
                let face_count = if is_font_collection(&path) {
                    ttf_parser::fonts_in_collection(&data).unwrap_or(1)
                } else {
                    1
                };
                for face_index in 0..face_count {
                    if let Some((family, bold)) = read_font_style(&data, face_index) {
                        self.faces
                            .entry((family.to_lowercase(), bold))
                            .or_insert_with(|| LibraryFace::File {
                                path: path.clone(),
                                face_index,
                            });
                        indexed += 1;
                    }
                }
            }
        }

        log::info!(
            "Font scan of {}: {:.1}ms, {} faces indexed",
            root.display(),
            t0.elapsed().as_secs_f64() * 1000.0,
            indexed,
        );
        Ok(indexed)
    }

    pub fn families(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.faces.keys().map(|(f, _)| f.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    fn contains_family(&self, family: &str) -> bool {
        let key = family.to_lowercase();
        self.faces.contains_key(&(key.clone(), false)) || self.faces.contains_key(&(key, true))
    }

    /// Falls back to the regular face if the bold one is not available.
    fn load(&self, family: &str, bold: bool) -> Result<(Arc<[u8]>, u32), Error> {
        let key = family.to_lowercase();
        let face = self
            .faces
            .get(&(key.clone(), bold))
            .or_else(|| self.faces.get(&(key, false)))
            .ok_or_else(|| Error::FontUnavailable(family.to_string()))?;
        match face {
            LibraryFace::Memory { data, face_index } => Ok((data.clone(), *face_index)),
            LibraryFace::File { path, face_index } => {
                let data = std::fs::read(path)?;
                Ok((Arc::from(data), *face_index))
            }
        }
    }
}

fn font_family_name(face: &Face) -> Option<String> {
    // Name ID 1 (Family) keeps "Inter Display" apart from "Inter"; ID 16 would merge them.
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

fn read_font_style(data: &[u8], face_index: u32) -> Option<(String, bool)> {
    let face = Face::parse(data, face_index).ok()?;
    let family = font_family_name(&face)?;
    Some((family, face.is_bold()))
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn is_font_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttc"))
}

/// The faces used by one render, one per typography role. Built fresh per
/// render, so substitution warnings are emitted once per render.
pub struct FontBook {
    faces: Vec<FontFace>,
    by_role: HashMap<TextRole, FontId>,
}

impl FontBook {
    pub fn new(theme: &ThemeConfig, library: &FontLibrary) -> Self {
        let mut resolver = Resolver {
            library,
            theme,
            faces: Vec::new(),
            by_key: HashMap::new(),
            builtin_ids: HashMap::new(),
            warned: HashSet::new(),
        };
        let by_role = TextRole::ALL
            .iter()
            .map(|&role| (role, resolver.resolve(theme.typography.role(role))))
            .collect();
        FontBook {
            faces: resolver.faces,
            by_role,
        }
    }

    pub fn font_for(&self, role: TextRole) -> FontId {
        self.by_role.get(&role).copied().unwrap_or(FontId(0))
    }

    /// The face actually used for a font id: a PostScript name for builtin
    /// faces, the family name for library faces.
    pub fn face_name(&self, id: FontId) -> String {
        self.face(id).display_name()
    }

    pub fn text_width(&self, id: FontId, text: &str, font_size: f32) -> f32 {
        self.face(id).text_width(text, font_size)
    }

    pub(crate) fn face(&self, id: FontId) -> &FontFace {
        &self.faces[id.0.min(self.faces.len() - 1)]
    }
}

struct Resolver<'a> {
    library: &'a FontLibrary,
    theme: &'a ThemeConfig,
    faces: Vec<FontFace>,
    by_key: HashMap<(String, bool), FontId>,
    builtin_ids: HashMap<Builtin, FontId>,
    warned: HashSet<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, spec: &FontSpec) -> FontId {
        let bold = spec.weight == FontWeight::Bold;
        let key = (spec.font_family.to_lowercase(), bold);
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }

        let fallback = match spec.class {
            FontClass::Serif => self.theme.fallback_serif.clone(),
            FontClass::Sans => self.theme.fallback_sans.clone(),
        };
        let id = match self.load(&spec.font_family, bold) {
            Some(id) => id,
            None => {
                if self.warned.insert(spec.font_family.to_lowercase()) {
                    log::warn!(
                        "Font not available: {} ({:?}), substituting {}",
                        spec.font_family,
                        spec.class,
                        fallback
                    );
                }
                self.load(&fallback, bold).unwrap_or_else(|| {
                    if self.warned.insert(fallback.to_lowercase()) {
                        log::warn!("Fallback font not available: {fallback}, using Helvetica");
                    }
                    let builtin = if bold { Builtin::HelveticaBold } else { Builtin::Helvetica };
                    self.push_builtin(builtin)
                })
            }
        };
        self.by_key.insert(key, id);
        id
    }

    fn load(&mut self, family: &str, bold: bool) -> Option<FontId> {
        if self.library.contains_family(family) {
            let key = (family.to_lowercase(), bold);
            if let Some(&id) = self.by_key.get(&key) {
                return Some(id);
            }
            let face = self
                .library
                .load(family, bold)
                .ok()
                .and_then(|(data, index)| FontFace::truetype(family, data, index));
            match face {
                Some(face) => {
                    let id = FontId(self.faces.len());
                    self.faces.push(face);
                    self.by_key.insert(key, id);
                    return Some(id);
                }
                None => log::warn!("Font {family} is registered but could not be parsed"),
            }
        }
        Builtin::from_family(family, bold).map(|b| self.push_builtin(b))
    }

    fn push_builtin(&mut self, builtin: Builtin) -> FontId {
        if let Some(&id) = self.builtin_ids.get(&builtin) {
            return id;
        }
        let id = FontId(self.faces.len());
        self.faces.push(FontFace::builtin(builtin));
        self.builtin_ids.insert(builtin, id);
        id
    }
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes, dropping unmappable chars.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(char_to_winansi)
        .filter(|&b| b >= 32)
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

/// A face written into the output document.
pub(crate) struct EmbeddedFont {
    pub(crate) font_ref: Ref,
    /// Present for CID fonts; text is encoded as glyph ids instead of WinAnsi.
    pub(crate) char_to_gid: Option<BTreeMap<char, u16>>,
}

pub(crate) fn embed_face(
    pdf: &mut Pdf,
    face: &FontFace,
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> EmbeddedFont {
    let font_ref = alloc();
    let char_to_gid = match &face.source {
        FaceSource::Builtin(builtin) => {
            write_type1(pdf, font_ref, builtin.base_font());
            None
        }
        FaceSource::TrueType {
            family,
            data,
            face_index,
        } => {
            let embedded =
                embed_truetype(pdf, font_ref, family, data, *face_index, used_chars, alloc);
            if embedded.is_none() {
                log::warn!("Embedding {family} failed, writing Helvetica in its place");
                write_type1(pdf, font_ref, "Helvetica");
            }
            embedded
        }
    };
    EmbeddedFont {
        font_ref,
        char_to_gid,
    }
}

fn write_type1(pdf: &mut Pdf, font_ref: Ref, base_font: &str) {
    pdf.type1_font(font_ref)
        .base_font(Name(base_font.as_bytes()))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
}

const IDENTITY: pdf_writer::types::SystemInfo = pdf_writer::types::SystemInfo {
    registry: pdf_writer::Str(b"Adobe"),
    ordering: pdf_writer::Str(b"Identity"),
    supplement: 0,
};

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding.
/// The font data is subsetted to the glyphs used in the document.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    font_name: &str,
    font_data: &[u8],
    face_index: u32,
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<BTreeMap<char, u16>> {
    let face = Face::parse(font_data, face_index).ok()?;

    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = BTreeMap::new();
    let mut gid_widths: Vec<(u16, f32)> = Vec::new();
    for &ch in used_chars {
        if let Some(gid) = face.glyph_index(ch) {
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            let w = face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0);
            gid_widths.push((new_gid, w));
        }
    }
    gid_widths.sort_by_key(|&(gid, _)| gid);
    gid_widths.dedup_by_key(|&mut (gid, _)| gid);

    let subset_data = subsetter::subset(font_data, face_index, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {font_name}: {e}, embedding full font");
        font_data.to_vec()
    });

    let data_ref = alloc();
    let descriptor_ref = alloc();
    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    let ps_name = font_name.replace(' ', "");

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let cid_font_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(IDENTITY);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(Name(cmap_name.as_bytes()), IDENTITY);
    for (&ch, &gid) in &char_to_gid {
        cmap.pair(gid, ch);
    }
    pdf.stream(tounicode_ref, cmap.finish().as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(char_to_gid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_aliases_resolve_without_warnings() {
        let theme = ThemeConfig::classic();
        let book = FontBook::new(&theme, &FontLibrary::new());
        assert_eq!(book.face_name(book.font_for(TextRole::Body)), "Helvetica");
        assert_eq!(book.face_name(book.font_for(TextRole::Label)), "Helvetica-Bold");
        assert_eq!(book.face_name(book.font_for(TextRole::PageTitle)), "Times-Bold");
    }

    #[test]
    fn unknown_family_falls_back_by_class() {
        let mut theme = ThemeConfig::classic();
        theme.typography.body.font_family = "Garamond Pro".into();
        theme.typography.body.class = FontClass::Serif;
        theme.typography.page_title.font_family = "Futura".into();
        theme.typography.page_title.class = FontClass::Sans;
        let book = FontBook::new(&theme, &FontLibrary::new());
        assert_eq!(book.face_name(book.font_for(TextRole::Body)), "Times-Roman");
        assert_eq!(book.face_name(book.font_for(TextRole::PageTitle)), "Helvetica-Bold");
    }

    #[test]
    fn builtin_widths_match_afm() {
        let theme = ThemeConfig::classic();
        let book = FontBook::new(&theme, &FontLibrary::new());
        let body = book.font_for(TextRole::Body);
        // H=722, e=556, l=222, l=222, o=556 at 10pt
        assert!((book.text_width(body, "Hello", 10.0) - 22.78).abs() < 0.01);
        assert_eq!(book.text_width(body, "\u{4E2D}", 10.0), 0.0);
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        let mut library = FontLibrary::new();
        assert!(matches!(
            library.add_font(b"definitely not a font".to_vec()),
            Err(Error::FontUnavailable(_))
        ));
        assert!(library.families().is_empty());
    }
}
