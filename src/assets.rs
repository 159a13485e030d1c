//! Named image assets and the per-render resolver that validates and
//! deduplicates them before embedding.

use std::collections::HashMap;

use crate::error::Error;
use crate::model::ImageAsset;

/// In-memory image assets keyed by name. Loaded by the caller before rendering.
#[derive(Clone, Debug, Default)]
pub struct AssetStore {
    images: HashMap<String, ImageAsset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, asset: ImageAsset) {
        self.images.insert(name.into(), asset);
    }

    pub fn resolve(&self, name: &str) -> Result<&ImageAsset, Error> {
        self.images
            .get(name)
            .ok_or_else(|| Error::AssetMissing(name.to_string()))
    }
}

/// What an asset is used for decides what happens when it cannot be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetClass {
    /// Logos and illustrative photos: absence is not worth showing.
    Decorative,
    /// Signature images: a human reviewer must see that one exists.
    Signature,
}

pub const SIGNATURE_PLACEHOLDER: &str = "[Signature on file]";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingImagePolicy {
    Skip,
    Placeholder(&'static str),
}

impl AssetClass {
    pub fn on_missing(self) -> MissingImagePolicy {
        match self {
            AssetClass::Decorative => MissingImagePolicy::Skip,
            AssetClass::Signature => MissingImagePolicy::Placeholder(SIGNATURE_PLACEHOLDER),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JpegColor {
    Gray,
    Rgb,
    Cmyk,
}

pub(crate) enum ImageData {
    /// Passed through with DCTDecode.
    Jpeg { data: Vec<u8>, color: JpegColor },
    /// Decoded pixels, compressed at write time.
    Raw { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

pub(crate) struct ResolvedImage {
    pub(crate) data: ImageData,
    pub(crate) pixel_width: u32,
    pub(crate) pixel_height: u32,
}

impl ResolvedImage {
    pub(crate) fn aspect_ratio(&self) -> f32 {
        self.pixel_height as f32 / self.pixel_width as f32
    }
}

/// Resolves and validates images for one render. Each asset is decoded once.
pub(crate) struct AssetResolver<'a> {
    store: &'a AssetStore,
    images: Vec<ResolvedImage>,
    by_key: HashMap<String, ImageId>,
}

impl<'a> AssetResolver<'a> {
    pub(crate) fn new(store: &'a AssetStore) -> Self {
        Self {
            store,
            images: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    pub(crate) fn resolve_named(&mut self, name: &str) -> Result<ImageId, Error> {
        if let Some(&id) = self.by_key.get(name) {
            return Ok(id);
        }
        let asset = self.store.resolve(name)?;
        let image = decode(name, asset)?;
        Ok(self.push(name.to_string(), image))
    }

    /// Resolve an image carried inline (signature images). `key` identifies
    /// it for deduplication within this render.
    pub(crate) fn resolve_inline(&mut self, key: &str, asset: &ImageAsset) -> Result<ImageId, Error> {
        let key = format!("inline:{key}");
        if let Some(&id) = self.by_key.get(&key) {
            return Ok(id);
        }
        let image = decode(&key, asset)?;
        Ok(self.push(key, image))
    }

    pub(crate) fn get(&self, id: ImageId) -> &ResolvedImage {
        &self.images[id.0]
    }

    pub(crate) fn into_images(self) -> Vec<ResolvedImage> {
        self.images
    }

    fn push(&mut self, key: String, image: ResolvedImage) -> ImageId {
        let id = ImageId(self.images.len());
        self.images.push(image);
        self.by_key.insert(key, id);
        id
    }
}

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

fn decode(name: &str, asset: &ImageAsset) -> Result<ResolvedImage, Error> {
    let malformed = |reason: &str| Error::AssetMalformed {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if asset.data.starts_with(JPEG_MAGIC) {
        let header = jpeg_header(&asset.data).ok_or_else(|| malformed("no JPEG frame header"))?;
        return Ok(ResolvedImage {
            data: ImageData::Jpeg {
                data: asset.data.clone(),
                color: header.color,
            },
            pixel_width: header.width,
            pixel_height: header.height,
        });
    }

    if asset.data.starts_with(PNG_MAGIC) {
        let cursor = std::io::Cursor::new(&asset.data);
        let reader =
            image::ImageReader::with_format(std::io::BufReader::new(cursor), image::ImageFormat::Png);
        let decoded = reader.decode().map_err(|e| malformed(&e.to_string()))?;
        let rgba: image::RgbaImage = decoded.to_rgba8();
        let (w, h) = (rgba.width(), rgba.height());
        if w == 0 || h == 0 {
            return Err(malformed("zero-sized image"));
        }
        let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
        let rgb: Vec<u8> = rgba
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();
        let alpha = has_alpha.then(|| rgba.pixels().map(|p| p.0[3]).collect());
        if (w, h) != (asset.pixel_width, asset.pixel_height) {
            log::debug!(
                "Asset {name}: declared {}x{}, decoded {w}x{h}",
                asset.pixel_width,
                asset.pixel_height
            );
        }
        return Ok(ResolvedImage {
            data: ImageData::Raw { rgb, alpha },
            pixel_width: w,
            pixel_height: h,
        });
    }

    Err(malformed("not a PNG or JPEG image"))
}

struct JpegHeader {
    width: u32,
    height: u32,
    color: JpegColor,
}

/// Walk JPEG markers up to the first start-of-frame segment.
fn jpeg_header(data: &[u8]) -> Option<JpegHeader> {
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let seg = data.get(i + 4..i + 2 + len)?;
            if seg.len() < 6 {
                return None;
            }
            let height = u16::from_be_bytes([seg[1], seg[2]]) as u32;
            let width = u16::from_be_bytes([seg[3], seg[4]]) as u32;
            let color = match seg[5] {
                1 => JpegColor::Gray,
                3 => JpegColor::Rgb,
                4 => JpegColor::Cmyk,
                _ => return None,
            };
            if width == 0 || height == 0 {
                return None;
            }
            return Some(JpegHeader {
                width,
                height,
                color,
            });
        }
        i += 2 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(data: Vec<u8>) -> ImageAsset {
        ImageAsset {
            data,
            pixel_width: 10,
            pixel_height: 10,
        }
    }

    #[test]
    fn missing_asset_is_reported_by_name() {
        let store = AssetStore::new();
        let mut resolver = AssetResolver::new(&store);
        match resolver.resolve_named("logo") {
            Err(Error::AssetMissing(name)) => assert_eq!(name, "logo"),
            _ => panic!("expected AssetMissing"),
        }
    }

    #[test]
    fn non_image_bytes_are_malformed() {
        let mut store = AssetStore::new();
        store.insert("sig", asset(b"%PDF-1.7 not an image".to_vec()));
        let mut resolver = AssetResolver::new(&store);
        assert!(matches!(
            resolver.resolve_named("sig"),
            Err(Error::AssetMalformed { .. })
        ));
    }

    #[test]
    fn truncated_png_is_malformed() {
        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(&[0, 0, 0, 13]);
        let store = AssetStore::new();
        let mut resolver = AssetResolver::new(&store);
        assert!(resolver.resolve_inline("client", &asset(data)).is_err());
    }

    #[test]
    fn jpeg_frame_header_is_read() {
        // SOI, APP0 (len 4), SOF0 (len 11): 8-bit, 20 tall, 30 wide, 3 components
        let data = vec![
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00,
            0x14, 0x00, 0x1E, 0x03, 0x01, 0x11, 0x00,
        ];
        let header = jpeg_header(&data).unwrap();
        assert_eq!((header.width, header.height), (30, 20));
        assert_eq!(header.color, JpegColor::Rgb);
    }

    #[test]
    fn policies_follow_asset_class() {
        assert_eq!(AssetClass::Decorative.on_missing(), MissingImagePolicy::Skip);
        assert_eq!(
            AssetClass::Signature.on_missing(),
            MissingImagePolicy::Placeholder("[Signature on file]")
        );
    }
}
