//! Texture importer for PNG, JPG, BMP and TGA images
//!
//! Cooks an image into a `VTEX` artifact: a small little-endian header followed
//! by RGBA8 pixels and an optional mip chain.
//!
//! ```text
//! "VTEX" | version u32 | width u32 | height u32 | flags u32 | mip_count u32
//! base_len u64 | base bytes | (mip_len u64 | mip bytes) * mip_count
//! ```

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use void_asset::{AssetError, AssetImporter, AssetResult, AssetType, ImportContext, ImportResult};

const MAGIC: &[u8; 4] = b"VTEX";
const VERSION: u32 = 1;
const FLAG_SRGB: u32 = 1;

/// Texture data ready for GPU upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureAsset {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes per row (width * 4 for RGBA)
    pub bytes_per_row: u32,
    /// Whether texture uses sRGB color space
    pub srgb: bool,
    /// Mipmap levels below the base level
    pub mips: Vec<Vec<u8>>,
}

impl TextureAsset {
    /// Encode as a `VTEX` artifact
    pub fn to_bytes(&self) -> Vec<u8> {
        let mip_bytes: usize = self.mips.iter().map(|m| m.len() + 8).sum();
        let mut out = Vec::with_capacity(32 + self.data.len() + mip_bytes);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        let flags = if self.srgb { FLAG_SRGB } else { 0 };
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&(self.mips.len() as u32).to_le_bytes());
        for level in std::iter::once(&self.data).chain(self.mips.iter()) {
            out.extend_from_slice(&(level.len() as u64).to_le_bytes());
            out.extend_from_slice(level);
        }
        out
    }

    /// Decode a `VTEX` artifact
    pub fn from_bytes(bytes: &[u8]) -> AssetResult<Self> {
        let mut reader = ByteReader { bytes, pos: 0 };
        if reader.take(4)? != MAGIC {
            return Err(AssetError::ImportFailed("not a VTEX artifact".into()));
        }
        let version = reader.u32()?;
        if version != VERSION {
            return Err(AssetError::ImportFailed(format!("unsupported VTEX version {}", version)));
        }
        let width = reader.u32()?;
        let height = reader.u32()?;
        let bytes_per_row = width
            .checked_mul(4)
            .ok_or_else(|| AssetError::ImportFailed(format!("VTEX width {} is too large", width)))?;
        let flags = reader.u32()?;
        let mip_count = reader.u32()?;
        let data = reader.level()?;
        let mips = (0..mip_count)
            .map(|_| reader.level())
            .collect::<AssetResult<Vec<_>>>()?;

        Ok(Self {
            data,
            width,
            height,
            bytes_per_row,
            srgb: flags & FLAG_SRGB != 0,
            mips,
        })
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> AssetResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| AssetError::ImportFailed("truncated VTEX artifact".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> AssetResult<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn level(&mut self) -> AssetResult<Vec<u8>> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        let len = u64::from_le_bytes(buf) as usize;
        Ok(self.take(len)?.to_vec())
    }
}

/// Per-asset texture settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextureSettings {
    /// Interpret as sRGB
    pub srgb: bool,
    /// Generate mipmaps on import
    pub generate_mips: bool,
    /// Downscale so neither side exceeds this (0 = keep size)
    pub max_size: u32,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            srgb: true,
            generate_mips: false,
            max_size: 0,
        }
    }
}

/// Importer for image textures
#[derive(Default)]
pub struct TextureImporter {
    /// Settings used for assets without their own
    pub defaults: TextureSettings,
}

impl TextureImporter {
    /// Decode image bytes into a texture
    pub fn decode(data: &[u8], path: &str, settings: &TextureSettings) -> AssetResult<TextureAsset> {
        let mut img = image::load_from_memory(data)
            .map_err(|e| AssetError::ImportFailed(format!("Failed to decode image {}: {}", path, e)))?;

        let (w, h) = img.dimensions();
        if settings.max_size > 0 && (w > settings.max_size || h > settings.max_size) {
            img = img.resize(
                settings.max_size,
                settings.max_size,
                image::imageops::FilterType::Lanczos3,
            );
        }

        let mips = if settings.generate_mips {
            Self::generate_mip_chain(&img)
        } else {
            vec![]
        };

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TextureAsset {
            data: rgba.into_raw(),
            width,
            height,
            bytes_per_row: width * 4,
            srgb: settings.srgb,
            mips,
        })
    }

    /// Generate mipmap chain from image
    fn generate_mip_chain(img: &DynamicImage) -> Vec<Vec<u8>> {
        let mut mips = Vec::new();
        let (mut w, mut h) = img.dimensions();
        let mut current = img.clone();

        while w > 1 || h > 1 {
            w = (w / 2).max(1);
            h = (h / 2).max(1);

            current = current.resize_exact(w, h, image::imageops::FilterType::Lanczos3);
            mips.push(current.to_rgba8().into_raw());
        }

        mips
    }

    fn cook(&self, ctx: &ImportContext<'_>) -> AssetResult<String> {
        let settings: TextureSettings = ctx.settings()?;
        let data = ctx.read_source()?;
        let texture = Self::decode(&data, &ctx.metadata.source_path, &settings)?;
        log::debug!(
            "Cooked texture {} ({}x{}, {} mips)",
            ctx.metadata.source_path,
            texture.width,
            texture.height,
            texture.mips.len()
        );
        ctx.write_artifact("vtex", &texture.to_bytes())
    }
}

impl AssetImporter for TextureImporter {
    fn asset_type(&self) -> AssetType {
        AssetType::Texture
    }

    fn supported_extensions(&self) -> &[&str] {
        &["png", "jpg", "jpeg", "bmp", "tga"]
    }

    fn import(&self, ctx: &mut ImportContext<'_>) -> ImportResult {
        self.cook(ctx).into()
    }

    fn default_settings(&self) -> String {
        serde_json::to_string(&self.defaults).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let texture = TextureImporter::decode(&png_bytes(4, 2), "a.png", &TextureSettings::default()).unwrap();
        assert_eq!((texture.width, texture.height), (4, 2));
        assert_eq!(texture.bytes_per_row, 16);
        assert_eq!(&texture.data[..4], &[255, 0, 0, 255]);
        assert!(texture.mips.is_empty());
    }

    #[test]
    fn test_mips_and_max_size() {
        let settings = TextureSettings {
            srgb: false,
            generate_mips: true,
            max_size: 4,
        };
        let texture = TextureImporter::decode(&png_bytes(8, 8), "a.png", &settings).unwrap();
        assert_eq!((texture.width, texture.height), (4, 4));
        assert_eq!(texture.mips.len(), 2);
        assert_eq!(texture.mips[1].len(), 4);
        assert!(!texture.srgb);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = TextureImporter::decode(b"not an image", "bad.png", &TextureSettings::default());
        assert!(matches!(err, Err(AssetError::ImportFailed(_))));
    }

    #[test]
    fn test_artifact_layout() {
        let texture = TextureImporter::decode(&png_bytes(2, 2), "a.png", &TextureSettings {
            generate_mips: true,
            ..TextureSettings::default()
        })
        .unwrap();
        let bytes = texture.to_bytes();
        assert_eq!(&bytes[..4], b"VTEX");
        assert_eq!(TextureAsset::from_bytes(&bytes).unwrap(), texture);
        assert!(TextureAsset::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_oversized_width_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"VTEX");
        for field in [VERSION, u32::MAX / 4 + 1, 1, 0, 0] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes.extend_from_slice(&0u64.to_le_bytes());

        let err = TextureAsset::from_bytes(&bytes);
        assert!(matches!(err, Err(AssetError::ImportFailed(ref msg)) if msg.contains("too large")));
    }
}
