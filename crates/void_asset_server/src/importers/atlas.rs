//! Sprite atlas importer
//!
//! An `.atlas` file is JSON naming one image and the frames cut out of it:
//!
//! ```json
//! { "image": "ui.png", "frames": [ { "name": "button", "x": 0, "y": 0, "w": 32, "h": 16 } ] }
//! ```
//!
//! The image path is resolved against the atlas file's directory, then the
//! source root. It must be a registered asset and becomes the atlas's only
//! dependency, so `import_all_with_dependents` and the hot-reload loop
//! reimport the atlas when its sheet is repainted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use void_asset::{AssetError, AssetId, AssetImporter, AssetResult, AssetType, ImportContext, ImportResult};

use super::resolve_reference;

/// One named rectangle inside the atlas image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasFrame {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Authored atlas description
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasDefinition {
    /// Image path as written
    pub image: String,
    #[serde(default)]
    pub frames: Vec<AtlasFrame>,
}

impl AtlasDefinition {
    /// Parse and check frame names and sizes
    pub fn parse(data: &[u8], path: &str) -> AssetResult<Self> {
        let def: Self = serde_json::from_slice(data)
            .map_err(|e| AssetError::ImportFailed(format!("Invalid atlas {}: {}", path, e)))?;

        if def.image.trim().is_empty() {
            return Err(AssetError::ImportFailed(format!("Atlas {} names no image", path)));
        }

        let mut names = HashSet::new();
        for frame in &def.frames {
            if frame.name.is_empty() {
                return Err(AssetError::ImportFailed(format!("Atlas {} has an unnamed frame", path)));
            }
            if !names.insert(frame.name.as_str()) {
                return Err(AssetError::ImportFailed(format!(
                    "Atlas {} has duplicate frame '{}'",
                    path, frame.name
                )));
            }
            if frame.w == 0 || frame.h == 0 {
                return Err(AssetError::ImportFailed(format!(
                    "Frame '{}' in {} has zero size",
                    frame.name, path
                )));
            }
        }
        Ok(def)
    }

    /// Fail if any frame extends past a `width` x `height` image
    pub fn check_bounds(&self, width: u32, height: u32) -> AssetResult<()> {
        let outside = self.frames.iter().find(|f| {
            f.x.checked_add(f.w).map_or(true, |right| right > width)
                || f.y.checked_add(f.h).map_or(true, |bottom| bottom > height)
        });
        match outside {
            Some(frame) => Err(AssetError::ImportFailed(format!(
                "Frame '{}' lies outside the {}x{} image",
                frame.name, width, height
            ))),
            None => Ok(()),
        }
    }
}

/// Cooked atlas written as JSON
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookedAtlas {
    /// Asset id of the atlas image
    pub image: AssetId,
    /// Registry key of the atlas image
    pub image_path: String,
    /// Image size, when it could be read
    pub image_size: Option<(u32, u32)>,
    pub frames: Vec<AtlasFrame>,
}

/// Importer for `.atlas` files
pub struct SpriteAtlasImporter;

impl SpriteAtlasImporter {
    fn cook(&self, ctx: &mut ImportContext<'_>) -> AssetResult<String> {
        let data = ctx.read_source()?;
        let def = AtlasDefinition::parse(&data, &ctx.metadata.source_path)?;

        let (image_path, image) = resolve_reference(ctx, &def.image).ok_or_else(|| {
            AssetError::ImportFailed(format!(
                "Atlas {} references unregistered image '{}'",
                ctx.metadata.source_path, def.image
            ))
        })?;

        let image_size = match image::image_dimensions(ctx.registry.config().source_file(&image_path)) {
            Ok((w, h)) => {
                def.check_bounds(w, h)?;
                Some((w, h))
            }
            Err(e) => {
                log::debug!("Skipping bounds check for {}: {}", image_path, e);
                None
            }
        };

        ctx.track_dependencies();
        ctx.add_dependency(image);

        let cooked = CookedAtlas {
            image,
            image_path,
            image_size,
            frames: def.frames,
        };
        ctx.write_artifact("atlas.json", &serde_json::to_vec_pretty(&cooked)?)
    }
}

impl AssetImporter for SpriteAtlasImporter {
    fn asset_type(&self) -> AssetType {
        AssetType::SpriteAtlas
    }

    fn supported_extensions(&self) -> &[&str] {
        &["atlas"]
    }

    fn import(&self, ctx: &mut ImportContext<'_>) -> ImportResult {
        self.cook(ctx).into()
    }

    fn name(&self) -> &str {
        "sprite atlas"
    }
}
