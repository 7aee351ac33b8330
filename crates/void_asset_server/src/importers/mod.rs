//! Built-in importers for the common asset types

mod atlas;
mod audio;
mod shader;
mod texture;

pub use atlas::{AtlasDefinition, AtlasFrame, CookedAtlas, SpriteAtlasImporter};
pub use audio::{AudioFormat, AudioImporter, AudioInfo};
pub use shader::{ShaderAsset, ShaderEntryPoint, ShaderImporter, ShaderSettings, ShaderStage};
pub use texture::{TextureAsset, TextureImporter, TextureSettings};

use std::path::Path;

use void_asset::{normalize_source_path, AssetId, AssetImporterManager, AssetResult, ImportContext};

/// Register the texture, shader, audio and sprite atlas importers
pub fn register_builtin_importers(manager: &mut AssetImporterManager) -> AssetResult<()> {
    manager.register_importer(TextureImporter::default())?;
    manager.register_importer(ShaderImporter)?;
    manager.register_importer(AudioImporter)?;
    manager.register_importer(SpriteAtlasImporter)?;
    Ok(())
}

/// A manager with every built-in importer registered
pub fn builtin_manager() -> AssetImporterManager {
    let mut manager = AssetImporterManager::new();
    if let Err(e) = register_builtin_importers(&mut manager) {
        // Only reachable if the built-in extension tables overlap.
        log::error!("Failed to register built-in importers: {}", e);
    }
    manager
}

/// Resolve a path written inside a source file to a registry key.
///
/// `reference` is tried relative to the referencing file's directory first,
/// then relative to the source root. Candidates that climb out of the source
/// directory are skipped.
pub(crate) fn resolve_reference(ctx: &ImportContext<'_>, reference: &str) -> Option<(String, AssetId)> {
    let reference = reference.trim().replace('\\', "/");
    let dir = Path::new(&ctx.metadata.source_path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut candidates = Vec::with_capacity(2);
    if !dir.is_empty() {
        candidates.push(format!("{}/{}", dir, reference));
    }
    candidates.push(reference);

    candidates
        .iter()
        .filter_map(|candidate| normalize_source_path(candidate))
        .find_map(|key| ctx.resolve(&key).map(|id| (key, id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_manager_covers_all_types() {
        let manager = builtin_manager();
        assert_eq!(manager.importer_count(), 4);
        for ext in ["png", "wgsl", "wav", "atlas"] {
            assert!(manager.supports_extension(ext), "missing .{}", ext);
        }
    }
}
