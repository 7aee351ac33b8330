//! Import Coordinator
//!
//! The [`AssetImporterManager`] owns the registered importers and drives them:
//! it asks the registry which assets are stale, resolves an importer by asset
//! type, runs it, and on success writes the result back into the registry.
//!
//! ```text
//! AssetRegistry::get_assets_needing_reimport()
//!        │
//!        ▼
//! AssetType ──► importers[type] ──► import(ImportContext) ──► ImportResult
//!                                                               │ success
//!                                                               ▼
//!                                     registry.mark_as_imported + dependencies
//! ```
//!
//! Extensions map to an [`AssetType`], never to an importer directly; the
//! type-keyed map is the single owner of every importer.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{AssetError, AssetResult};
use crate::id::AssetId;
use crate::importer::{AssetImporter, ImportContext, ImportResult};
use crate::metadata::{AssetMetadata, AssetType};
use crate::registry::AssetRegistry;

/// Progress callback: `(current, total, source_path)`
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize, &str);

/// Summary of a batch import
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Assets imported successfully
    pub succeeded: Vec<AssetId>,
    /// Assets that failed, with their error
    pub failed: Vec<(AssetId, String)>,
}

impl ImportReport {
    /// Number of assets attempted
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Registry of importers and driver of the import step
#[derive(Default)]
pub struct AssetImporterManager {
    /// Importers by asset type (owning)
    importers: HashMap<AssetType, Box<dyn AssetImporter>>,
    /// Extension -> asset type
    extensions: HashMap<String, AssetType>,
}

impl AssetImporterManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an importer.
    ///
    /// Fails without changing anything if an importer for the same type is
    /// already registered or one of its extensions is claimed by another type.
    pub fn register_importer<I: AssetImporter + 'static>(&mut self, importer: I) -> AssetResult<()> {
        self.register_boxed(Box::new(importer))
    }

    /// Register a boxed importer (see [`register_importer`](Self::register_importer))
    pub fn register_boxed(&mut self, importer: Box<dyn AssetImporter>) -> AssetResult<()> {
        let asset_type = importer.asset_type();
        if self.importers.contains_key(&asset_type) {
            return Err(AssetError::TypeConflict(asset_type));
        }
        for ext in importer.supported_extensions() {
            let ext = ext.to_ascii_lowercase();
            if let Some(&existing) = self.extensions.get(&ext) {
                return Err(AssetError::ExtensionConflict {
                    extension: ext,
                    existing,
                });
            }
        }
        self.install(importer);
        Ok(())
    }

    /// Register an importer, replacing whatever handled its type or extensions.
    ///
    /// Returns the importer previously registered for the same type.
    pub fn replace_importer<I: AssetImporter + 'static>(
        &mut self,
        importer: I,
    ) -> Option<Box<dyn AssetImporter>> {
        let asset_type = importer.asset_type();
        let previous = self.importers.remove(&asset_type);
        self.extensions.retain(|_, ty| *ty != asset_type);
        for ext in importer.supported_extensions() {
            if let Some(old) = self.extensions.remove(&ext.to_ascii_lowercase()) {
                log::info!("Extension '.{}' moves from {} to {}", ext, old, asset_type);
            }
        }
        self.install(Box::new(importer));
        previous
    }

    fn install(&mut self, importer: Box<dyn AssetImporter>) {
        let asset_type = importer.asset_type();
        for ext in importer.supported_extensions() {
            self.extensions.insert(ext.to_ascii_lowercase(), asset_type);
        }
        log::info!(
            "Registered {} importer for [{}]",
            importer.name(),
            importer.supported_extensions().join(", ")
        );
        self.importers.insert(asset_type, importer);
    }

    /// Importer for an asset type
    pub fn importer_for_type(&self, asset_type: AssetType) -> Option<&dyn AssetImporter> {
        self.importers.get(&asset_type).map(|b| b.as_ref())
    }

    /// Importer for a file extension (case-insensitive)
    pub fn importer_for_extension(&self, ext: &str) -> Option<&dyn AssetImporter> {
        let asset_type = self.extensions.get(&ext.to_ascii_lowercase())?;
        self.importer_for_type(*asset_type)
    }

    /// Check if an extension is handled
    pub fn supports_extension(&self, ext: &str) -> bool {
        self.extensions.contains_key(&ext.to_ascii_lowercase())
    }

    /// Every handled extension, sorted
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extensions.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    /// Default settings of the importer for `asset_type`
    pub fn default_settings_for(&self, asset_type: AssetType) -> Option<String> {
        self.importer_for_type(asset_type).map(|i| i.default_settings())
    }

    /// Number of registered importers
    pub fn importer_count(&self) -> usize {
        self.importers.len()
    }

    /// Import one asset.
    ///
    /// On success the registry records the artifact path, the import time and
    /// any dependencies the importer reported. On failure the registry is not
    /// touched.
    pub fn import_asset(&self, registry: &mut AssetRegistry, id: AssetId) -> ImportResult {
        let Some(meta) = registry.get_metadata(id) else {
            return AssetError::NotFound(id.to_string()).into();
        };
        let Some(importer) = self.importer_for_type(meta.asset_type) else {
            let result: ImportResult = AssetError::NoImporterForType(meta.asset_type).into();
            log::warn!("Cannot import {}: {}", meta.source_path, result.error);
            return result;
        };

        let source_path = meta.source_path.clone();
        let settings = if meta.import_settings.trim().is_empty() {
            importer.default_settings()
        } else {
            meta.import_settings.clone()
        };

        let mut ctx = ImportContext::new(registry, meta, settings);
        let result = panic::catch_unwind(AssertUnwindSafe(|| importer.import(&mut ctx)))
            .unwrap_or_else(|payload| {
                ImportResult::fail(format!("{} importer panicked: {}", importer.name(), panic_message(&payload)))
            });
        let dependencies = ctx.take_dependencies();

        if !result.success {
            log::warn!("Failed to import {}: {}", source_path, result.error);
            return result;
        }

        registry.mark_as_imported(id, &result.imported_path);
        if let Some(deps) = dependencies {
            registry.set_dependencies(id, deps);
        }
        log::debug!("Imported {} -> {}", source_path, result.imported_path);
        result
    }

    /// Import every asset the registry reports as stale.
    ///
    /// Failures are logged and skipped, never retried within the call.
    /// Returns the number of successful imports.
    pub fn import_all(&self, registry: &mut AssetRegistry, progress: Option<ProgressFn<'_>>) -> usize {
        self.import_all_report(registry, progress).succeeded.len()
    }

    /// Like [`import_all`](Self::import_all), returning the full report
    pub fn import_all_report(
        &self,
        registry: &mut AssetRegistry,
        progress: Option<ProgressFn<'_>>,
    ) -> ImportReport {
        let ids = registry.get_assets_needing_reimport();
        self.import_batch(registry, ids, progress)
    }

    /// Import every stale asset and everything that transitively depends on
    /// one, dependencies first.
    ///
    /// Dependents are reimported even when their own source is unchanged, so
    /// a repainted sheet refreshes the atlases cut from it.
    pub fn import_all_with_dependents(
        &self,
        registry: &mut AssetRegistry,
        progress: Option<ProgressFn<'_>>,
    ) -> ImportReport {
        let stale = registry.get_assets_needing_reimport();
        let ids = registry.with_transitive_dependents(&stale);
        self.import_batch(registry, ids, progress)
    }

    /// Import the stale assets whose metadata matches `predicate`
    pub fn import_where(
        &self,
        registry: &mut AssetRegistry,
        predicate: impl Fn(&AssetMetadata) -> bool,
        progress: Option<ProgressFn<'_>>,
    ) -> usize {
        let ids: Vec<AssetId> = registry
            .get_assets_needing_reimport()
            .into_iter()
            .filter(|id| registry.get_metadata(*id).map(&predicate).unwrap_or(false))
            .collect();
        self.import_batch(registry, ids, progress).succeeded.len()
    }

    /// Import a fixed list of assets, stale or not
    pub fn import_batch(
        &self,
        registry: &mut AssetRegistry,
        ids: Vec<AssetId>,
        mut progress: Option<ProgressFn<'_>>,
    ) -> ImportReport {
        let total = ids.len();
        let mut report = ImportReport::default();

        for (index, id) in ids.into_iter().enumerate() {
            if let Some(cb) = progress.as_mut() {
                let path = registry
                    .get_metadata(id)
                    .map(|m| m.source_path.as_str())
                    .unwrap_or("");
                cb(index + 1, total, path);
            }

            let result = self.import_asset(registry, id);
            if result.success {
                report.succeeded.push(id);
            } else {
                report.failed.push((id, result.error));
            }
        }

        if total > 0 {
            log::info!(
                "Imported {}/{} assets ({} failed)",
                report.succeeded.len(),
                total,
                report.failed.len()
            );
        }
        report
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct FixedImporter {
        asset_type: AssetType,
        extensions: &'static [&'static str],
        output: &'static str,
    }

    impl AssetImporter for FixedImporter {
        fn asset_type(&self) -> AssetType {
            self.asset_type
        }

        fn supported_extensions(&self) -> &[&str] {
            self.extensions
        }

        fn import(&self, _ctx: &mut ImportContext<'_>) -> ImportResult {
            ImportResult::ok(self.output)
        }
    }

    struct FailingImporter;

    impl AssetImporter for FailingImporter {
        fn asset_type(&self) -> AssetType {
            AssetType::Audio
        }

        fn supported_extensions(&self) -> &[&str] {
            &["wav"]
        }

        fn import(&self, _ctx: &mut ImportContext<'_>) -> ImportResult {
            ImportResult::fail("unsupported sample format")
        }
    }

    struct PanickingImporter;

    impl AssetImporter for PanickingImporter {
        fn asset_type(&self) -> AssetType {
            AssetType::Shader
        }

        fn supported_extensions(&self) -> &[&str] {
            &["wgsl"]
        }

        fn import(&self, _ctx: &mut ImportContext<'_>) -> ImportResult {
            panic!("codec exploded");
        }
    }

    struct LinkingImporter;

    impl AssetImporter for LinkingImporter {
        fn asset_type(&self) -> AssetType {
            AssetType::SpriteAtlas
        }

        fn supported_extensions(&self) -> &[&str] {
            &["atlas"]
        }

        fn import(&self, ctx: &mut ImportContext<'_>) -> ImportResult {
            ctx.track_dependencies();
            if let Some(id) = ctx.resolve("sheet.png") {
                ctx.add_dependency(id);
            }
            ImportResult::ok("atlas.bin")
        }
    }

    fn texture_importer() -> FixedImporter {
        FixedImporter {
            asset_type: AssetType::Texture,
            extensions: &["png", "jpg"],
            output: "a.bin",
        }
    }

    fn project(files: &[&str]) -> (TempDir, AssetRegistry) {
        let dir = tempdir().unwrap();
        for rel in files {
            let path = dir.path().join("assets").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, rel.as_bytes()).unwrap();
        }
        let registry = AssetRegistry::new(dir.path());
        (dir, registry)
    }

    #[test]
    fn test_register_indexes_by_type_and_extension() {
        let mut manager = AssetImporterManager::new();
        manager.register_importer(texture_importer()).unwrap();

        assert!(manager.supports_extension("PNG"));
        assert_eq!(
            manager.importer_for_extension("jpg").map(|i| i.asset_type()),
            Some(AssetType::Texture)
        );
        assert!(manager.importer_for_type(AssetType::Audio).is_none());
        assert_eq!(manager.supported_extensions(), vec!["jpg", "png"]);
        assert_eq!(manager.default_settings_for(AssetType::Texture).as_deref(), Some("{}"));
    }

    #[test]
    fn test_conflicting_registration_is_rejected() {
        let mut manager = AssetImporterManager::new();
        manager.register_importer(texture_importer()).unwrap();

        let err = manager.register_importer(texture_importer()).unwrap_err();
        assert!(matches!(err, AssetError::TypeConflict(AssetType::Texture)));

        let err = manager
            .register_importer(FixedImporter {
                asset_type: AssetType::SpriteAtlas,
                extensions: &["atlas", "png"],
                output: "x",
            })
            .unwrap_err();
        assert!(matches!(err, AssetError::ExtensionConflict { ref extension, existing: AssetType::Texture } if extension == "png"));
        assert!(!manager.supports_extension("atlas"));
    }

    #[test]
    fn test_replace_importer_takes_over_extensions() {
        let mut manager = AssetImporterManager::new();
        manager.register_importer(texture_importer()).unwrap();
        let previous = manager.replace_importer(FixedImporter {
            asset_type: AssetType::SpriteAtlas,
            extensions: &["png"],
            output: "x",
        });
        assert!(previous.is_none());
        assert_eq!(
            manager.importer_for_extension("png").map(|i| i.asset_type()),
            Some(AssetType::SpriteAtlas)
        );
        assert!(manager.supports_extension("jpg"));
    }

    #[test]
    fn test_successful_import_marks_registry() {
        let (_dir, mut registry) = project(&["textures/a.png"]);
        let id = registry.register_asset("textures/a.png", AssetType::Texture);
        let mut manager = AssetImporterManager::new();
        manager.register_importer(texture_importer()).unwrap();

        let result = manager.import_asset(&mut registry, id);
        assert!(result.is_success());
        assert_eq!(registry.get_metadata(id).unwrap().imported_path, "a.bin");
        assert!(!registry.get_assets_needing_reimport().contains(&id));
    }

    #[test]
    fn test_failed_import_leaves_registry_untouched() {
        let (_dir, mut registry) = project(&["a.wav", "b.wgsl"]);
        let wav = registry.register_asset("a.wav", AssetType::Audio);
        let wgsl = registry.register_asset("b.wgsl", AssetType::Shader);
        let before = registry.get_metadata(wav).cloned();

        let mut manager = AssetImporterManager::new();
        manager.register_importer(FailingImporter).unwrap();
        manager.register_importer(PanickingImporter).unwrap();

        let result = manager.import_asset(&mut registry, wav);
        assert!(!result.success);
        assert_eq!(result.error, "unsupported sample format");
        assert_eq!(registry.get_metadata(wav).cloned(), before);

        let result = manager.import_asset(&mut registry, wgsl);
        assert!(!result.success);
        assert!(result.error.contains("codec exploded"));
        assert!(!registry.get_metadata(wgsl).unwrap().is_imported());
    }

    #[test]
    fn test_missing_importer_and_unknown_id() {
        let (_dir, mut registry) = project(&["a.png"]);
        let id = registry.register_asset("a.png", AssetType::Texture);
        let manager = AssetImporterManager::new();

        let result = manager.import_asset(&mut registry, id);
        assert!(!result.success);
        assert!(result.error.contains("texture"));
        assert!(!manager.import_asset(&mut registry, AssetId::new()).success);
    }

    #[test]
    fn test_import_all_reports_progress_and_skips_failures() {
        let (_dir, mut registry) = project(&["a.png", "b.png", "c.wav"]);
        registry.register_asset("a.png", AssetType::Texture);
        registry.register_asset("b.png", AssetType::Texture);
        let wav = registry.register_asset("c.wav", AssetType::Audio);

        let mut manager = AssetImporterManager::new();
        manager.register_importer(texture_importer()).unwrap();
        manager.register_importer(FailingImporter).unwrap();

        let calls = Cell::new(0);
        let mut seen = Vec::new();
        let mut progress = |current: usize, total: usize, path: &str| {
            calls.set(calls.get() + 1);
            seen.push((current, total, path.to_string()));
        };
        let report = manager.import_all_report(&mut registry, Some(&mut progress));

        assert_eq!(calls.get(), 3);
        assert_eq!(seen[0], (1, 3, "a.png".to_string()));
        assert_eq!(seen[2], (3, 3, "c.wav".to_string()));
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, wav);
        assert_eq!(registry.get_assets_needing_reimport(), vec![wav]);
        assert_eq!(manager.import_all(&mut registry, None), 0);
    }

    #[test]
    fn test_import_where_filters() {
        let (_dir, mut registry) = project(&["a.png", "b.wav"]);
        let png = registry.register_asset("a.png", AssetType::Texture);
        let wav = registry.register_asset("b.wav", AssetType::Audio);

        let mut manager = AssetImporterManager::new();
        manager.register_importer(texture_importer()).unwrap();
        manager.register_importer(FailingImporter).unwrap();

        let imported = manager.import_where(&mut registry, |m| m.asset_type == AssetType::Texture, None);
        assert_eq!(imported, 1);
        assert!(registry.get_metadata(png).unwrap().is_imported());
        assert!(!registry.get_metadata(wav).unwrap().is_imported());
    }

    #[test]
    fn test_import_all_with_dependents_follows_edges() {
        let (dir, mut registry) = project(&["a.atlas", "sheet.png", "other.png"]);
        let atlas = registry.register_asset("a.atlas", AssetType::SpriteAtlas);
        let sheet = registry.register_asset("sheet.png", AssetType::Texture);
        let other = registry.register_asset("other.png", AssetType::Texture);

        let mut manager = AssetImporterManager::new();
        manager.register_importer(texture_importer()).unwrap();
        manager.register_importer(LinkingImporter).unwrap();
        assert_eq!(manager.import_all(&mut registry, None), 3);
        assert_eq!(registry.get_dependents(sheet), vec![atlas]);

        fs::write(dir.path().join("assets/sheet.png"), b"repainted sheet").unwrap();
        assert_eq!(registry.get_assets_needing_reimport(), vec![sheet]);

        let report = manager.import_all_with_dependents(&mut registry, None);
        assert_eq!(report.succeeded, vec![sheet, atlas]);
        assert!(!report.succeeded.contains(&other));
        assert!(registry.get_assets_needing_reimport().is_empty());
    }

    #[test]
    fn test_reported_dependencies_replace_edges() {
        let (_dir, mut registry) = project(&["a.atlas", "sheet.png", "old.png"]);
        let atlas = registry.register_asset("a.atlas", AssetType::SpriteAtlas);
        let sheet = registry.register_asset("sheet.png", AssetType::Texture);
        let old = registry.register_asset("old.png", AssetType::Texture);
        registry.add_dependency(atlas, old);

        let mut manager = AssetImporterManager::new();
        manager.register_importer(LinkingImporter).unwrap();
        assert!(manager.import_asset(&mut registry, atlas).success);

        assert_eq!(registry.get_dependencies(atlas), vec![sheet]);
        assert!(registry.get_dependents(old).is_empty());
        assert_eq!(registry.get_dependents(sheet), vec![atlas]);
    }
}
