//! Asset Importer - pluggable per-type import step
//!
//! Importers turn an authored source file into a cooked artifact under the
//! imported directory. They are registered with the
//! [`AssetImporterManager`](crate::manager::AssetImporterManager) and
//! dispatched by [`AssetType`].
//!
//! An importer never fails by panicking or by returning an error type: every
//! problem is reported as [`ImportResult::fail`]. Internally importers are free
//! to use `AssetResult` and `?`, then convert at the boundary with
//! `ImportResult::from`.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{AssetError, AssetResult};
use crate::id::AssetId;
use crate::metadata::{AssetMetadata, AssetType};
use crate::registry::AssetRegistry;

/// Outcome of one import
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportResult {
    /// Whether the artifact was produced
    pub success: bool,
    /// Failure message (empty on success)
    pub error: String,
    /// Project-relative path of the artifact (empty on failure)
    pub imported_path: String,
}

impl ImportResult {
    /// Successful import that produced `imported_path`
    pub fn ok(imported_path: impl Into<String>) -> Self {
        Self {
            success: true,
            error: String::new(),
            imported_path: imported_path.into(),
        }
    }

    /// Failed import
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            imported_path: String::new(),
        }
    }

    /// Check for success
    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl From<AssetResult<String>> for ImportResult {
    fn from(result: AssetResult<String>) -> Self {
        match result {
            Ok(path) => Self::ok(path),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

impl From<AssetError> for ImportResult {
    fn from(error: AssetError) -> Self {
        Self::fail(error.to_string())
    }
}

/// Everything an importer gets to see about the asset being imported
pub struct ImportContext<'a> {
    /// Registry, read-only during the import
    pub registry: &'a AssetRegistry,
    /// Asset being imported
    pub asset_id: AssetId,
    /// Its metadata
    pub metadata: &'a AssetMetadata,
    /// File system path of the source
    pub source_path: PathBuf,
    /// File system path of the imported directory
    pub imported_dir: PathBuf,
    /// Effective settings (the asset's own, or the importer's defaults)
    pub settings_json: String,
    /// Dependencies discovered during import; `None` if not tracked
    dependencies: Option<Vec<AssetId>>,
}

impl<'a> ImportContext<'a> {
    /// Build a context for `metadata`
    pub fn new(registry: &'a AssetRegistry, metadata: &'a AssetMetadata, settings_json: String) -> Self {
        let config = registry.config();
        Self {
            registry,
            asset_id: metadata.id,
            metadata,
            source_path: config.source_file(&metadata.source_path),
            imported_dir: config.imported_root(),
            settings_json,
            dependencies: None,
        }
    }

    /// Lower-cased source extension
    pub fn extension(&self) -> Option<String> {
        self.metadata.extension()
    }

    /// Read the whole source file
    pub fn read_source(&self) -> AssetResult<Vec<u8>> {
        std::fs::read(&self.source_path).map_err(|e| AssetError::io(&self.source_path, e))
    }

    /// Read the source file as UTF-8
    pub fn read_source_string(&self) -> AssetResult<String> {
        let bytes = self.read_source()?;
        String::from_utf8(bytes).map_err(|e| {
            AssetError::ImportFailed(format!(
                "{} is not valid UTF-8: {}",
                self.metadata.source_path, e
            ))
        })
    }

    /// Parse the effective settings. Empty settings give `T::default()`.
    pub fn settings<T: DeserializeOwned + Default>(&self) -> AssetResult<T> {
        if self.settings_json.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&self.settings_json).map_err(|e| {
            AssetError::ImportFailed(format!(
                "invalid import settings for {}: {}",
                self.metadata.source_path, e
            ))
        })
    }

    /// Path of the artifact with the given extension
    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        self.imported_dir
            .join(format!("{}.{}", self.asset_id, extension))
    }

    /// Write an artifact and return its project-relative path
    pub fn write_artifact(&self, extension: &str, bytes: &[u8]) -> AssetResult<String> {
        std::fs::create_dir_all(&self.imported_dir)
            .map_err(|e| AssetError::io(&self.imported_dir, e))?;
        let path = self.artifact_path(extension);
        std::fs::write(&path, bytes).map_err(|e| AssetError::io(&path, e))?;
        Ok(self.project_relative(&path))
    }

    /// Express a path under the project root in `/`-separated relative form
    pub fn project_relative(&self, path: &Path) -> String {
        let root = &self.registry.config().project_root;
        path.strip_prefix(root)
            .ok()
            .and_then(crate::config::normalize_relative)
            .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"))
    }

    /// Look up another asset by source path
    pub fn resolve(&self, source_path: &str) -> Option<AssetId> {
        self.registry.get_id_by_path(source_path)
    }

    /// Declare that this importer reports the asset's dependencies.
    ///
    /// After a successful import, the asset's forward edges are replaced by
    /// whatever was reported (possibly nothing).
    pub fn track_dependencies(&mut self) {
        self.dependencies.get_or_insert_with(Vec::new);
    }

    /// Report a dependency (implies [`track_dependencies`](Self::track_dependencies))
    pub fn add_dependency(&mut self, id: AssetId) {
        let deps = self.dependencies.get_or_insert_with(Vec::new);
        if id != self.asset_id && !deps.contains(&id) {
            deps.push(id);
        }
    }

    /// Dependencies reported so far
    pub fn dependencies(&self) -> Option<&[AssetId]> {
        self.dependencies.as_deref()
    }

    pub(crate) fn take_dependencies(&mut self) -> Option<Vec<AssetId>> {
        self.dependencies.take()
    }
}

/// Trait for asset importers
pub trait AssetImporter: Send + Sync {
    /// Asset type this importer handles
    fn asset_type(&self) -> AssetType;

    /// File extensions this importer handles (lower-case, no dot)
    fn supported_extensions(&self) -> &[&str];

    /// Produce the cooked artifact. Must not panic; report failures instead.
    fn import(&self, ctx: &mut ImportContext<'_>) -> ImportResult;

    /// Settings used when an asset has none of its own (JSON text)
    fn default_settings(&self) -> String {
        "{}".to_string()
    }

    /// Display name for logs
    fn name(&self) -> &str {
        self.asset_type().as_str()
    }
}
