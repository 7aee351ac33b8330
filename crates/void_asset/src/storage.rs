//! Registry persistence
//!
//! On-disk layout of `<imported_dir>/asset_registry.json`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "assets": [
//!     { "id": "<uuid>", "sourcePath": "...", "importedPath": "...",
//!       "type": "texture", "sourceHash": 0, "sourceModTime": 0, "sourceSize": 0,
//!       "importedTimestamp": 0, "importSettings": "{}", "dependencies": ["<uuid>"] }
//!   ]
//! }
//! ```
//!
//! Only forward dependency edges are stored. Dependents are rebuilt by the
//! registry after loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, AssetResult};
use crate::id::AssetId;
use crate::metadata::{AssetMetadata, AssetType};

/// Current registry file format version
pub const REGISTRY_VERSION: u32 = 1;

/// Root of the registry file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: u32,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
}

/// One persisted asset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: AssetId,
    pub source_path: String,
    #[serde(default)]
    pub imported_path: String,
    #[serde(rename = "type", default = "unknown_type")]
    pub asset_type: String,
    /// 0 means "not computed"
    #[serde(default)]
    pub source_hash: u64,
    #[serde(default)]
    pub source_mod_time: u64,
    #[serde(default)]
    pub source_size: u64,
    #[serde(default)]
    pub imported_timestamp: u64,
    #[serde(default)]
    pub import_settings: String,
    #[serde(default)]
    pub dependencies: Vec<AssetId>,
}

fn unknown_type() -> String {
    AssetType::Unknown.as_str().to_string()
}

impl From<&AssetMetadata> for AssetRecord {
    fn from(meta: &AssetMetadata) -> Self {
        Self {
            id: meta.id,
            source_path: meta.source_path.clone(),
            imported_path: meta.imported_path.clone(),
            asset_type: meta.asset_type.as_str().to_string(),
            source_hash: meta.source_hash.unwrap_or(0),
            source_mod_time: meta.source_mod_time,
            source_size: meta.source_size,
            imported_timestamp: meta.imported_timestamp,
            import_settings: meta.import_settings.clone(),
            dependencies: meta.dependencies.iter().copied().collect(),
        }
    }
}

impl AssetRecord {
    /// Convert to in-memory metadata. Dependencies are left to the caller,
    /// which validates them against the full id set.
    pub fn into_metadata(self) -> (AssetMetadata, Vec<AssetId>) {
        let mut meta = AssetMetadata::new(
            self.id,
            self.source_path,
            AssetType::from_name(&self.asset_type),
        );
        meta.imported_path = self.imported_path;
        meta.source_hash = (self.source_hash != 0).then_some(self.source_hash);
        meta.source_mod_time = self.source_mod_time;
        meta.source_size = self.source_size;
        meta.imported_timestamp = self.imported_timestamp;
        meta.import_settings = self.import_settings;
        (meta, self.dependencies)
    }
}

/// Read and decode a registry file
pub fn read_registry_file(path: &Path) -> AssetResult<RegistryFile> {
    let content = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
    let file: RegistryFile = serde_json::from_str(&content)?;
    if file.version != REGISTRY_VERSION {
        return Err(AssetError::Persistence(format!(
            "unsupported registry version {} (expected {})",
            file.version, REGISTRY_VERSION
        )));
    }
    Ok(file)
}

/// Encode and write a registry file.
///
/// Writes to a sibling temp file first and renames it over the target, so an
/// interrupted save never leaves a truncated registry behind.
pub fn write_registry_file(path: &Path, file: &RegistryFile) -> AssetResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AssetError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(file)?;
    let tmp = path.with_extension("json.tmp");
    if let Err(e) = std::fs::write(&tmp, json).and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(AssetError::io(path, e));
    }
    Ok(())
}
