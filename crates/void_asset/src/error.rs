//! Error types for the asset pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::AssetType;

/// Asset pipeline errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// Unknown asset id or path
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// No importer registered for the asset's type
    #[error("No importer registered for asset type '{0}'")]
    NoImporterForType(AssetType),

    /// No importer registered for a file extension
    #[error("No importer registered for extension '.{0}'")]
    NoImporterForExtension(String),

    /// Two importers claim the same extension
    #[error("Extension '.{extension}' is already claimed by the {existing} importer")]
    ExtensionConflict {
        extension: String,
        existing: AssetType,
    },

    /// An importer for this type is already registered
    #[error("An importer for asset type '{0}' is already registered")]
    TypeConflict(AssetType),

    /// File system failure
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Importer-specific failure
    #[error("Import failed: {0}")]
    ImportFailed(String),

    /// Registry file is malformed or cannot be written
    #[error("Registry persistence error: {0}")]
    Persistence(String),

    /// JSON encode/decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid pipeline configuration
    #[error("Invalid pipeline configuration: {0}")]
    Config(String),

    /// File watcher could not be created or attached
    #[error("File watcher error: {0}")]
    Watch(String),
}

impl AssetError {
    /// Wrap an IO error together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for asset pipeline operations
pub type AssetResult<T> = std::result::Result<T, AssetError>;
