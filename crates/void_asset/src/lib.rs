//! # void_asset - Asset Pipeline Core
//!
//! Gives every source file in a project a stable identity and keeps its cooked
//! artifact up to date:
//! - Rename-stable UUID identities ([`AssetId`])
//! - Persisted metadata and dependency graph ([`AssetRegistry`])
//! - Cheap stat-based change scanning ([`AssetScanner`])
//! - Pluggable, type-dispatched importers ([`AssetImporterManager`])
//!
//! Hot-reload and the built-in importers live in `void_asset_server`.
//!
//! ## Example
//!
//! ```ignore
//! use void_asset::prelude::*;
//!
//! let mut registry = AssetRegistry::init(PipelineConfig::new("my_project"));
//! registry.load();
//!
//! // Pick up files added or removed since the last run
//! let mut scanner = AssetScanner::new();
//! scanner.scan_source_directory(&registry);
//! scanner.apply_changes(&mut registry);
//!
//! // Cook everything that is stale
//! let mut importers = AssetImporterManager::new();
//! importers.register_importer(MyTextureImporter)?;
//! importers.import_all(&mut registry, None);
//!
//! registry.save()?;
//! ```
//!
//! Every component is a plain caller-owned value with no internal locking.
//! If scanning or importing is moved to a worker thread, the registry must be
//! mutated from a single owner only.

pub mod config;
pub mod error;
pub mod id;
pub mod importer;
pub mod manager;
pub mod metadata;
pub mod registry;
pub mod scanner;
pub mod storage;

pub use config::{normalize_source_path, HotReloadConfig, PipelineConfig, CONFIG_FILE_NAME, REGISTRY_FILE_NAME};
pub use error::{AssetError, AssetResult};
pub use id::AssetId;
pub use importer::{AssetImporter, ImportContext, ImportResult};
pub use manager::{AssetImporterManager, ImportReport, ProgressFn};
pub use metadata::{compute_file_hash, fnv1a_64, AssetMetadata, AssetType, FileStamp};
pub use registry::AssetRegistry;
pub use scanner::{AssetScanner, NewAsset};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::error::{AssetError, AssetResult};
    pub use crate::id::AssetId;
    pub use crate::importer::{AssetImporter, ImportContext, ImportResult};
    pub use crate::manager::AssetImporterManager;
    pub use crate::metadata::{AssetMetadata, AssetType};
    pub use crate::registry::AssetRegistry;
    pub use crate::scanner::AssetScanner;
}
