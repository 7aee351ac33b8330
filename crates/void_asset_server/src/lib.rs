//! # Void Asset Server
//!
//! Runtime side of the Void asset pipeline, built on `void_asset`.
//!
//! ## Features
//!
//! - **Built-in importers**: textures (PNG/JPG/BMP/TGA), WGSL/GLSL shaders,
//!   audio clips and sprite atlases
//! - **Hot-Reload**: per-asset watch state, reload history and stats
//! - **File Watching**: optional OS notifications through `notify`
//!   (feature `file-watcher`, on by default)
//!
//! ## Example
//!
//! ```ignore
//! use void_asset::prelude::*;
//! use void_asset_server::{builtin_manager, HotReloadManager};
//!
//! let mut registry = AssetRegistry::init(PipelineConfig::discover("my_project"));
//! registry.load();
//!
//! let importers = builtin_manager();
//! importers.import_all(&mut registry, None);
//!
//! let mut hot_reload = HotReloadManager::default();
//! for meta in registry.iter() {
//!     hot_reload.watch_asset(meta.id, registry.config().source_file(&meta.source_path));
//! }
//! hot_reload.set_reload_handler(|id| {
//!     println!("{} changed", id);
//!     true
//! });
//!
//! // In your game loop:
//! hot_reload.poll();
//! ```

pub mod hot_reload;
pub mod importers;

#[cfg(feature = "file-watcher")]
pub mod watcher;

pub use hot_reload::{AfterReloadCallback, HotReloadManager, ReloadEvent, ReloadHandler, WatchState};
pub use importers::{
    builtin_manager, register_builtin_importers, AtlasDefinition, AtlasFrame, AudioFormat, AudioImporter,
    AudioInfo, CookedAtlas, ShaderAsset, ShaderEntryPoint, ShaderImporter, ShaderSettings, ShaderStage,
    SpriteAtlasImporter, TextureAsset, TextureImporter, TextureSettings,
};

#[cfg(feature = "file-watcher")]
pub use watcher::{FileChange, FileChangeKind, FileWatcher};
