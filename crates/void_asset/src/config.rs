//! Pipeline configuration
//!
//! Fixes the directory roots the pipeline works in:
//!
//! ```text
//! <project_root>/<source_dir>      authored sources       (default "assets")
//! <project_root>/<imported_dir>    cooked artifacts       (default "build/imported")
//! <imported_dir>/<registry_file>   persisted registry     (default "asset_registry.json")
//! ```
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment: `VOID_ASSETS_ROOT`, `VOID_ASSETS_SOURCE_DIR`, `VOID_ASSETS_IMPORTED_DIR`
//! 2. Config file (`void_assets.toml`), see [`PipelineConfig::load_from_file`]
//! 3. Defaults
//!
//! # Example Config File
//!
//! ```toml
//! project_root = "."
//! source_dir = "assets"
//! imported_dir = "build/imported"
//!
//! [hot_reload]
//! enabled = true
//! max_history = 64
//! max_reloads_per_poll = 0
//! debounce_ms = 100
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, AssetResult};

/// Default name of the pipeline config file
pub const CONFIG_FILE_NAME: &str = "void_assets.toml";

/// Default name of the persisted registry inside the imported directory
pub const REGISTRY_FILE_NAME: &str = "asset_registry.json";

/// Directory roots for the asset pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Project root; the other directories are relative to it
    pub project_root: PathBuf,
    /// Authored sources, relative to the project root
    pub source_dir: PathBuf,
    /// Cooked artifacts and the registry file, relative to the project root
    pub imported_dir: PathBuf,
    /// Registry file name inside `imported_dir`
    pub registry_file: String,
    /// Hot-reload settings
    pub hot_reload: HotReloadConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            source_dir: PathBuf::from("assets"),
            imported_dir: PathBuf::from("build/imported"),
            registry_file: REGISTRY_FILE_NAME.to_string(),
            hot_reload: HotReloadConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Config rooted at `project_root` with default sub-directories
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Override the source directory
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    /// Override the imported directory
    pub fn with_imported_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.imported_dir = dir.into();
        self
    }

    /// Load configuration from a TOML file.
    ///
    /// A relative `project_root` in the file is resolved against the file's
    /// own directory.
    pub fn load_from_file(path: impl AsRef<Path>) -> AssetResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| AssetError::Config(format!("{}: {}", path.display(), e)))?;

        if config.project_root.is_relative() {
            if let Some(parent) = path.parent() {
                config.project_root = parent.join(&config.project_root);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load `void_assets.toml` from `project_root` if present, defaults otherwise
    pub fn discover(project_root: impl Into<PathBuf>) -> Self {
        let root = project_root.into();
        let file = root.join(CONFIG_FILE_NAME);
        if file.is_file() {
            match Self::load_from_file(&file) {
                Ok(config) => {
                    log::info!("Loaded pipeline config from {:?}", file);
                    return config;
                }
                Err(e) => log::warn!("Ignoring pipeline config {:?}: {}", file, e),
            }
        }
        Self::new(root)
    }

    /// Override fields from `VOID_ASSETS_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("VOID_ASSETS_ROOT") {
            if !root.is_empty() {
                self.project_root = PathBuf::from(root);
                log::info!("Project root from env: {:?}", self.project_root);
            }
        }
        if let Ok(dir) = std::env::var("VOID_ASSETS_SOURCE_DIR") {
            if !dir.is_empty() {
                self.source_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("VOID_ASSETS_IMPORTED_DIR") {
            if !dir.is_empty() {
                self.imported_dir = PathBuf::from(dir);
            }
        }
    }

    /// Resolve a relative project root against the current directory
    pub fn make_root_absolute(&mut self) {
        if self.project_root.is_absolute() {
            return;
        }
        match std::path::absolute(&self.project_root) {
            Ok(root) => self.project_root = root,
            Err(e) => log::warn!("Cannot resolve project root {:?}: {}", self.project_root, e),
        }
    }

    /// Reject configurations the pipeline cannot work with
    pub fn validate(&self) -> AssetResult<()> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(AssetError::Config("source_dir must not be empty".into()));
        }
        if self.imported_dir.as_os_str().is_empty() {
            return Err(AssetError::Config("imported_dir must not be empty".into()));
        }
        if self.registry_file.is_empty() || self.registry_file.contains(&['/', '\\'][..]) {
            return Err(AssetError::Config(format!(
                "registry_file must be a plain file name, got '{}'",
                self.registry_file
            )));
        }
        Ok(())
    }

    /// Absolute (or root-joined) source directory
    pub fn source_root(&self) -> PathBuf {
        self.project_root.join(&self.source_dir)
    }

    /// Absolute (or root-joined) imported directory
    pub fn imported_root(&self) -> PathBuf {
        self.project_root.join(&self.imported_dir)
    }

    /// Location of the persisted registry
    pub fn registry_path(&self) -> PathBuf {
        self.imported_root().join(&self.registry_file)
    }

    /// Resolve a source-relative asset path to a file system path
    pub fn source_file(&self, relative: &str) -> PathBuf {
        self.source_root().join(relative)
    }

    /// Resolve a project-relative path to a file system path
    pub fn project_file(&self, relative: &str) -> PathBuf {
        self.project_root.join(relative)
    }
}

/// Hot-reload settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadConfig {
    /// Start enabled
    pub enabled: bool,
    /// Reload events kept in the history ring
    pub max_history: usize,
    /// Reloads processed per `poll()`; 0 means unlimited
    pub max_reloads_per_poll: usize,
    /// Minimum time between two file-watcher events for the same path
    pub debounce_ms: u64,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_history: 64,
            max_reloads_per_poll: 0,
            debounce_ms: 100,
        }
    }
}

/// Normalize a relative path to the `/`-separated form used as registry key.
///
/// `.` segments are dropped and `..` removes the segment before it. Returns
/// `None` for absolute paths, paths that climb above their root and paths
/// that name the root itself.
pub fn normalize_relative(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// [`normalize_relative`] for user-supplied strings, accepting `\` separators
pub fn normalize_source_path(path: &str) -> Option<String> {
    normalize_relative(Path::new(&path.replace('\\', "/")))
}
