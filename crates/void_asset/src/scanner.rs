//! Change Scanner - diffs the source tree against the registry
//!
//! A scan walks the source directory once, stats every file and sorts what it
//! finds into three disjoint lists:
//! - **New**: not in the registry and has a known asset extension
//! - **Modified**: registered, but `(mtime, size)` differ from the stored values
//! - **Deleted**: registered, but not found on disk
//!
//! Scanning never reads file contents and never mutates the registry. Acting
//! on the lists is up to the caller (see [`AssetScanner::apply_changes`]).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::normalize_relative;
use crate::id::AssetId;
use crate::metadata::{AssetType, FileStamp};
use crate::registry::AssetRegistry;

/// A source file not yet in the registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAsset {
    /// Path relative to the source directory
    pub path: String,
    /// Type derived from the extension
    pub asset_type: AssetType,
}

/// Result lists of the last scan
#[derive(Clone, Debug, Default)]
pub struct AssetScanner {
    new_assets: Vec<NewAsset>,
    modified_assets: Vec<AssetId>,
    deleted_assets: Vec<AssetId>,
}

impl AssetScanner {
    /// Create a scanner with empty result lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the source directory and diff it against the registry.
    ///
    /// Replaces the previous results. Returns the total number of changes.
    pub fn scan_source_directory(&mut self, registry: &AssetRegistry) -> usize {
        self.new_assets.clear();
        self.modified_assets.clear();
        self.deleted_assets.clear();

        let root = registry.config().source_root();
        let mut files = Vec::new();
        if root.is_dir() {
            collect_files(&root, &root, &mut files);
        } else {
            log::warn!("Source directory {:?} does not exist", root);
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen = HashSet::with_capacity(files.len());
        for (rel, stamp) in files {
            match registry.get_id_by_path(&rel) {
                Some(id) => {
                    seen.insert(id);
                    let stored = registry.get_metadata(id).map(|m| m.stamp());
                    if stored != Some(stamp) {
                        self.modified_assets.push(id);
                    }
                }
                None => {
                    let asset_type = AssetType::from_path(&rel);
                    if asset_type.is_known() {
                        self.new_assets.push(NewAsset {
                            path: rel,
                            asset_type,
                        });
                    }
                }
            }
        }

        self.deleted_assets = registry
            .get_all_asset_ids()
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();

        let total = self.change_count();
        log::debug!(
            "Scanned {:?}: {} new, {} modified, {} deleted",
            root,
            self.new_assets.len(),
            self.modified_assets.len(),
            self.deleted_assets.len()
        );
        total
    }

    /// Register every New asset and unregister every Deleted one.
    ///
    /// Modified assets are left for the import coordinator. Returns
    /// `(registered, removed)`.
    pub fn apply_changes(&self, registry: &mut AssetRegistry) -> (usize, usize) {
        for asset in &self.new_assets {
            registry.register_asset(&asset.path, asset.asset_type);
        }
        let removed = self
            .deleted_assets
            .iter()
            .filter(|&&id| registry.unregister_asset(id))
            .count();
        if !self.new_assets.is_empty() || removed > 0 {
            log::info!(
                "Applied scan: {} registered, {} removed",
                self.new_assets.len(),
                removed
            );
        }
        (self.new_assets.len(), removed)
    }

    /// Source files with a known extension that are not registered
    pub fn new_assets(&self) -> &[NewAsset] {
        &self.new_assets
    }

    /// Registered assets whose fast metadata changed
    pub fn modified_assets(&self) -> &[AssetId] {
        &self.modified_assets
    }

    /// Registered assets whose source file is gone
    pub fn deleted_assets(&self) -> &[AssetId] {
        &self.deleted_assets
    }

    /// Total entries across the three lists
    pub fn change_count(&self) -> usize {
        self.new_assets.len() + self.modified_assets.len() + self.deleted_assets.len()
    }
}

/// Recursively collect `(relative path, stamp)` for every file, skipping dot entries
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, FileStamp)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Failed to read directory {:?}: {}", dir, e);
            return;
        }
    };

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_files(root, &path, out);
        } else if let Some(stamp) = FileStamp::read(&path) {
            if let Some(rel) = path.strip_prefix(root).ok().and_then(normalize_relative) {
                out.push((rel, stamp));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn write(dir: &TempDir, rel: &str, data: &[u8]) {
        let path = dir.path().join("assets").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_scan_classifies_changes() {
        let dir = tempdir().unwrap();
        write(&dir, "textures/a.png", b"a");
        write(&dir, "textures/b.png", b"b");
        write(&dir, "notes.txt", b"not an asset");
        write(&dir, ".hidden/c.png", b"c");
        write(&dir, "textures/.d.png", b"d");

        let mut registry = AssetRegistry::new(dir.path());
        let b = registry.register_asset("textures/b.png", AssetType::Texture);
        let gone = registry.register_asset("audio/gone.wav", AssetType::Audio);
        write(&dir, "textures/b.png", b"bigger b");

        let mut scanner = AssetScanner::new();
        assert_eq!(scanner.scan_source_directory(&registry), 3);
        assert_eq!(
            scanner.new_assets(),
            &[NewAsset {
                path: "textures/a.png".into(),
                asset_type: AssetType::Texture
            }]
        );
        assert_eq!(scanner.modified_assets(), &[b]);
        assert_eq!(scanner.deleted_assets(), &[gone]);
    }

    #[test]
    fn test_results_are_replaced_each_scan() {
        let dir = tempdir().unwrap();
        write(&dir, "a.wav", b"RIFF");
        let mut registry = AssetRegistry::new(dir.path());
        let mut scanner = AssetScanner::new();

        assert_eq!(scanner.scan_source_directory(&registry), 1);
        assert_eq!(scanner.apply_changes(&mut registry), (1, 0));
        assert_eq!(scanner.scan_source_directory(&registry), 0);
        assert!(scanner.new_assets().is_empty());
    }

    #[test]
    fn test_apply_changes_unregisters_deleted() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        let mut registry = AssetRegistry::new(dir.path());
        registry.register_asset("missing.png", AssetType::Texture);

        let mut scanner = AssetScanner::new();
        scanner.scan_source_directory(&registry);
        assert_eq!(scanner.apply_changes(&mut registry), (0, 1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_source_dir_marks_everything_deleted() {
        let dir = tempdir().unwrap();
        let mut registry = AssetRegistry::new(dir.path());
        let id = registry.register_asset("a.png", AssetType::Texture);

        let mut scanner = AssetScanner::new();
        assert_eq!(scanner.scan_source_directory(&registry), 1);
        assert_eq!(scanner.deleted_assets(), &[id]);
    }
}
