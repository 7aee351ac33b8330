//! Asset Registry - persisted identity, metadata and dependency store
//!
//! The registry owns one [`AssetMetadata`] per asset and keeps three things in
//! lock-step:
//! - the `id -> metadata` map and the `source path -> id` index
//! - forward `dependencies` and reverse `dependents` edges (always symmetric)
//! - the on-disk registry file, which stores only forward edges
//!
//! Every public operation fails locally: unknown ids are no-ops that return
//! `false`/`None`, and a corrupt registry file means "start empty".

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use crate::config::{normalize_source_path, PipelineConfig};
use crate::error::AssetResult;
use crate::id::AssetId;
use crate::metadata::{compute_file_hash, unix_now, AssetMetadata, AssetType, FileStamp};
use crate::storage::{self, AssetRecord, RegistryFile, REGISTRY_VERSION};

/// Identity and metadata store for every registered asset
pub struct AssetRegistry {
    /// Directory roots
    config: PipelineConfig,
    /// Metadata by ID
    assets: HashMap<AssetId, AssetMetadata>,
    /// Source path to ID mapping
    path_index: HashMap<String, AssetId>,
}

impl AssetRegistry {
    /// Create a registry for the given directory layout.
    ///
    /// A relative project root is resolved against the current directory.
    /// Creates the imported directory if it does not exist yet. Nothing is
    /// read from disk until [`load`](Self::load) is called.
    pub fn init(mut config: PipelineConfig) -> Self {
        config.make_root_absolute();
        let imported = config.imported_root();
        if let Err(e) = std::fs::create_dir_all(&imported) {
            log::warn!("Failed to create imported directory {:?}: {}", imported, e);
        }
        Self {
            config,
            assets: HashMap::new(),
            path_index: HashMap::new(),
        }
    }

    /// Create a registry rooted at `project_root` with default directories
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::init(PipelineConfig::new(project_root))
    }

    /// Directory layout
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Register an asset by source path (relative to the source directory).
    ///
    /// Idempotent: a path that is already registered returns its existing ID
    /// unchanged. A path that leaves the source directory is rejected with
    /// the nil ID.
    pub fn register_asset(&mut self, source_path: &str, asset_type: AssetType) -> AssetId {
        let Some(key) = normalize_source_path(source_path) else {
            log::warn!("Refusing to register {:?}: not inside the source directory", source_path);
            return AssetId::nil();
        };
        if let Some(&id) = self.path_index.get(&key) {
            return id;
        }

        let id = AssetId::new();
        let mut meta = AssetMetadata::new(id, key.clone(), asset_type);
        if let Some(stamp) = FileStamp::read(self.config.source_file(&key)) {
            meta.source_mod_time = stamp.mod_time;
            meta.source_size = stamp.size;
        }

        log::debug!("Registered asset {} ({}) as {}", key, asset_type, id);
        self.path_index.insert(key, id);
        self.assets.insert(id, meta);
        id
    }

    /// Remove an asset, severing all of its dependency edges first.
    ///
    /// Returns `false` if the ID is unknown.
    pub fn unregister_asset(&mut self, id: AssetId) -> bool {
        let Some(meta) = self.assets.get(&id) else {
            return false;
        };
        let dependencies: Vec<AssetId> = meta.dependencies.iter().copied().collect();
        let dependents: Vec<AssetId> = meta.dependents.iter().copied().collect();

        for dep in dependencies {
            if let Some(other) = self.assets.get_mut(&dep) {
                other.dependents.remove(&id);
            }
        }
        for dependent in dependents {
            if let Some(other) = self.assets.get_mut(&dependent) {
                other.dependencies.remove(&id);
            }
        }

        if let Some(meta) = self.assets.remove(&id) {
            self.path_index.remove(&meta.source_path);
            log::debug!("Unregistered asset {} ({})", meta.source_path, id);
        }
        true
    }

    /// Re-point an asset at a new source path, keeping its ID.
    ///
    /// Fails if another asset already owns `new_path`.
    pub fn move_asset(&mut self, id: AssetId, new_path: &str) -> bool {
        let Some(key) = normalize_source_path(new_path) else {
            log::warn!("Cannot move {} to {:?}: not inside the source directory", id, new_path);
            return false;
        };
        match self.path_index.get(&key) {
            Some(&owner) if owner == id => return true,
            Some(_) => {
                log::warn!("Cannot move {} to {}: path already registered", id, key);
                return false;
            }
            None => {}
        }
        let Some(meta) = self.assets.get_mut(&id) else {
            return false;
        };

        let old = std::mem::replace(&mut meta.source_path, key.clone());
        if let Some(stamp) = FileStamp::read(self.config.source_file(&key)) {
            meta.source_mod_time = stamp.mod_time;
            meta.source_size = stamp.size;
        }
        self.path_index.remove(&old);
        self.path_index.insert(key, id);
        true
    }

    /// Metadata for an ID
    pub fn get_metadata(&self, id: AssetId) -> Option<&AssetMetadata> {
        self.assets.get(&id)
    }

    /// ID registered for a source path
    pub fn get_id_by_path(&self, source_path: &str) -> Option<AssetId> {
        let key = normalize_source_path(source_path)?;
        self.path_index.get(&key).copied()
    }

    /// Check if an ID is registered
    pub fn contains(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    /// All registered IDs, ordered by source path
    pub fn get_all_asset_ids(&self) -> Vec<AssetId> {
        let mut paths: Vec<(&String, &AssetId)> = self.path_index.iter().collect();
        paths.sort();
        paths.into_iter().map(|(_, &id)| id).collect()
    }

    /// Number of registered assets
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterate over all metadata (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &AssetMetadata> {
        self.assets.values()
    }

    /// IDs of every asset of a given type, ordered by source path
    pub fn assets_of_type(&self, asset_type: AssetType) -> Vec<AssetId> {
        self.get_all_asset_ids()
            .into_iter()
            .filter(|id| self.assets[id].asset_type == asset_type)
            .collect()
    }

    /// File system location of an asset's source
    pub fn source_path_abs(&self, id: AssetId) -> Option<PathBuf> {
        self.assets
            .get(&id)
            .map(|meta| self.config.source_file(&meta.source_path))
    }

    // ------------------------------------------------------------------
    // Dependency graph
    // ------------------------------------------------------------------

    /// Record that `asset` requires `dependency`.
    ///
    /// Both must be registered and distinct. Adding an existing edge is a
    /// no-op. Returns whether a new edge was created.
    pub fn add_dependency(&mut self, asset: AssetId, dependency: AssetId) -> bool {
        if asset == dependency || !self.contains(asset) || !self.contains(dependency) {
            return false;
        }
        let inserted = self
            .assets
            .get_mut(&asset)
            .map(|m| m.dependencies.insert(dependency))
            .unwrap_or(false);
        if let Some(dep) = self.assets.get_mut(&dependency) {
            dep.dependents.insert(asset);
        }
        inserted
    }

    /// Remove the edge `asset -> dependency`. Returns whether it existed.
    pub fn remove_dependency(&mut self, asset: AssetId, dependency: AssetId) -> bool {
        let removed = self
            .assets
            .get_mut(&asset)
            .map(|m| m.dependencies.remove(&dependency))
            .unwrap_or(false);
        if let Some(dep) = self.assets.get_mut(&dependency) {
            dep.dependents.remove(&asset);
        }
        removed
    }

    /// Remove every forward edge of `asset`
    pub fn clear_dependencies(&mut self, asset: AssetId) {
        let Some(meta) = self.assets.get_mut(&asset) else {
            return;
        };
        let deps = std::mem::take(&mut meta.dependencies);
        for dep in deps {
            if let Some(other) = self.assets.get_mut(&dep) {
                other.dependents.remove(&asset);
            }
        }
    }

    /// Replace the forward edges of `asset`. Unknown IDs are skipped.
    pub fn set_dependencies(&mut self, asset: AssetId, dependencies: impl IntoIterator<Item = AssetId>) {
        self.clear_dependencies(asset);
        for dep in dependencies {
            if !self.add_dependency(asset, dep) && !self.contains(dep) {
                log::warn!("Skipping dependency {} -> {}: unknown asset", asset, dep);
            }
        }
    }

    /// Assets `id` requires
    pub fn get_dependencies(&self, id: AssetId) -> Vec<AssetId> {
        self.assets
            .get(&id)
            .map(|m| m.dependencies.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Assets that require `id`
    pub fn get_dependents(&self, id: AssetId) -> Vec<AssetId> {
        self.assets
            .get(&id)
            .map(|m| m.dependents.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every asset that directly or indirectly requires `id` (breadth-first)
    pub fn transitive_dependents(&self, id: AssetId) -> Vec<AssetId> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<AssetId> = self.get_dependents(id).into();

        while let Some(next) = queue.pop_front() {
            if next == id || !seen.insert(next) {
                continue;
            }
            order.push(next);
            queue.extend(self.get_dependents(next));
        }
        order
    }

    /// `ids` plus everything that transitively depends on them, deduplicated
    /// and ordered so each asset comes after the dependencies it shares the
    /// list with. Unknown IDs are skipped.
    pub fn with_transitive_dependents(&self, ids: &[AssetId]) -> Vec<AssetId> {
        let mut wanted = HashSet::new();
        for &id in ids {
            if self.contains(id) && wanted.insert(id) {
                wanted.extend(self.transitive_dependents(id));
            }
        }

        let mut visited = HashSet::with_capacity(wanted.len());
        let mut order = Vec::with_capacity(wanted.len());
        for id in self.get_all_asset_ids() {
            if wanted.contains(&id) {
                self.visit_dependencies_first(id, &wanted, &mut visited, &mut order);
            }
        }
        order
    }

    fn visit_dependencies_first(
        &self,
        id: AssetId,
        wanted: &HashSet<AssetId>,
        visited: &mut HashSet<AssetId>,
        order: &mut Vec<AssetId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        for dep in self.get_dependencies(id) {
            if wanted.contains(&dep) {
                self.visit_dependencies_first(dep, wanted, visited, order);
            }
        }
        order.push(id);
    }

    // ------------------------------------------------------------------
    // Field mutators
    // ------------------------------------------------------------------

    /// Store a content hash
    pub fn update_source_hash(&mut self, id: AssetId, hash: u64) -> bool {
        self.with_meta(id, |m| m.source_hash = Some(hash))
    }

    /// Store fast metadata
    pub fn update_source_metadata(&mut self, id: AssetId, mod_time: u64, size: u64) -> bool {
        self.with_meta(id, |m| {
            m.source_mod_time = mod_time;
            m.source_size = size;
        })
    }

    /// Replace the importer settings blob
    pub fn update_import_settings(&mut self, id: AssetId, settings_json: impl Into<String>) -> bool {
        let settings = settings_json.into();
        self.with_meta(id, |m| m.import_settings = settings)
    }

    /// Hash the source file now and store the result
    pub fn refresh_source_hash(&mut self, id: AssetId) -> Option<u64> {
        let path = self.source_path_abs(id)?;
        let hash = compute_file_hash(&path)?;
        self.update_source_hash(id, hash);
        Some(hash)
    }

    /// Record a successful import.
    ///
    /// Stamps `imported_timestamp` with the current time and captures the
    /// source's current fast metadata, so the asset stops needing reimport
    /// until the file changes again.
    pub fn mark_as_imported(&mut self, id: AssetId, imported_path: &str) -> bool {
        let stamp = self
            .source_path_abs(id)
            .and_then(|p| FileStamp::read(p));
        let imported_path = imported_path.to_string();
        self.with_meta(id, |m| {
            m.imported_path = imported_path;
            m.imported_timestamp = unix_now();
            if let Some(stamp) = stamp {
                m.source_mod_time = stamp.mod_time;
                m.source_size = stamp.size;
            }
        })
    }

    fn with_meta(&mut self, id: AssetId, f: impl FnOnce(&mut AssetMetadata)) -> bool {
        match self.assets.get_mut(&id) {
            Some(meta) => {
                f(meta);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Change detection
    // ------------------------------------------------------------------

    /// Whether an asset's cooked artifact is missing or stale.
    ///
    /// Only stats the source file; never reads its content.
    pub fn needs_reimport(&self, id: AssetId) -> bool {
        let Some(meta) = self.assets.get(&id) else {
            return false;
        };
        match FileStamp::read(self.config.source_file(&meta.source_path)) {
            Some(stamp) => !meta.is_imported() || stamp != meta.stamp(),
            None => false,
        }
    }

    /// Every asset whose artifact is missing or stale, ordered by source path
    pub fn get_assets_needing_reimport(&self) -> Vec<AssetId> {
        self.get_all_asset_ids()
            .into_iter()
            .filter(|&id| self.needs_reimport(id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Location of the registry file
    pub fn registry_path(&self) -> PathBuf {
        self.config.registry_path()
    }

    /// Write the registry file. Only forward dependency edges are stored.
    pub fn save(&self) -> AssetResult<()> {
        let assets = self
            .get_all_asset_ids()
            .iter()
            .map(|id| AssetRecord::from(&self.assets[id]))
            .collect();
        let file = RegistryFile {
            version: REGISTRY_VERSION,
            assets,
        };
        let path = self.registry_path();
        storage::write_registry_file(&path, &file)?;
        log::info!("Saved {} assets to {:?}", self.assets.len(), path);
        Ok(())
    }

    /// Load the registry file, replacing the in-memory state.
    ///
    /// Never fails: a missing file leaves the registry empty, a corrupt one is
    /// logged and also leaves it empty. Returns the number of assets loaded.
    pub fn load(&mut self) -> usize {
        match self.try_load() {
            Ok(count) => count,
            Err(e) => {
                log::warn!(
                    "Failed to load asset registry {:?}, starting empty: {}",
                    self.registry_path(),
                    e
                );
                self.clear();
                0
            }
        }
    }

    /// Load the registry file, reporting what went wrong.
    ///
    /// A missing file is not an error (fresh project). On error the in-memory
    /// state is left untouched.
    pub fn try_load(&mut self) -> AssetResult<usize> {
        let path = self.registry_path();
        if !path.exists() {
            log::info!("No asset registry at {:?}, starting empty", path);
            self.clear();
            return Ok(0);
        }

        let file = storage::read_registry_file(&path)?;
        let mut assets = HashMap::with_capacity(file.assets.len());
        let mut path_index = HashMap::with_capacity(file.assets.len());
        let mut edges = Vec::new();

        for record in file.assets {
            let (mut meta, deps) = record.into_metadata();
            let Some(key) = normalize_source_path(&meta.source_path) else {
                log::warn!("Dropping asset {}: bad source path {:?}", meta.id, meta.source_path);
                continue;
            };
            meta.source_path = key;
            if assets.contains_key(&meta.id) {
                log::warn!("Registry lists asset {} twice; keeping the first entry", meta.id);
                continue;
            }
            if path_index.contains_key(&meta.source_path) {
                log::warn!(
                    "Registry lists source path {} twice; dropping asset {}",
                    meta.source_path,
                    meta.id
                );
                continue;
            }
            path_index.insert(meta.source_path.clone(), meta.id);
            edges.push((meta.id, deps));
            assets.insert(meta.id, meta);
        }

        for (id, deps) in edges {
            for dep in deps {
                if dep == id || !assets.contains_key(&dep) {
                    log::warn!("Dropping dangling dependency {} -> {}", id, dep);
                    continue;
                }
                if let Some(meta) = assets.get_mut(&id) {
                    meta.dependencies.insert(dep);
                }
            }
        }

        self.assets = assets;
        self.path_index = path_index;
        self.rebuild_dependents();

        log::info!("Loaded {} assets from {:?}", self.assets.len(), path);
        Ok(self.assets.len())
    }

    /// Drop every asset
    pub fn clear(&mut self) {
        self.assets.clear();
        self.path_index.clear();
    }

    /// Recompute every `dependents` set by inverting `dependencies`
    fn rebuild_dependents(&mut self) {
        let edges: Vec<(AssetId, AssetId)> = self
            .assets
            .values()
            .flat_map(|m| m.dependencies.iter().map(move |&dep| (m.id, dep)))
            .collect();
        for meta in self.assets.values_mut() {
            meta.dependents.clear();
        }
        for (asset, dep) in edges {
            if let Some(meta) = self.assets.get_mut(&dep) {
                meta.dependents.insert(asset);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn project() -> (TempDir, AssetRegistry) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets/textures")).unwrap();
        let registry = AssetRegistry::new(dir.path());
        (dir, registry)
    }

    fn write_source(dir: &TempDir, rel: &str, data: &[u8]) {
        let path = dir.path().join("assets").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn assert_symmetric(registry: &AssetRegistry) {
        for meta in registry.iter() {
            for dep in &meta.dependencies {
                let other = registry.get_metadata(*dep).expect("dangling dependency");
                assert!(other.dependents.contains(&meta.id));
            }
            for dependent in &meta.dependents {
                let other = registry.get_metadata(*dependent).expect("dangling dependent");
                assert!(other.dependencies.contains(&meta.id));
            }
        }
    }

    #[test]
    fn test_init_creates_imported_dir() {
        let (dir, _registry) = project();
        assert!(dir.path().join("build/imported").is_dir());
    }

    #[test]
    fn test_register_is_idempotent() {
        let (dir, mut registry) = project();
        write_source(&dir, "textures/a.png", b"png");

        let a = registry.register_asset("textures/a.png", AssetType::Texture);
        let b = registry.register_asset("textures/a.png", AssetType::Texture);
        let c = registry.register_asset("textures\\a.png", AssetType::Texture);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(registry.get_all_asset_ids().len(), 1);

        let meta = registry.get_metadata(a).unwrap();
        assert_eq!(meta.source_size, 3);
        assert!(meta.source_mod_time > 0);
        assert_eq!(registry.get_id_by_path("textures/a.png"), Some(a));
    }

    #[test]
    fn test_register_missing_file_has_zero_stamp() {
        let (_dir, mut registry) = project();
        let id = registry.register_asset("audio/none.wav", AssetType::Audio);
        let meta = registry.get_metadata(id).unwrap();
        assert_eq!(meta.source_size, 0);
        assert_eq!(meta.source_mod_time, 0);
        assert!(!registry.needs_reimport(id));
    }

    #[test]
    fn test_lookups_miss_without_panicking() {
        let (_dir, mut registry) = project();
        let ghost = AssetId::new();
        assert!(registry.get_metadata(ghost).is_none());
        assert!(registry.get_id_by_path("nope.png").is_none());
        assert!(!registry.unregister_asset(ghost));
        assert!(!registry.update_source_hash(ghost, 1));
        assert!(!registry.mark_as_imported(ghost, "x"));
        assert!(registry.get_dependencies(ghost).is_empty());
    }

    #[test]
    fn test_dependency_edges_are_symmetric() {
        let (_dir, mut registry) = project();
        let a = registry.register_asset("a.atlas", AssetType::SpriteAtlas);
        let b = registry.register_asset("b.png", AssetType::Texture);
        let c = registry.register_asset("c.png", AssetType::Texture);

        assert!(registry.add_dependency(a, b));
        assert!(!registry.add_dependency(a, b));
        assert!(registry.add_dependency(a, c));
        assert!(!registry.add_dependency(a, a));
        assert!(!registry.add_dependency(a, AssetId::new()));
        assert_eq!(registry.get_dependencies(a).len(), 2);
        assert_eq!(registry.get_dependents(b), vec![a]);
        assert_symmetric(&registry);

        assert!(registry.remove_dependency(a, b));
        assert!(!registry.remove_dependency(a, b));
        assert!(registry.get_dependents(b).is_empty());
        assert_symmetric(&registry);

        registry.clear_dependencies(a);
        assert!(registry.get_dependencies(a).is_empty());
        assert!(registry.get_dependents(c).is_empty());
        assert_symmetric(&registry);
    }

    #[test]
    fn test_unregister_severs_edges() {
        let (_dir, mut registry) = project();
        let a = registry.register_asset("a.atlas", AssetType::SpriteAtlas);
        let b = registry.register_asset("b.png", AssetType::Texture);
        let c = registry.register_asset("c.atlas", AssetType::SpriteAtlas);
        registry.add_dependency(a, b);
        registry.add_dependency(b, c);

        assert!(registry.unregister_asset(b));
        assert!(!registry.get_dependencies(a).contains(&b));
        assert!(!registry.get_dependents(c).contains(&b));
        assert!(registry.get_id_by_path("b.png").is_none());
        for meta in registry.iter() {
            assert!(!meta.dependencies.contains(&b));
            assert!(!meta.dependents.contains(&b));
        }
        assert_symmetric(&registry);
    }

    #[test]
    fn test_transitive_dependents() {
        let (_dir, mut registry) = project();
        let image = registry.register_asset("i.png", AssetType::Texture);
        let atlas = registry.register_asset("a.atlas", AssetType::SpriteAtlas);
        let other = registry.register_asset("b.atlas", AssetType::SpriteAtlas);
        registry.add_dependency(atlas, image);
        registry.add_dependency(other, atlas);

        assert_eq!(registry.transitive_dependents(image), vec![atlas, other]);
        assert!(registry.transitive_dependents(other).is_empty());
    }

    #[test]
    fn test_parent_segments_resolve_to_distinct_files() {
        let (dir, mut registry) = project();
        write_source(&dir, "textures/a.png", b"nested");
        write_source(&dir, "a.png", b"root");

        let nested = registry.register_asset("textures/a.png", AssetType::Texture);
        let root = registry.register_asset("textures/../a.png", AssetType::Texture);
        assert_ne!(nested, root);
        assert_eq!(registry.get_metadata(root).unwrap().source_path, "a.png");
        assert_eq!(registry.get_metadata(root).unwrap().source_size, 4);
        assert_eq!(registry.register_asset("a.png", AssetType::Texture), root);
        assert_eq!(registry.get_id_by_path("x/../a.png"), Some(root));
        assert_eq!(registry.get_id_by_path("textures/./a.png"), Some(nested));
    }

    #[test]
    fn test_paths_outside_source_dir_are_rejected() {
        let (_dir, mut registry) = project();
        let id = registry.register_asset("a.png", AssetType::Texture);

        assert!(!registry.register_asset("../secret.png", AssetType::Texture).is_valid());
        assert!(!registry.register_asset("textures/../../x.png", AssetType::Texture).is_valid());
        assert!(!registry.register_asset("/abs/x.png", AssetType::Texture).is_valid());
        assert_eq!(registry.asset_count(), 1);
        assert_eq!(registry.get_id_by_path("../a.png"), None);
        assert!(!registry.move_asset(id, "../a.png"));
        assert_eq!(registry.get_metadata(id).unwrap().source_path, "a.png");
    }

    #[test]
    fn test_with_transitive_dependents_orders_dependencies_first() {
        let (_dir, mut registry) = project();
        let sheet = registry.register_asset("z/sheet.png", AssetType::Texture);
        let atlas = registry.register_asset("b.atlas", AssetType::SpriteAtlas);
        let outer = registry.register_asset("a.atlas", AssetType::SpriteAtlas);
        let lone = registry.register_asset("c.png", AssetType::Texture);
        registry.add_dependency(atlas, sheet);
        registry.add_dependency(outer, atlas);

        assert_eq!(registry.with_transitive_dependents(&[sheet]), vec![sheet, atlas, outer]);
        assert_eq!(
            registry.with_transitive_dependents(&[outer, sheet, sheet, lone, AssetId::new()]),
            vec![sheet, atlas, outer, lone]
        );
        assert!(registry.with_transitive_dependents(&[]).is_empty());

        // A cycle still yields each asset once
        registry.add_dependency(sheet, outer);
        let mut all = registry.with_transitive_dependents(&[atlas]);
        assert_eq!(all.len(), 3);
        all.sort();
        let mut expected = vec![sheet, atlas, outer];
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_move_keeps_id() {
        let (dir, mut registry) = project();
        write_source(&dir, "old/a.png", b"1234");
        let id = registry.register_asset("old/a.png", AssetType::Texture);
        let other = registry.register_asset("b.png", AssetType::Texture);

        assert!(registry.move_asset(id, "new/a.png"));
        assert_eq!(registry.get_id_by_path("new/a.png"), Some(id));
        assert!(registry.get_id_by_path("old/a.png").is_none());
        assert!(!registry.move_asset(other, "new/a.png"));
    }

    #[test]
    fn test_reimport_needed_tracking() {
        let (dir, mut registry) = project();
        write_source(&dir, "textures/a.png", b"v1");
        let id = registry.register_asset("textures/a.png", AssetType::Texture);
        assert_eq!(registry.get_assets_needing_reimport(), vec![id]);

        assert!(registry.mark_as_imported(id, "build/imported/a.tex"));
        let meta = registry.get_metadata(id).unwrap();
        assert!(meta.imported_timestamp > 0);
        assert!(registry.get_assets_needing_reimport().is_empty());

        write_source(&dir, "textures/a.png", b"version two");
        assert_eq!(registry.get_assets_needing_reimport(), vec![id]);
    }

    #[test]
    fn test_refresh_source_hash() {
        let (dir, mut registry) = project();
        write_source(&dir, "a.wgsl", b"foobar");
        let id = registry.register_asset("a.wgsl", AssetType::Shader);
        assert_eq!(registry.get_metadata(id).unwrap().source_hash, None);
        assert_eq!(registry.refresh_source_hash(id), Some(crate::metadata::fnv1a_64(b"foobar")));
        assert!(registry.get_metadata(id).unwrap().source_hash.is_some());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (dir, mut registry) = project();
        write_source(&dir, "a.atlas", b"{}");
        let a = registry.register_asset("a.atlas", AssetType::SpriteAtlas);
        let b = registry.register_asset("b.png", AssetType::Texture);
        let c = registry.register_asset("c.wav", AssetType::Audio);
        registry.add_dependency(a, b);
        registry.add_dependency(c, b);
        registry.update_source_hash(b, 1234);
        registry.update_import_settings(b, r#"{"srgb":false}"#);
        registry.mark_as_imported(a, "build/imported/a.atlas.json");
        registry.save().unwrap();

        let mut loaded = AssetRegistry::new(dir.path());
        assert_eq!(loaded.load(), 3);
        assert_eq!(loaded.get_all_asset_ids(), registry.get_all_asset_ids());
        for id in registry.get_all_asset_ids() {
            assert_eq!(loaded.get_metadata(id), registry.get_metadata(id));
        }
        let mut dependents = loaded.get_dependents(b);
        dependents.sort();
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(dependents, expected);
        assert_symmetric(&loaded);
    }

    #[test]
    fn test_save_reports_unwritable_imported_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/imported"), b"not a directory").unwrap();

        let mut registry = AssetRegistry::new(dir.path());
        registry.register_asset("a.png", AssetType::Texture);

        assert!(matches!(registry.save(), Err(AssetError::Io { .. })));
        assert!(dir.path().join("build/imported").is_file());
        assert!(!dir.path().join("build/imported/asset_registry.json.tmp").exists());
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let (dir, mut registry) = project();
        registry.register_asset("a.png", AssetType::Texture);
        // A directory in the way makes the final rename fail
        fs::create_dir_all(registry.registry_path().join("blocker")).unwrap();

        assert!(matches!(registry.save(), Err(AssetError::Io { .. })));
        assert!(!dir.path().join("build/imported/asset_registry.json.tmp").exists());
        assert!(registry.registry_path().is_dir());
    }

    #[test]
    fn test_corrupt_registry_starts_empty() {
        let (dir, mut registry) = project();
        registry.register_asset("a.png", AssetType::Texture);
        fs::write(dir.path().join("build/imported/asset_registry.json"), "{ not json").unwrap();

        assert!(registry.try_load().is_err());
        assert_eq!(registry.asset_count(), 1);
        assert_eq!(registry.load(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_drops_dangling_edges() {
        let (dir, mut registry) = project();
        let json = r#"{
  "version": 1,
  "assets": [
    { "id": "00000000-0000-0000-0000-000000000001", "sourcePath": "a.atlas", "type": "sprite_atlas",
      "dependencies": ["00000000-0000-0000-0000-000000000002", "00000000-0000-0000-0000-000000000009"] },
    { "id": "00000000-0000-0000-0000-000000000002", "sourcePath": "b.png", "type": "texture" },
    { "id": "00000000-0000-0000-0000-000000000003", "sourcePath": "b.png", "type": "texture" }
  ]
}"#;
        fs::write(dir.path().join("build/imported/asset_registry.json"), json).unwrap();

        assert_eq!(registry.load(), 2);
        let a = AssetId::from_u128(1);
        let b = AssetId::from_u128(2);
        assert_eq!(registry.get_dependencies(a), vec![b]);
        assert_eq!(registry.get_dependents(b), vec![a]);
        assert!(!registry.contains(AssetId::from_u128(3)));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let (dir, mut registry) = project();
        fs::write(
            dir.path().join("build/imported/asset_registry.json"),
            r#"{ "version": 7, "assets": [] }"#,
        )
        .unwrap();
        assert!(registry.try_load().is_err());
    }
}
