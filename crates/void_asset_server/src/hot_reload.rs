//! Hot-reload manager
//!
//! Watches individual asset source files and calls a reload handler when one
//! changes. Change detection compares the file's modification time and size
//! against the last observed values on every [`HotReloadManager::poll`]. With
//! the `file-watcher` feature, an attached [`FileWatcher`] additionally queues
//! paths the OS reported as changed, which catches edits that keep both the
//! size and the timestamp.
//!
//! Per-asset state machine:
//!
//! ```text
//! Unwatched --watch_asset--> Watching --change--> Reloading --ok--> Watching
//!                                                           --err-> WatchingWithError
//! ```
//!
//! A failed reload keeps the asset watched; the next change retries it.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

#[cfg(feature = "file-watcher")]
use std::collections::HashMap;
#[cfg(feature = "file-watcher")]
use std::time::Duration;

use void_asset::metadata::unix_now;
use void_asset::{AssetId, FileStamp, HotReloadConfig};

#[cfg(feature = "file-watcher")]
use crate::watcher::{FileChangeKind, FileWatcher};
#[cfg(feature = "file-watcher")]
use void_asset::AssetResult;

/// Watch state of one asset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WatchState {
    #[default]
    Unwatched,
    Watching,
    Reloading,
    /// Still watched; the last reload failed
    WatchingWithError,
}

/// Outcome of one reload attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReloadEvent {
    pub asset_id: AssetId,
    pub path: PathBuf,
    pub success: bool,
    /// Failure message (empty on success)
    pub error: String,
    /// Unix seconds
    pub timestamp: u64,
}

/// Performs the engine-specific reload; `false` marks the attempt failed
pub type ReloadHandler = Box<dyn FnMut(AssetId) -> bool>;

/// Observer fired after every reload attempt
pub type AfterReloadCallback = Box<dyn FnMut(&ReloadEvent)>;

struct WatchEntry {
    path: PathBuf,
    stamp: Option<FileStamp>,
    state: WatchState,
    last_error: Option<String>,
}

/// Caller-owned hot-reload loop
pub struct HotReloadManager {
    config: HotReloadConfig,
    watches: BTreeMap<AssetId, WatchEntry>,
    pending: VecDeque<AssetId>,
    pending_set: HashSet<AssetId>,
    history: VecDeque<ReloadEvent>,
    total_reloads: u64,
    failed_reloads: u64,
    handler: Option<ReloadHandler>,
    after_reload: Option<AfterReloadCallback>,
    #[cfg(feature = "file-watcher")]
    file_watcher: Option<FileWatcher>,
    /// Every asset watching a path
    #[cfg(feature = "file-watcher")]
    path_index: HashMap<PathBuf, Vec<AssetId>>,
}

impl HotReloadManager {
    /// Create a manager with the given limits
    pub fn new(config: HotReloadConfig) -> Self {
        Self {
            config,
            watches: BTreeMap::new(),
            pending: VecDeque::new(),
            pending_set: HashSet::new(),
            history: VecDeque::new(),
            total_reloads: 0,
            failed_reloads: 0,
            handler: None,
            after_reload: None,
            #[cfg(feature = "file-watcher")]
            file_watcher: None,
            #[cfg(feature = "file-watcher")]
            path_index: HashMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &HotReloadConfig {
        &self.config
    }

    /// Start watching `path` for asset `id`.
    ///
    /// The current file state becomes the baseline, so only later edits
    /// trigger a reload. Watching an already watched id replaces its path.
    pub fn watch_asset(&mut self, id: AssetId, path: impl Into<PathBuf>) -> bool {
        if !id.is_valid() {
            log::warn!("Refusing to watch the nil asset id");
            return false;
        }
        let path = path.into();
        self.unwatch(id);

        #[cfg(feature = "file-watcher")]
        self.path_index.entry(Self::index_key(&path)).or_default().push(id);

        log::debug!("Watching {} at {:?}", id, path);
        self.watches.insert(
            id,
            WatchEntry {
                stamp: FileStamp::read(&path),
                path,
                state: WatchState::Watching,
                last_error: None,
            },
        );
        true
    }

    /// Stop watching one asset; drops any queued reload for it
    pub fn unwatch(&mut self, id: AssetId) -> bool {
        let Some(_entry) = self.watches.remove(&id) else {
            return false;
        };
        #[cfg(feature = "file-watcher")]
        {
            let key = Self::index_key(&_entry.path);
            if let Some(ids) = self.path_index.get_mut(&key) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    self.path_index.remove(&key);
                }
            }
        }
        if self.pending_set.remove(&id) {
            self.pending.retain(|p| *p != id);
        }
        true
    }

    /// Stop watching everything
    pub fn unwatch_all(&mut self) {
        self.watches.clear();
        self.pending.clear();
        self.pending_set.clear();
        #[cfg(feature = "file-watcher")]
        self.path_index.clear();
    }

    /// Install the reload handler
    pub fn set_reload_handler(&mut self, handler: impl FnMut(AssetId) -> bool + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Install the observer fired after every reload attempt
    pub fn set_after_reload_callback(&mut self, callback: impl FnMut(&ReloadEvent) + 'static) {
        self.after_reload = Some(Box::new(callback));
    }

    /// Global on/off switch
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Whether `poll` does anything
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Queue a reload without waiting for a file change
    pub fn force_reload(&mut self, id: AssetId) -> bool {
        if !self.watches.contains_key(&id) {
            return false;
        }
        self.enqueue(id);
        true
    }

    /// State of one asset (`Unwatched` for unknown ids)
    pub fn watch_state(&self, id: AssetId) -> WatchState {
        self.watches.get(&id).map(|w| w.state).unwrap_or_default()
    }

    pub fn is_watching(&self, id: AssetId) -> bool {
        self.watches.contains_key(&id)
    }

    pub fn watched_count(&self) -> usize {
        self.watches.len()
    }

    /// Path watched for `id`
    pub fn watched_path(&self, id: AssetId) -> Option<&Path> {
        self.watches.get(&id).map(|w| w.path.as_path())
    }

    /// Error of the last failed reload, cleared by a successful one
    pub fn last_error(&self, id: AssetId) -> Option<&str> {
        self.watches.get(&id).and_then(|w| w.last_error.as_deref())
    }

    /// Recent reload attempts, oldest first
    pub fn history(&self) -> &VecDeque<ReloadEvent> {
        &self.history
    }

    pub fn total_reloads(&self) -> u64 {
        self.total_reloads
    }

    pub fn failed_reloads(&self) -> u64 {
        self.failed_reloads
    }

    /// Changes detected but not yet processed
    pub fn pending_reload_count(&self) -> usize {
        self.pending.len()
    }

    /// Zero the counters and clear the history
    pub fn reset_stats(&mut self) {
        self.total_reloads = 0;
        self.failed_reloads = 0;
        self.history.clear();
    }

    /// Attach an OS file watcher over `dir`
    #[cfg(feature = "file-watcher")]
    pub fn enable_file_watcher(&mut self, dir: impl AsRef<Path>) -> AssetResult<()> {
        let debounce = Duration::from_millis(self.config.debounce_ms);
        let watcher = match self.file_watcher.take() {
            Some(watcher) => watcher,
            None => FileWatcher::new(debounce)?,
        };
        self.file_watcher.insert(watcher).watch(dir)
    }

    /// Whether an OS file watcher is attached
    #[cfg(feature = "file-watcher")]
    pub fn has_file_watcher(&self) -> bool {
        self.file_watcher.is_some()
    }

    /// Detect changes and run queued reloads.
    ///
    /// At most `max_reloads_per_poll` reloads run per call (0 = no limit); the
    /// rest stay queued for the next poll. Returns the number of attempts.
    pub fn poll(&mut self) -> usize {
        if !self.config.enabled {
            return 0;
        }

        #[cfg(feature = "file-watcher")]
        self.drain_file_watcher();

        let mut changed = Vec::new();
        for (id, entry) in self.watches.iter_mut() {
            // A missing file is not a change; its return is
            if let Some(stamp) = FileStamp::read(&entry.path) {
                if entry.stamp != Some(stamp) {
                    entry.stamp = Some(stamp);
                    changed.push(*id);
                }
            }
        }
        for id in changed {
            self.enqueue(id);
        }

        let limit = match self.config.max_reloads_per_poll {
            0 => usize::MAX,
            n => n,
        };
        let mut attempts = 0;
        while attempts < limit {
            let Some(id) = self.pending.pop_front() else {
                break;
            };
            self.pending_set.remove(&id);
            if self.reload(id) {
                attempts += 1;
            }
        }
        attempts
    }

    /// Run one reload; `false` if the asset is no longer watched
    fn reload(&mut self, id: AssetId) -> bool {
        let Some(entry) = self.watches.get_mut(&id) else {
            return false;
        };
        entry.state = WatchState::Reloading;
        let path = entry.path.clone();

        let error = match self.handler.as_mut() {
            Some(handler) => (!handler(id)).then(|| "reload handler reported failure".to_string()),
            None => Some("no reload handler installed".to_string()),
        };

        if let Some(entry) = self.watches.get_mut(&id) {
            entry.state = if error.is_none() {
                WatchState::Watching
            } else {
                WatchState::WatchingWithError
            };
            entry.last_error = error.clone();
        }

        self.total_reloads += 1;
        match &error {
            None => log::info!("Hot-reloaded {:?}", path),
            Some(e) => {
                self.failed_reloads += 1;
                log::warn!("Hot-reload of {:?} failed: {}", path, e);
            }
        }

        let event = ReloadEvent {
            asset_id: id,
            path,
            success: error.is_none(),
            error: error.unwrap_or_default(),
            timestamp: unix_now(),
        };
        if let Some(callback) = self.after_reload.as_mut() {
            callback(&event);
        }
        self.push_history(event);
        true
    }

    fn push_history(&mut self, event: ReloadEvent) {
        if self.config.max_history == 0 {
            return;
        }
        while self.history.len() >= self.config.max_history {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    fn enqueue(&mut self, id: AssetId) {
        if self.pending_set.insert(id) {
            self.pending.push_back(id);
        }
    }

    #[cfg(feature = "file-watcher")]
    fn drain_file_watcher(&mut self) {
        let Some(watcher) = self.file_watcher.as_mut() else {
            return;
        };
        for change in watcher.poll() {
            if change.kind == FileChangeKind::Deleted {
                continue;
            }
            let Some(ids) = self.path_index.get(&Self::index_key(&change.path)) else {
                continue;
            };
            for &id in ids {
                if let Some(entry) = self.watches.get_mut(&id) {
                    entry.stamp = FileStamp::read(&entry.path);
                    if self.pending_set.insert(id) {
                        self.pending.push_back(id);
                    }
                }
            }
        }
    }

    /// Watcher events carry absolute, resolved paths
    #[cfg(feature = "file-watcher")]
    fn index_key(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }
}

impl Default for HotReloadManager {
    fn default() -> Self {
        Self::new(HotReloadConfig::default())
    }
}
