//! File system watcher for hot-reload
//!
//! Wraps a notify watcher. Events are debounced per path on the notify thread
//! and queued on a channel until [`FileWatcher::poll`] drains them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use void_asset::{AssetError, AssetResult};

/// A file change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path to the changed file
    pub path: PathBuf,
    /// Type of change
    pub kind: FileChangeKind,
}

/// Type of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    /// File was created
    Created,
    /// File was modified
    Modified,
    /// File was deleted
    Deleted,
}

impl FileChangeKind {
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Drops repeated events for one path inside the debounce window
struct DebounceState {
    last_event: HashMap<PathBuf, Instant>,
    debounce_duration: Duration,
}

impl DebounceState {
    fn new(debounce_duration: Duration) -> Self {
        Self {
            last_event: HashMap::new(),
            debounce_duration,
        }
    }

    fn should_trigger(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_event.get(path) {
            if now.duration_since(*last) < self.debounce_duration {
                return false;
            }
        }
        self.last_event.insert(path.to_path_buf(), now);
        true
    }

    /// Forget paths that have been quiet for a while
    fn prune(&mut self, now: Instant) {
        let keep = self.debounce_duration.max(Duration::from_secs(5));
        self.last_event.retain(|_, time| now.duration_since(*time) < keep);
    }
}

/// File watcher that monitors directories for changes
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    rx: Receiver<FileChange>,
    debounce: Arc<Mutex<DebounceState>>,
    watch_dirs: Vec<PathBuf>,
}

impl FileWatcher {
    /// Create a watcher with the given debounce window
    pub fn new(debounce: Duration) -> AssetResult<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let debounce = Arc::new(Mutex::new(DebounceState::new(debounce)));
        let debounce_clone = debounce.clone();

        let watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => Self::handle_event(event, &tx, &debounce_clone),
            Err(e) => log::warn!("File watcher error: {}", e),
        })
        .map_err(|e| AssetError::Watch(format!("Failed to create file watcher: {}", e)))?;

        Ok(Self {
            watcher,
            rx,
            debounce,
            watch_dirs: Vec::new(),
        })
    }

    fn handle_event(event: Event, sender: &Sender<FileChange>, debounce: &Mutex<DebounceState>) {
        let Some(kind) = FileChangeKind::from_event(&event.kind) else {
            return;
        };

        let now = Instant::now();
        let mut debounce = debounce.lock();
        for path in event.paths {
            if path.is_dir() || Self::is_hidden(&path) {
                continue;
            }
            if debounce.should_trigger(&path, now) {
                let _ = sender.send(FileChange { path, kind });
            }
        }
    }

    /// Editor swap files and other dot files never carry asset changes
    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with('.') || n.ends_with('~'))
    }

    /// Watch a directory recursively, creating it if missing
    pub fn watch(&mut self, dir: impl AsRef<Path>) -> AssetResult<()> {
        let path = dir.as_ref().to_path_buf();

        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| AssetError::io(&path, e))?;
        }

        self.watcher
            .watch(&path, RecursiveMode::Recursive)
            .map_err(|e| AssetError::Watch(format!("Failed to watch {:?}: {}", path, e)))?;

        log::info!("Watching directory: {:?}", path);
        self.watch_dirs.push(path);
        Ok(())
    }

    /// Drain queued changes
    pub fn poll(&mut self) -> Vec<FileChange> {
        let changes: Vec<FileChange> = self.rx.try_iter().collect();
        self.debounce.lock().prune(Instant::now());
        changes
    }

    /// Get the list of watched directories
    pub fn watch_dirs(&self) -> &[PathBuf] {
        &self.watch_dirs
    }

    /// Set debounce duration
    pub fn set_debounce(&mut self, duration: Duration) {
        self.debounce.lock().debounce_duration = duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_debounce_window() {
        let mut state = DebounceState::new(Duration::from_millis(100));
        let start = Instant::now();
        let path = Path::new("a.png");

        assert!(state.should_trigger(path, start));
        assert!(!state.should_trigger(path, start + Duration::from_millis(50)));
        assert!(state.should_trigger(Path::new("b.png"), start + Duration::from_millis(50)));
        assert!(state.should_trigger(path, start + Duration::from_millis(150)));

        state.prune(start + Duration::from_secs(60));
        assert!(state.last_event.is_empty());
    }

    #[test]
    fn test_hidden_files() {
        assert!(FileWatcher::is_hidden(Path::new("assets/.a.png.swp")));
        assert!(FileWatcher::is_hidden(Path::new("assets/a.png~")));
        assert!(!FileWatcher::is_hidden(Path::new("assets/a.png")));
    }

    #[test]
    fn test_watch_creates_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("assets/new");

        let mut watcher = FileWatcher::new(Duration::from_millis(10)).unwrap();
        watcher.watch(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(watcher.watch_dirs(), &[target]);

        watcher.set_debounce(Duration::from_secs(1));
        assert_eq!(watcher.debounce.lock().debounce_duration, Duration::from_secs(1));
    }
}
