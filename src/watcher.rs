use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::SketchError;

/// Collects changed files from a notify watcher so the frame loop can drain
/// them without blocking.
///
/// Directories are reference counted: the shader directory and the
/// directories of input textures may coincide, and a directory is only
/// unwatched when nothing needs it anymore.
pub struct ReloadDispatcher {
    watcher: RecommendedWatcher,
    changes: Receiver<PathBuf>,
    watched: HashMap<PathBuf, usize>,
}

impl ReloadDispatcher {
    pub fn new() -> Result<Self, SketchError> {
        let (tx, rx) = channel::<PathBuf>();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => log::warn!("[hot-reload] watch error: {}", e),
            },
            notify::Config::default(),
        )?;

        Ok(Self {
            watcher,
            changes: rx,
            watched: HashMap::new(),
        })
    }

    pub fn watch(&mut self, dir: &Path) -> Result<(), SketchError> {
        if let Some(count) = self.watched.get_mut(dir) {
            *count += 1;
            return Ok(());
        }
        self.watcher.watch(dir, RecursiveMode::Recursive)?;
        log::info!("[hot-reload] watching {}", dir.display());
        self.watched.insert(dir.to_path_buf(), 1);
        Ok(())
    }

    pub fn unwatch(&mut self, dir: &Path) {
        let Some(count) = self.watched.get_mut(dir) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.watched.remove(dir);
            if let Err(e) = self.watcher.unwatch(dir) {
                log::warn!("[hot-reload] failed to unwatch {}: {}", dir.display(), e);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_watching(&self, dir: &Path) -> bool {
        self.watched.contains_key(dir)
    }

    /// Everything reported since the last call, oldest first, each path once.
    pub fn drain_changes(&self) -> Vec<PathBuf> {
        drain_unique(&self.changes)
    }
}

fn drain_unique(rx: &Receiver<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut changes = Vec::new();
    while let Ok(path) = rx.try_recv() {
        if seen.insert(path.clone()) {
            changes.push(path);
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn drain_keeps_order_and_drops_repeats() {
        let (tx, rx) = channel();
        for name in ["a.wgsl", "b.png", "a.wgsl", "c.wgsl", "b.png"] {
            tx.send(PathBuf::from(name)).unwrap();
        }
        assert_eq!(
            drain_unique(&rx),
            vec![PathBuf::from("a.wgsl"), PathBuf::from("b.png"), PathBuf::from("c.wgsl")]
        );
        assert!(drain_unique(&rx).is_empty());
    }

    #[test]
    fn directories_are_reference_counted() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = ReloadDispatcher::new().unwrap();

        dispatcher.watch(dir.path()).unwrap();
        dispatcher.watch(dir.path()).unwrap();
        dispatcher.unwatch(dir.path());
        assert!(dispatcher.is_watching(dir.path()));
        dispatcher.unwatch(dir.path());
        assert!(!dispatcher.is_watching(dir.path()));

        // unbalanced unwatch is ignored
        dispatcher.unwatch(dir.path());
    }

    #[test]
    fn watching_a_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = ReloadDispatcher::new().unwrap();
        assert!(dispatcher.watch(&dir.path().join("gone")).is_err());
    }

    #[test]
    fn reports_files_written_in_a_watched_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let mut dispatcher = ReloadDispatcher::new().unwrap();
        dispatcher.watch(&root).unwrap();

        let shader = root.join("sketch.wgsl");
        std::fs::write(&shader, "// v1").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while Instant::now() < deadline && !seen.contains(&shader) {
            seen.extend(dispatcher.drain_changes());
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(seen.contains(&shader), "no change reported, got {:?}", seen);
    }
}
