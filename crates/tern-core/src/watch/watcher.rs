//! File watcher for detecting source changes.
//!
//! Watches the directories behind a [`WatchSet`] and reports changed paths
//! that belong to it.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use notify_debouncer_mini::{DebounceEventResult, new_debouncer, notify::RecursiveMode};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

use super::set::WatchSet;

/// Blocks until something in a watch set changes.
pub trait ChangeWaiter {
    /// Resolve with the first changed path that belongs to `set`.
    fn wait_for_change(&mut self, set: &WatchSet) -> impl Future<Output = Result<PathBuf>>;
}

/// File watcher handle.
pub struct FileWatcher {
    /// Debouncer handle (kept alive to maintain watcher).
    debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// Directories registered with the debouncer.
    watched: BTreeSet<PathBuf>,
    /// Receiver for changed paths.
    rx: mpsc::UnboundedReceiver<PathBuf>,
}

impl FileWatcher {
    /// Start watching every directory needed to observe `set`.
    pub fn new(set: &WatchSet) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let filter = set.clone();

        let debouncer = new_debouncer(
            Duration::from_millis(200),
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        if filter.matches(&event.path) {
                            let _ = tx.send(event.path);
                        }
                    }
                }
                Err(e) => tracing::warn!("watch error: {}", e),
            },
        )
        .map_err(|e| Error::Watch(e.to_string()))?;

        let mut watcher = Self {
            debouncer,
            watched: BTreeSet::new(),
            rx,
        };
        watcher.watch_directories(set)?;
        Ok(watcher)
    }

    /// Watch directories of `set` not yet watched, such as a package
    /// directory created since the watcher started.
    pub fn watch_directories(&mut self, set: &WatchSet) -> Result<()> {
        for dir in set.directories() {
            if self.watched.contains(&dir) {
                continue;
            }
            self.debouncer
                .watcher()
                .watch(&dir, RecursiveMode::NonRecursive)
                .map_err(|e| Error::Watch(format!("{}: {}", dir.display(), e)))?;
            tracing::debug!("watching {}", dir.display());
            self.watched.insert(dir);
        }
        Ok(())
    }

    /// Receive the next relevant change.
    pub async fn recv(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }
}

/// [`ChangeWaiter`] backed by a fresh [`FileWatcher`] per wait.
///
/// Before blocking it compares the set against the stamps taken during the
/// build, so an edit saved mid-build triggers the next pass at once. Events
/// that leave every stamp intact (a file merely opened) are skipped. A build
/// that registered nothing falls back to watching `fallback`.
#[derive(Debug, Clone)]
pub struct NotifyWaiter {
    fallback: PathBuf,
}

impl NotifyWaiter {
    pub fn new(fallback: impl Into<PathBuf>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }
}

impl ChangeWaiter for NotifyWaiter {
    async fn wait_for_change(&mut self, set: &WatchSet) -> Result<PathBuf> {
        let mut set = if set.is_empty() {
            tracing::debug!("nothing registered, watching {}", self.fallback.display());
            let mut fallback = WatchSet::new();
            fallback.add(&self.fallback);
            fallback
        } else {
            set.clone()
        };

        let mut watcher = FileWatcher::new(&set)?;
        loop {
            if let Some(path) = set.changed() {
                return Ok(path);
            }
            let touched = watcher
                .recv()
                .await
                .ok_or_else(|| Error::Watch("watcher stopped".to_string()))?;
            tracing::trace!("{} touched, sources unchanged", touched.display());
            watcher.watch_directories(&set)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_watcher_creation() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("main.src");
        fs::write(&file, "package main\n").unwrap();

        let mut set = WatchSet::new();
        set.add(&file);
        assert!(FileWatcher::new(&set).is_ok());
    }

    #[tokio::test]
    async fn test_edit_before_waiting_is_seen() {
        let temp = TempDir::new().unwrap();
        let file = fs::canonicalize(temp.path()).unwrap().join("main.src");
        fs::write(&file, "package main\n").unwrap();

        let mut set = WatchSet::new();
        set.add(&file);
        fs::write(&file, "package main\n\nfunc main()\n").unwrap();
        fs::File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        let changed = tokio::time::timeout(
            Duration::from_secs(5),
            NotifyWaiter::new(temp.path()).wait_for_change(&set),
        )
        .await
        .expect("an earlier edit should not block")
        .unwrap();
        assert_eq!(changed, file);
    }

    #[tokio::test]
    async fn test_empty_set_watches_fallback() {
        let temp = TempDir::new().unwrap();
        let dir = fs::canonicalize(temp.path()).unwrap();
        let file = dir.join("main.src");

        let writer = {
            let file = file.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                fs::write(&file, "package main\n").unwrap();
            })
        };

        let changed = tokio::time::timeout(
            Duration::from_secs(10),
            NotifyWaiter::new(&dir).wait_for_change(&WatchSet::new()),
        )
        .await
        .expect("a new source file should end the wait")
        .unwrap();
        writer.await.unwrap();
        assert_eq!(changed, dir);
    }
}
