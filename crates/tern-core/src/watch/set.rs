//! The set of paths a build depends on.
//!
//! Every path is stamped when it is first registered, which happens before
//! the build reads it. Comparing stamps later catches edits made while the
//! build was still running, before any watcher was listening.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::package::has_source_suffix;

/// What a registered path looked like when it was added.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stamp {
    Missing,
    File(Option<SystemTime>),
    Dir {
        modified: Option<SystemTime>,
        sources: BTreeMap<PathBuf, Option<SystemTime>>,
    },
}

impl Stamp {
    fn take(path: &Path) -> Self {
        match fs::metadata(path) {
            Err(_) => Stamp::Missing,
            Ok(meta) if meta.is_dir() => Stamp::Dir {
                modified: meta.modified().ok(),
                sources: sources_in(path),
            },
            Ok(meta) => Stamp::File(meta.modified().ok()),
        }
    }
}

/// Files and package directories registered during one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    paths: BTreeMap<PathBuf, Stamp>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path`. A path registered twice keeps its first stamp.
    pub fn add(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains_key(&path) {
            let stamp = Stamp::take(&path);
            self.paths.insert(path, stamp);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.keys().map(PathBuf::as_path)
    }

    /// Directories that must be watched to observe every registered path.
    ///
    /// A path that does not exist yet is observed through its nearest
    /// existing ancestor.
    pub fn directories(&self) -> BTreeSet<PathBuf> {
        self.paths.keys().map(|path| watch_target(path)).collect()
    }

    /// Whether a change to `changed` may be relevant to the build.
    ///
    /// A registered file matches only itself; a registered directory matches
    /// the source files directly inside it. Ancestors of a registered path
    /// match too, so creating a missing package directory is seen.
    pub fn matches(&self, changed: &Path) -> bool {
        if self.paths.contains_key(changed) {
            return true;
        }
        if has_source_suffix(changed)
            && changed
                .parent()
                .is_some_and(|dir| self.paths.contains_key(dir))
        {
            return true;
        }
        self.paths.keys().any(|path| path.starts_with(changed))
    }

    /// First registered path that no longer matches its stamp.
    ///
    /// Only stats files. A directory is listed again only when its own
    /// modification time moved; if its sources are unchanged the new time is
    /// kept so the next check stays cheap.
    pub fn changed(&mut self) -> Option<PathBuf> {
        for (path, stamp) in self.paths.iter_mut() {
            match stamp {
                Stamp::Missing => {
                    if path.exists() {
                        return Some(path.clone());
                    }
                }
                Stamp::File(modified) => {
                    if modified_time(path) != *modified || !path.is_file() {
                        return Some(path.clone());
                    }
                }
                Stamp::Dir { modified, sources } => {
                    if !path.is_dir() {
                        return Some(path.clone());
                    }
                    if let Some(file) = sources
                        .iter()
                        .find(|(file, time)| modified_time(file) != **time)
                        .map(|(file, _)| file.clone())
                    {
                        return Some(file);
                    }
                    let now = modified_time(path);
                    if now != *modified {
                        if !sources.keys().eq(sources_in(path).keys()) {
                            return Some(path.clone());
                        }
                        *modified = now;
                    }
                }
            }
        }
        None
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn sources_in(dir: &Path) -> BTreeMap<PathBuf, Option<SystemTime>> {
    let Ok(entries) = fs::read_dir(dir) else {
        return BTreeMap::new();
    };
    entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| has_source_suffix(path) && path.is_file())
        .map(|path| {
            let time = modified_time(&path);
            (path, time)
        })
        .collect()
}

fn watch_target(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    path.ancestors()
        .skip(1)
        .find(|dir| dir.is_dir())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}
