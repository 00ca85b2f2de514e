//! Toolchain environment and directory conventions.
//!
//! Provides the one explicit configuration value that every component is
//! constructed with, instead of reading the working directory or
//! environment variables ad hoc.
//!
//! ```text
//! $TERN_PATH/            # source root
//! ├── src/<import path>/ # package sources (*.src)
//! ├── pkg/<import path>.a # installed library archives
//! └── bin/<name>.js      # installed commands
//! $TERN_ROOT/lib/<import path>/ # standard packages (testing, flag, ...)
//! ```

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::Result;

/// Extension of linked artifacts.
pub const ARTIFACT_EXT: &str = "js";

const DEFAULT_BACKEND: &str = "tern-backend";
const DEFAULT_RUNTIME: &str = "node";

/// Resolved toolchain environment for one invocation.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Working directory, resolved once with symlinks evaluated.
    pub current_dir: PathBuf,

    /// Root of the user's workspace (`src/`, `pkg/`, `bin/`).
    pub source_root: PathBuf,

    /// Root of the toolchain installation (`lib/`).
    pub toolchain_root: PathBuf,

    /// Compiler backend program.
    pub backend: PathBuf,

    /// External runtime program used to execute artifacts.
    pub runtime: PathBuf,
}

impl Environment {
    /// Build an environment with default programs and the toolchain root
    /// equal to the source root.
    pub fn new(current_dir: impl Into<PathBuf>, source_root: impl Into<PathBuf>) -> Self {
        let source_root = source_root.into();
        Self {
            current_dir: current_dir.into(),
            toolchain_root: source_root.clone(),
            source_root,
            backend: PathBuf::from(DEFAULT_BACKEND),
            runtime: PathBuf::from(DEFAULT_RUNTIME),
        }
    }

    /// Detect the environment of the running process.
    ///
    /// Reads `TERN_PATH`, `TERN_ROOT`, `TERN_BACKEND` and `TERN_RUNTIME`.
    ///
    /// # Errors
    /// Returns an error if the working directory cannot be resolved.
    pub fn detect() -> Result<Self> {
        let current_dir = env::current_dir()
            .and_then(fs::canonicalize)
            .map_err(|e| {
                std::io::Error::new(e.kind(), format!("cannot determine the working directory: {e}"))
            })?;

        let source_root = env::var_os("TERN_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join("tern")))
            .unwrap_or_else(|| current_dir.clone());

        let toolchain_root = env::var_os("TERN_ROOT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(Self::detect_toolchain_root)
            .unwrap_or_else(|| source_root.clone());

        let mut env = Self::new(current_dir, source_root);
        env.toolchain_root = toolchain_root;
        if let Some(backend) = env::var_os("TERN_BACKEND").filter(|v| !v.is_empty()) {
            env.backend = PathBuf::from(backend);
        }
        if let Some(runtime) = env::var_os("TERN_RUNTIME").filter(|v| !v.is_empty()) {
            env.runtime = PathBuf::from(runtime);
        }

        tracing::debug!(
            "environment: cwd={} source_root={} toolchain_root={}",
            env.current_dir.display(),
            env.source_root.display(),
            env.toolchain_root.display()
        );
        Ok(env)
    }

    /// An installed toolchain keeps its binary in `<root>/bin/`.
    fn detect_toolchain_root() -> Option<PathBuf> {
        let exe = env::current_exe().ok()?;
        let root = exe.parent()?.parent()?;
        root.join("lib").is_dir().then(|| root.to_path_buf())
    }

    pub fn with_toolchain_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.toolchain_root = root.into();
        self
    }

    pub fn with_backend(mut self, backend: impl Into<PathBuf>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_runtime(mut self, runtime: impl Into<PathBuf>) -> Self {
        self.runtime = runtime.into();
        self
    }

    pub fn src_dir(&self) -> PathBuf {
        self.source_root.join("src")
    }

    pub fn pkg_dir(&self) -> PathBuf {
        self.source_root.join("pkg")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.source_root.join("bin")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.toolchain_root.join("lib")
    }

    /// Make `path` absolute against the working directory.
    pub fn absolute(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    /// Import path of `dir` under the source root's `src/`, if it is there.
    ///
    /// # Errors
    /// Returns an error if `src/` cannot be resolved.
    pub fn import_path_of(&self, dir: &Path) -> Result<Option<String>> {
        let src = fs::canonicalize(self.src_dir())?;
        let Ok(rel) = dir.strip_prefix(&src) else {
            return Ok(None);
        };
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            return Ok(None);
        }
        Ok(Some(segments.join("/")))
    }

    /// Path of `target` relative to the working directory, if derivable.
    pub fn relative(&self, target: &Path) -> Option<PathBuf> {
        relative_path(&self.current_dir, target)
    }
}

/// Lexical relative path from `base` to `target`.
///
/// Both must be absolute or both relative; otherwise there is no answer.
/// Equal paths give `.`.
pub fn relative_path(base: &Path, target: &Path) -> Option<PathBuf> {
    if base.is_absolute() != target.is_absolute() {
        return None;
    }
    let base = normalize(base);
    let target = normalize(target);

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if base[common..].iter().any(|c| *c == Component::ParentDir) {
        return None;
    }

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}

fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_inside_and_outside() {
        let base = Path::new("/work/proj");
        assert_eq!(
            relative_path(base, Path::new("/work/proj/src/a.src")),
            Some(PathBuf::from("src/a.src"))
        );
        assert_eq!(
            relative_path(base, Path::new("/work/other/b.src")),
            Some(PathBuf::from("../other/b.src"))
        );
        assert_eq!(relative_path(base, Path::new("/work/proj")), Some(PathBuf::from(".")));
    }

    #[test]
    fn test_relative_mixed_is_none() {
        assert_eq!(relative_path(Path::new("/work"), Path::new("a.src")), None);
    }

    #[test]
    fn test_import_path_of() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = fs::canonicalize(temp.path()).unwrap();
        let pkg_dir = root.join("src").join("example.com").join("hello");
        fs::create_dir_all(&pkg_dir).unwrap();

        let env = Environment::new(&root, &root);
        assert_eq!(
            env.import_path_of(&pkg_dir).unwrap(),
            Some("example.com/hello".to_string())
        );
        assert_eq!(env.import_path_of(&root).unwrap(), None);
        assert_eq!(env.import_path_of(&root.join("src")).unwrap(), None);
    }

    #[test]
    fn test_layout() {
        let env = Environment::new("/cwd", "/ws").with_toolchain_root("/opt/tern");
        assert_eq!(env.src_dir(), PathBuf::from("/ws/src"));
        assert_eq!(env.bin_dir(), PathBuf::from("/ws/bin"));
        assert_eq!(env.pkg_dir(), PathBuf::from("/ws/pkg"));
        assert_eq!(env.lib_dir(), PathBuf::from("/opt/tern/lib"));
        assert_eq!(env.absolute("a.src"), PathBuf::from("/cwd/a.src"));
    }
}
