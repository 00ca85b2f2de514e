//! Compiled package archives.
//!
//! An [`Archive`] is the backend's output for one package: its declarations
//! (with the ids they depend on, for dead-code elimination), the test
//! functions it registered, and the package-level dependency closure that
//! the session maintains on top.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a declaration for dead-code elimination: `<import path>:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepId(String);

impl DepId {
    pub fn new(import_path: &str, name: &str) -> Self {
        Self(format!("{import_path}:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DepId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for DepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single top-level declaration in generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decl {
    /// DCE id. `None` means the declaration is always linked.
    #[serde(default)]
    pub id: Option<DepId>,

    /// Ids this declaration needs when it is linked.
    #[serde(default)]
    pub deps: Vec<DepId>,

    /// Generated code.
    #[serde(default)]
    pub body: String,
}

/// Compiled unit for one package. Immutable once stored in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub import_path: String,

    pub name: String,

    /// Direct imports, in source order.
    #[serde(default)]
    pub imports: Vec<String>,

    /// Package-level dependency closure; each entry follows its own dependencies.
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub declarations: Vec<Decl>,

    /// Names of test functions discovered in the package, in source order.
    #[serde(default)]
    pub tests: Vec<String>,

    #[serde(default)]
    pub minified: bool,
}

impl Archive {
    /// An empty archive for a package assembled in memory rather than compiled.
    pub fn synthetic(import_path: &str, name: &str, minified: bool) -> Self {
        Self {
            import_path: import_path.to_string(),
            name: name.to_string(),
            minified,
            ..Self::default()
        }
    }

    /// Append a package to the dependency closure unless already present.
    pub fn add_dependency(&mut self, import_path: &str) {
        if !self.dependencies.iter().any(|dep| dep == import_path) {
            self.dependencies.push(import_path.to_string());
        }
    }

    /// Pull in another archive's whole closure followed by the archive itself.
    pub fn add_dependencies_of(&mut self, other: &Archive) {
        for dep in &other.dependencies {
            self.add_dependency(dep);
        }
        self.add_dependency(&other.import_path);
    }
}
