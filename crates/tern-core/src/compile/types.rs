//! Common types for the compilation pipeline.

use crate::package::PackageMetadata;

use super::archive::Archive;

/// Configuration for a build session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Print the import path of each package as it is compiled.
    pub verbose: bool,

    /// Ask the backend for minified code.
    pub minify: bool,

    /// Record watched paths so the caller can wait for changes.
    pub watch: bool,

    /// Write a `.map` file next to each command artifact.
    pub create_map_file: bool,
}

impl BuildOptions {
    /// Options for `build` and `install`, which emit artifact maps.
    pub fn with_map_file(self) -> Self {
        Self {
            create_map_file: true,
            ..self
        }
    }
}

/// Everything the backend needs to compile one package.
#[derive(Debug)]
pub struct CompileRequest<'a> {
    /// Package metadata, with the exact file list to compile.
    pub package: &'a PackageMetadata,

    /// Archives of every package in the dependency closure.
    pub dependencies: Vec<&'a Archive>,

    pub minify: bool,
}
