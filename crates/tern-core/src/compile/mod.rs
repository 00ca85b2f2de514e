//! Compilation pipeline for tern packages.
//!
//! This module provides:
//! - The compiler backend facade (external program, JSON over stdio)
//! - Archives and declaration ids for dead-code elimination
//! - Positioned diagnostics
//! - The linker that turns a dependency closure into one artifact
//!
//! # Architecture
//!
//! ```text
//! PackageMetadata ──► Compiler (backend) ──► Archive ──┐
//!                                                       ├──► link ──► artifact (+ .map)
//! dependency closure (Archive::dependencies) ──────────┘
//! ```

mod archive;
mod backend;
mod diagnostics;
mod link;
mod types;

pub use archive::{Archive, Decl, DepId};
pub use backend::{Compiler, ProcessCompiler};
pub use diagnostics::{BackendDiagnostic, Diagnostic, Position};
pub use link::{ArtifactMap, LinkedArtifact, MapEntry, link, live_ids};
pub(crate) use link::quote;
pub use types::{BuildOptions, CompileRequest};
