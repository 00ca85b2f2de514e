//! Core engine for the tern cross-compiler toolchain.
//!
//! This crate provides:
//! - Package resolution under the source-root convention
//! - Compilation sessions against an external compiler backend
//! - Linking with dead-code elimination
//! - Test harness synthesis
//! - Runtime invocation and diagnostic normalization
//! - Watch mode

pub mod compile;
pub mod error;
pub mod execute;
pub mod harness;
pub mod package;
pub mod paths;
pub mod report;
pub mod session;
pub mod watch;

pub use compile::{Archive, BuildOptions, Compiler, Decl, DepId, Diagnostic, ProcessCompiler};
pub use error::{Error, ErrorKind, Result};
pub use execute::{RuntimeInvoker, TempArtifact};
pub use harness::{TestEntry, TestOutcome, TestProgram, run_package, runtime_args, synthesize};
pub use package::{PackageMetadata, PackageRecord, Resolver};
pub use paths::{ARTIFACT_EXT, Environment};
pub use report::Reporter;
pub use session::Session;
pub use watch::{BuildPass, ChangeWaiter, LoopOutcome, NotifyWaiter, WatchSet, rebuild_loop};
