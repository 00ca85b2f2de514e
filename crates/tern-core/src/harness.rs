//! Test harness synthesis.
//!
//! A package's tests run through a synthetic `main` package that is never
//! compiled from source. Its only declaration calls the testing package's
//! entry point with the discovered test names and the functions they refer
//! to. Both come from one list of [`TestEntry`] values so they cannot drift
//! apart.

use std::path::Path;
use std::sync::Arc;

use crate::compile::{Archive, Decl, DepId, quote};
use crate::error::Result;
use crate::execute::{RuntimeInvoker, TempArtifact};
use crate::package::{MAIN_PACKAGE, PackageMetadata, PackageRecord};
use crate::session::Session;

/// Import path of the testing support package.
pub const TESTING_PACKAGE: &str = "testing";

/// Entry point that makes runtime test flags visible to the program.
const FLAG_PARSE: &str = "flag:Parse";

/// A discovered test function and the package that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    pub name: String,
    pub package: String,
}

impl TestEntry {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
        }
    }

    /// Expression that evaluates to the test function at runtime.
    pub fn reference(&self) -> String {
        format!("$packages[{}].{}", quote(&self.package), self.name)
    }

    pub fn dep_id(&self) -> DepId {
        DepId::new(&self.package, &self.name)
    }
}

/// Whether `name` has the shape of a test function: `Test`, optionally
/// followed by a suffix that does not start with a lowercase letter.
pub fn is_test_name(name: &str) -> bool {
    match name.strip_prefix("Test") {
        Some(rest) => !rest.chars().next().is_some_and(char::is_lowercase),
        None => false,
    }
}

/// A synthesized test program, ready to link.
#[derive(Debug, Clone)]
pub struct TestProgram {
    /// The package under test.
    pub subject: PackageMetadata,

    /// Tests in run order: primary package first, then the external test package.
    pub entries: Vec<TestEntry>,

    /// The synthetic `main` record.
    pub record: PackageRecord,
}

/// Compile `package` with its tests and build the program that runs them.
///
/// Returns `None` when the package has no test files at all.
pub fn synthesize(session: &mut Session, package: &PackageMetadata) -> Result<Option<TestProgram>> {
    if !package.has_tests() {
        return Ok(None);
    }

    let testing = session.import_package(TESTING_PACKAGE)?;
    let primary = session.build_package(package.with_tests_included())?;
    let external = match package.external_tests() {
        Some(xtest) => Some(session.build_package(xtest)?),
        None => None,
    };

    let mut entries = collect_tests(&primary);
    if let Some(external) = &external {
        entries.extend(collect_tests(external));
    }
    tracing::debug!(
        "{}: {} tests ({})",
        package.import_path,
        entries.len(),
        if external.is_some() { "with external tests" } else { "no external tests" }
    );

    let mut archive = Archive::synthetic(MAIN_PACKAGE, MAIN_PACKAGE, session.options().minify);
    archive.imports = vec![TESTING_PACKAGE.to_string(), package.import_path.clone()];
    archive.add_dependencies_of(&testing);
    archive.add_dependencies_of(&primary);
    if let Some(external) = &external {
        archive.imports.push(external.import_path.clone());
        archive.add_dependencies_of(external);
    }

    let mut deps: Vec<DepId> = entries.iter().map(TestEntry::dep_id).collect();
    deps.push(DepId::from(FLAG_PARSE));
    archive.declarations = vec![Decl {
        id: None,
        deps,
        body: main_body(&package.import_path, &package.dir, &entries),
    }];

    let metadata = PackageMetadata {
        import_path: MAIN_PACKAGE.to_string(),
        name: MAIN_PACKAGE.to_string(),
        dir: package.dir.clone(),
        ..PackageMetadata::default()
    };
    Ok(Some(TestProgram {
        subject: package.clone(),
        entries,
        record: PackageRecord {
            metadata,
            archive: Some(Arc::new(archive)),
        },
    }))
}

fn collect_tests(archive: &Archive) -> Vec<TestEntry> {
    archive
        .tests
        .iter()
        .filter(|name| is_test_name(name))
        .map(|name| TestEntry::new(name.as_str(), archive.import_path.as_str()))
        .collect()
}

/// Body of the synthetic entry point.
///
/// Arguments to the testing entry, in order: import path, directory, test
/// names, test functions.
pub fn main_body(import_path: &str, dir: &Path, entries: &[TestEntry]) -> String {
    let names = entries
        .iter()
        .map(|e| quote(&e.name))
        .collect::<Vec<_>>()
        .join(", ");
    let refs = entries
        .iter()
        .map(TestEntry::reference)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "$pkg.main = function() {{ var testing = $packages[{testing}]; \
         testing.Main2({path}, {dir}, new ($sliceType($String))([{names}]), \
         new ($sliceType($funcType([testing.T.Ptr], [], false)))([{refs}])); }};",
        testing = quote(TESTING_PACKAGE),
        path = quote(import_path),
        dir = quote(&dir.to_string_lossy()),
    )
}

/// Runtime flags for the test program.
pub fn runtime_args(verbose: bool, short: bool) -> Vec<String> {
    let mut args = Vec::new();
    if verbose {
        args.push("-test.v".to_string());
    }
    if short {
        args.push("-test.short".to_string());
    }
    args
}

/// What happened to one package in a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    NoTestFiles,
    Passed,
}

/// Synthesize, link and run the tests of `package`.
///
/// The linked program lives in a temporary file that is removed on every
/// return path. A failing test run surfaces as [`Error::ProcessExit`](crate::Error::ProcessExit).
pub fn run_package(
    session: &mut Session,
    package: &PackageMetadata,
    invoker: &RuntimeInvoker,
    args: &[String],
) -> Result<TestOutcome> {
    let Some(program) = synthesize(session, package)? else {
        return Ok(TestOutcome::NoTestFiles);
    };

    let artifact = TempArtifact::new("test.")?;
    session.write_command_package(&program.record, artifact.path())?;
    invoker.run(artifact.path(), args, Some(&package.dir))?;
    Ok(TestOutcome::Passed)
}
