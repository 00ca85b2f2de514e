//! `tern test`: synthesize and run the test program of each package.

use std::sync::Arc;

use tern_core::compile::{Compiler, ProcessCompiler};
use tern_core::harness::{self, TestOutcome};
use tern_core::{BuildOptions, Environment, Error, PackageMetadata, Resolver, RuntimeInvoker, Session};

use crate::dispatch::TestArgs;
use crate::watch;

/// Execute the test command.
pub async fn execute(args: TestArgs, env: &Environment) -> i32 {
    let owned = env.clone();
    watch::run_interruptible(env, move || test(&args, &owned)).await
}

fn test(args: &TestArgs, env: &Environment) -> tern_core::Result<()> {
    let packages = resolve(args, env)?;
    let options = BuildOptions {
        minify: args.minify,
        ..BuildOptions::default()
    };
    let compiler: Arc<dyn Compiler> = Arc::new(ProcessCompiler::new(env));
    let invoker = RuntimeInvoker::new(env);
    let runtime_args = harness::runtime_args(args.verbose, args.short);

    run_all(&packages, |package| {
        let mut session = Session::new(options.clone(), env, Arc::clone(&compiler));
        harness::run_package(&mut session, package, &invoker, &runtime_args)
    })
}

/// Resolve every package before running any of them.
fn resolve(args: &TestArgs, env: &Environment) -> tern_core::Result<Vec<PackageMetadata>> {
    let resolver = Resolver::new(env);
    if args.packages.is_empty() {
        let import_path = match env.import_path_of(&env.current_dir) {
            Ok(Some(path)) => path,
            _ => {
                return Err(Error::Resolution(format!(
                    "tern test: directory {} is outside {}",
                    env.current_dir.display(),
                    env.src_dir().display()
                )));
            }
        };
        return Ok(vec![resolver.import(&import_path)?]);
    }
    args.packages.iter().map(|path| resolver.import(path)).collect()
}

/// Run each package in order.
///
/// A failing test program does not stop the run; the last failure is the
/// result. Any other error stops immediately.
fn run_all<F>(packages: &[PackageMetadata], mut run_one: F) -> tern_core::Result<()>
where
    F: FnMut(&PackageMetadata) -> tern_core::Result<TestOutcome>,
{
    let mut last_failure = None;
    for package in packages {
        match run_one(package) {
            Ok(TestOutcome::NoTestFiles) => {
                println!("?   \t{}\t[no test files]", package.import_path);
            }
            Ok(TestOutcome::Passed) => {}
            Err(e @ Error::ProcessExit { .. }) => {
                tracing::debug!("{}: {}", package.import_path, e);
                last_failure = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    match last_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
