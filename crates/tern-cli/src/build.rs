//! `tern build`.

use std::path::{Path, PathBuf};

use tern_core::package::has_source_suffix;
use tern_core::{ARTIFACT_EXT, BuildOptions, Environment, Session};

use crate::dispatch::BuildArgs;
use crate::watch;

/// Execute the build command.
pub async fn execute(args: BuildArgs, env: &Environment) -> i32 {
    let options = BuildOptions {
        verbose: args.verbose,
        minify: args.minify,
        watch: args.watch,
        create_map_file: true,
    };

    watch::build_loop(env, options, |session| build(session, &args, env)).await
}

/// One build pass.
///
/// - no arguments: the package in the current directory
/// - `.src` files: those files as the `main` package
/// - otherwise: each argument as an import path or directory
fn build(session: &mut Session, args: &BuildArgs, env: &Environment) -> tern_core::Result<()> {
    let cwd = &env.current_dir;
    let output = args.output.as_ref().map(|path| env.absolute(path));

    let Some(first) = args.paths.first() else {
        return session.build_dir(cwd, cwd, output.as_deref());
    };

    if has_source_suffix(Path::new(first)) {
        let files: Vec<PathBuf> = args.paths.iter().map(PathBuf::from).collect();
        let output = output.unwrap_or_else(|| cwd.join(default_output(first, true)));
        return session.build_files(&files, &output, cwd);
    }

    let output = output.unwrap_or_else(|| cwd.join(default_output(first, false)));
    for path in &args.paths {
        let archive = session.import_package(path)?;
        if let Some(record) = session.package(&archive.import_path) {
            session.write_command_package(record, &output)?;
        }
    }
    Ok(())
}

/// `<stem>.js` for a source file, `<base>.js` for a package argument.
pub(crate) fn default_output(arg: &str, is_file: bool) -> String {
    let path = Path::new(arg);
    let name = if is_file { path.file_stem() } else { path.file_name() };
    let name = name
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    format!("{name}.{ARTIFACT_EXT}")
}
