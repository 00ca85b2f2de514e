//! `tern install`.

use tern_core::{BuildOptions, Environment, Error, Session};

use crate::dispatch::InstallArgs;
use crate::watch;

/// Execute the install command.
pub async fn execute(args: InstallArgs, env: &Environment) -> i32 {
    let options = BuildOptions {
        verbose: args.verbose,
        minify: args.minify,
        watch: args.watch,
        create_map_file: true,
    };

    watch::build_loop(env, options, |session| install(session, &args, env)).await
}

fn install(session: &mut Session, args: &InstallArgs, env: &Environment) -> tern_core::Result<()> {
    let paths = if args.paths.is_empty() {
        vec![current_package(env)?]
    } else {
        args.paths.clone()
    };

    for path in &paths {
        let archive = session.import_package(path)?;
        let Some(record) = session.package(&archive.import_path) else {
            continue;
        };
        let Some(target) = record.metadata.artifact_path.as_deref() else {
            return Err(Error::Usage(format!(
                "tern install: no install location for {}",
                record.import_path()
            )));
        };

        if record.metadata.is_command() {
            session.write_command_package(record, target)?;
        } else {
            session.write_archive(record, target)?;
        }
        tracing::debug!("installed {} to {}", record.import_path(), target.display());
    }
    Ok(())
}

/// Import path of the working directory under the source root.
fn current_package(env: &Environment) -> tern_core::Result<String> {
    match env.import_path_of(&env.current_dir) {
        Ok(Some(path)) => Ok(path),
        _ => Err(Error::Usage(format!(
            "tern install: no install location for directory {} outside {}",
            env.current_dir.display(),
            env.source_root.display()
        ))),
    }
}
