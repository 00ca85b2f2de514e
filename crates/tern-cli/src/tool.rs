//! `tern tool`: single-file compile shim for callers that expect a
//! `<arch>g` compiler tool.

use std::path::Path;
use std::sync::Arc;

use tern_core::compile::{Compiler, ProcessCompiler};
use tern_core::{ARTIFACT_EXT, BuildOptions, Environment, Error, Session};

use crate::dispatch::ToolArgs;

/// Execute the tool command.
pub fn execute(args: &ToolArgs, env: &Environment) -> tern_core::Result<()> {
    if !is_compiler_tool(&args.name) {
        return Err(Error::Usage(format!("tool not supported: {}", args.name)));
    }
    let Some(file) = args.file.as_deref() else {
        return Err(Error::Usage(format!("tern tool {}: no source file", args.name)));
    };

    let output = match &args.output {
        Some(path) => env.absolute(path),
        None => env.current_dir.join(output_name(file)),
    };

    let compiler: Arc<dyn Compiler> = Arc::new(ProcessCompiler::new(env));
    let mut session = Session::new(BuildOptions::default(), env, compiler);
    session.build_files(&[file.to_path_buf()], &output, &env.current_dir)
}

/// Two-character names ending in `g` (`6g`, `8g`, ...).
fn is_compiler_tool(name: &str) -> bool {
    name.len() == 2 && name.ends_with('g')
}

fn output_name(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    format!("{stem}.{ARTIFACT_EXT}")
}
