//! Subcommand selection and per-subcommand flag parsing.
//!
//! Each subcommand owns its flag set. The first argument is matched by hand
//! so that `help <cmd>` can be rewritten to `<cmd> --help` and an unknown
//! subcommand gets a hint instead of a parse error.

use std::path::PathBuf;

use clap::Parser;

/// Subcommands, in usage order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("build", "compile packages and dependencies"),
    ("install", "compile and install packages and dependencies"),
    ("run", "compile and run a program"),
    ("test", "test packages"),
    ("tool", "run a specified tool (compatibility shim)"),
];

/// `tern build [-o output] [-v] [-w] [-m] [packages | files.src]`
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "tern-build", bin_name = "tern build", about = "Compile packages and dependencies")]
pub struct BuildArgs {
    /// Output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the names of packages as they are compiled
    #[arg(short, long)]
    pub verbose: bool,

    /// Watch for changes to the source files
    #[arg(short, long)]
    pub watch: bool,

    /// Minify generated code
    #[arg(short, long)]
    pub minify: bool,

    /// Import paths, directories or `.src` files
    pub paths: Vec<String>,
}

/// `tern install [-v] [-w] [-m] [packages]`
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "tern-install", bin_name = "tern install", about = "Compile and install packages and dependencies")]
pub struct InstallArgs {
    /// Print the names of packages as they are compiled
    #[arg(short, long)]
    pub verbose: bool,

    /// Watch for changes to the source files
    #[arg(short, long)]
    pub watch: bool,

    /// Minify generated code
    #[arg(short, long)]
    pub minify: bool,

    /// Import paths; defaults to the package in the current directory
    pub paths: Vec<String>,
}

/// `tern run files.src... [arguments...]`
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "tern-run", bin_name = "tern run", about = "Compile and run a program")]
pub struct RunArgs {
    /// Source files followed by arguments for the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl RunArgs {
    /// Leading `.src` arguments, then everything after them.
    pub fn split(&self) -> (&[String], &[String]) {
        let n = self
            .args
            .iter()
            .position(|arg| !arg.ends_with(tern_core::package::SOURCE_SUFFIX))
            .unwrap_or(self.args.len());
        self.args.split_at(n)
    }
}

/// `tern test [-v] [-short] [-m] [packages]`
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "tern-test", bin_name = "tern test", about = "Test packages")]
pub struct TestArgs {
    /// Verbose test output
    #[arg(short, long)]
    pub verbose: bool,

    /// Tell long-running tests to shorten their run time
    #[arg(long)]
    pub short: bool,

    /// Minify generated code
    #[arg(short, long)]
    pub minify: bool,

    /// Import paths or directories; defaults to the package in the current directory
    pub packages: Vec<String>,
}

/// `tern tool <name> [-e] [-l] [-m] [-o file] [-D path] [-I dir] file`
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "tern-tool", bin_name = "tern tool", about = "Run a specified tool")]
pub struct ToolArgs {
    /// Tool name
    pub name: String,

    #[arg(short = 'e')]
    pub no_error_limit: bool,

    #[arg(short = 'l')]
    pub no_inline: bool,

    #[arg(short = 'm')]
    pub diagnostics: bool,

    /// Output file
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(short = 'D')]
    pub local_prefix: Option<String>,

    #[arg(short = 'I')]
    pub include: Vec<PathBuf>,

    /// Source file
    pub file: Option<PathBuf>,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// No subcommand, `help`, or a leading flag.
    Usage,
    Unknown(String),
    Build(BuildArgs),
    Install(InstallArgs),
    Run(RunArgs),
    Test(TestArgs),
    Tool(ToolArgs),
}

/// Parse the arguments that follow the program name.
///
/// `--help` and malformed flags come back as a [`clap::Error`]; calling
/// `exit()` on it prints the message and exits with clap's status.
pub fn parse(args: &[String]) -> Result<Invocation, clap::Error> {
    let Some(first) = args.first() else {
        return Ok(Invocation::Usage);
    };
    if first.starts_with('-') {
        return Ok(Invocation::Usage);
    }

    let rest = &args[1..];
    match first.as_str() {
        "help" => match rest.first() {
            None => Ok(Invocation::Usage),
            Some(topic) if is_command(topic) => parse(&[topic.clone(), "--help".to_string()]),
            Some(topic) => Ok(Invocation::Unknown(topic.clone())),
        },
        "build" => BuildArgs::try_parse_from(argv("build", rest)).map(Invocation::Build),
        "install" => InstallArgs::try_parse_from(argv("install", rest)).map(Invocation::Install),
        "run" => RunArgs::try_parse_from(argv("run", rest)).map(Invocation::Run),
        "test" => {
            let rest: Vec<String> = rest.iter().map(|arg| normalize_test_flag(arg)).collect();
            TestArgs::try_parse_from(argv("test", &rest)).map(Invocation::Test)
        }
        "tool" => ToolArgs::try_parse_from(argv("tool", rest)).map(Invocation::Tool),
        other => Ok(Invocation::Unknown(other.to_string())),
    }
}

fn argv<'a>(command: &'a str, rest: &'a [String]) -> impl Iterator<Item = &'a str> {
    std::iter::once(command).chain(rest.iter().map(String::as_str))
}

fn is_command(name: &str) -> bool {
    COMMANDS.iter().any(|(command, _)| *command == name)
}

/// Accept the single-dash long form used by test runners.
fn normalize_test_flag(arg: &str) -> String {
    match arg {
        "-short" => "--short".to_string(),
        "-verbose" => "--verbose".to_string(),
        other => other.to_string(),
    }
}

/// Top-level usage text.
pub fn usage() -> String {
    let mut text = String::from(
        "tern is a tool for compiling tern source code.\n\nUsage:\n\n\ttern command [arguments]\n\nThe commands are:\n\n",
    );
    for (name, summary) in COMMANDS {
        text.push_str(&format!("\t{name:<11} {summary}\n"));
    }
    text.push_str("\nUse \"tern help [command]\" for more information about a command.\n");
    text
}

/// Hint for an unrecognized subcommand.
pub fn unknown_hint(name: &str) -> String {
    format!("tern: unknown subcommand \"{name}\"\nRun 'tern help' for usage.\n")
}
