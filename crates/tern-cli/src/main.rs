//! tern CLI - command driver for the tern cross-compiler toolchain.

mod build;
mod dispatch;
mod install;
mod run;
mod test_runner;
mod tool;
mod watch;

use std::process::ExitCode;

use tern_core::{Environment, Reporter};

use dispatch::Invocation;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match dispatch::parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => e.exit(),
    };

    let code = match invocation {
        Invocation::Usage => {
            eprint!("{}", dispatch::usage());
            0
        }
        Invocation::Unknown(name) => {
            eprint!("{}", dispatch::unknown_hint(&name));
            2
        }
        command => match Environment::detect() {
            Ok(env) => dispatch_command(command, &env).await,
            Err(e) => Reporter::in_dir(std::env::current_dir().unwrap_or_default()).report(Err(e)),
        },
    };

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

async fn dispatch_command(invocation: Invocation, env: &Environment) -> i32 {
    match invocation {
        Invocation::Build(args) => build::execute(args, env).await,
        Invocation::Install(args) => install::execute(args, env).await,
        Invocation::Run(args) => run::execute(args, env).await,
        Invocation::Test(args) => test_runner::execute(args, env).await,
        Invocation::Tool(args) => Reporter::new(env).report(tool::execute(&args, env)),
        Invocation::Usage | Invocation::Unknown(_) => 0,
    }
}

/// Logging goes to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_logging() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(tracing::Level::WARN.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
