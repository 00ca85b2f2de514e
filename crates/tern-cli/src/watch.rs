//! Driving commands: the watch-rebuild loop and interruptible runs.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use tern_core::compile::{Compiler, ProcessCompiler};
use tern_core::{
    BuildOptions, BuildPass, Environment, Error, LoopOutcome, NotifyWaiter, Reporter, Session,
    rebuild_loop,
};

/// Exit status after Ctrl+C.
pub const INTERRUPTED: i32 = 130;

/// Run `action` in a fresh session, repeating after every change when
/// `options.watch` is set. Returns the exit status.
pub async fn build_loop<F>(env: &Environment, options: BuildOptions, mut action: F) -> i32
where
    F: FnMut(&mut Session) -> tern_core::Result<()>,
{
    let reporter = Reporter::new(env);
    let compiler: Arc<dyn Compiler> = Arc::new(ProcessCompiler::new(env));

    let build = || {
        let mut session = Session::new(options.clone(), env, Arc::clone(&compiler));
        let exit_code = reporter.report(action(&mut session));
        BuildPass {
            exit_code,
            watched: session.into_watched(),
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let mut waiter = NotifyWaiter::new(&env.current_dir);
    match rebuild_loop(options.watch, build, &mut waiter, shutdown).await {
        Ok(LoopOutcome::Finished(code)) => code,
        Ok(LoopOutcome::Cancelled) => INTERRUPTED,
        Err(e) => reporter.report(Err(e)),
    }
}

/// Run blocking `work` to completion and report its result.
///
/// On Ctrl+C the runtime child sees the same interrupt; the tool keeps
/// waiting until `work` returns so its temporary artifacts are removed,
/// reports what it returned, then exits with [`INTERRUPTED`].
pub async fn run_interruptible<F>(env: &Environment, work: F) -> i32
where
    F: FnOnce() -> tern_core::Result<()> + Send + 'static,
{
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    until_interrupted(&Reporter::new(env), work, interrupt, &mut std::io::stderr()).await
}

async fn until_interrupted<F, I>(
    reporter: &Reporter,
    work: F,
    interrupt: I,
    out: &mut impl Write,
) -> i32
where
    F: FnOnce() -> tern_core::Result<()> + Send + 'static,
    I: Future<Output = ()>,
{
    let mut task = tokio::task::spawn_blocking(work);

    tokio::select! {
        joined = &mut task => reporter.report_to(out, flatten(joined)),
        () = interrupt => {
            tracing::info!("interrupted, waiting for the runtime to exit");
            // The interrupt decides the status.
            reporter.report_to(out, flatten(task.await));
            INTERRUPTED
        }
    }
}

fn flatten(
    joined: Result<tern_core::Result<()>, tokio::task::JoinError>,
) -> tern_core::Result<()> {
    joined.map_err(|e| Error::Io(std::io::Error::other(e)))?
}
