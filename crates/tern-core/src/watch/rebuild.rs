//! The watch-rebuild loop.
//!
//! ```text
//!            ┌──────────── change in watch set ────────────┐
//!            ▼                                             │
//!  ──► RUNNING ── watch off ──► Finished(code)        WAITING
//!            │                                             ▲
//!            └──────── watch on (pass or fail) ────────────┘
//!                                     shutdown while WAITING ──► Cancelled
//! ```

use std::future::Future;
use std::pin::pin;

use crate::error::Result;

use super::set::WatchSet;
use super::watcher::ChangeWaiter;

/// Result of one build action.
#[derive(Debug, Clone, Default)]
pub struct BuildPass {
    /// Exit status of the action after normalization.
    pub exit_code: i32,

    /// Paths the action's session registered.
    pub watched: WatchSet,
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Single-shot mode ran the action once.
    Finished(i32),
    /// The shutdown future resolved while waiting for changes.
    Cancelled,
}

/// Run `build`, and in watch mode keep re-running it after every relevant change.
///
/// `build` is expected to create a fresh session on every call. Build
/// failures never end the loop while watching; only `shutdown` (or a
/// watcher failure, returned as `Err`) does. Pass
/// [`std::future::pending()`] to wait forever.
pub async fn rebuild_loop<B, W, S>(
    watch: bool,
    mut build: B,
    waiter: &mut W,
    shutdown: S,
) -> Result<LoopOutcome>
where
    B: FnMut() -> BuildPass,
    W: ChangeWaiter,
    S: Future<Output = ()>,
{
    let mut shutdown = pin!(shutdown);
    let mut iteration = 0usize;

    loop {
        iteration += 1;
        tracing::debug!("build pass {}", iteration);
        let pass = build();

        if !watch {
            return Ok(LoopOutcome::Finished(pass.exit_code));
        }

        eprintln!("watching for changes...");
        tokio::select! {
            changed = waiter.wait_for_change(&pass.watched) => {
                let path = changed?;
                tracing::info!("{} changed, rebuilding", path.display());
            }
            _ = &mut shutdown => {
                tracing::info!("watch loop cancelled after {} passes", iteration);
                return Ok(LoopOutcome::Cancelled);
            }
        }
    }
}
