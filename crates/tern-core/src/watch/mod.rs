//! Watch mode: watched paths, change notification and the rebuild loop.

mod rebuild;
mod set;
mod watcher;

pub use rebuild::{BuildPass, LoopOutcome, rebuild_loop};
pub use set::WatchSet;
pub use watcher::{ChangeWaiter, FileWatcher, NotifyWaiter};
