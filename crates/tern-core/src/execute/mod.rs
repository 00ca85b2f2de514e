//! Execution of linked artifacts.

mod runtime;
mod temp;

pub use runtime::RuntimeInvoker;
pub use temp::TempArtifact;
