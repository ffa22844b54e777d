//! Convergence daemon: registry watcher + periodic tick + single reconcile
//! processor.

mod error;
pub mod log_rotation;
pub mod paths;
mod runtime;

pub use error::DaemonError;
pub use runtime::{run, start_blocking, CycleSummary};
