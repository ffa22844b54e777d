//! # workshop-tmux
//!
//! The narrow port through which the reconciler reaches the tmux server.
//!
//! - [`Tmux`]: query/command trait, blocking, one call per tmux invocation
//! - [`TmuxCli`]: implementation that shells out to the `tmux` binary
//! - [`fake::FakeTmux`]: in-memory server for tests
//! - [`RetryPolicy`]: bounded retry for keystroke delivery

pub mod cli;
pub mod error;
pub mod fake;
pub mod port;
pub mod retry;

pub use cli::TmuxCli;
pub use error::TmuxError;
pub use port::{PaneInfo, Split, Tmux, WindowInfo};
pub use retry::RetryPolicy;
