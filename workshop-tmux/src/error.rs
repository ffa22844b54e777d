//! Error types for workshop-tmux.

use thiserror::Error;

/// Errors surfaced by a [`crate::Tmux`] implementation.
#[derive(Debug, Error)]
pub enum TmuxError {
    /// The tmux program could not be started at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// tmux ran and exited unsuccessfully.
    #[error("tmux {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    /// tmux printed something the parser does not understand.
    #[error("unexpected tmux output {line:?}: {reason}")]
    Parse { line: String, reason: String },
}

impl TmuxError {
    pub(crate) fn command(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        TmuxError::Command {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}
