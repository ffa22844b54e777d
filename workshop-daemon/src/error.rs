use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("registry error: {0}")]
    Registry(#[from] workshop_core::RegistryError),

    #[error("reconcile error: {0}")]
    Reconcile(#[from] workshop_reconcile::ReconcileError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{task} task failed: {reason}")]
    Task { task: &'static str, reason: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn task_err(task: &'static str, reason: impl ToString) -> DaemonError {
    DaemonError::Task {
        task,
        reason: reason.to_string(),
    }
}
