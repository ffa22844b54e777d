//! Error types for workshop-reconcile.

use thiserror::Error;

use workshop_core::RegistryError;
use workshop_tmux::TmuxError;

use crate::plan::ActionKind;

/// All errors that can arise from observing, planning, applying or nudging.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The session could not be observed; no plan was produced.
    #[error("failed to observe session '{session}': {source}")]
    Observe {
        session: String,
        #[source]
        source: TmuxError,
    },

    /// A planned action failed; the actions after it were not run.
    #[error("{kind} (step {step}) failed: {source}")]
    Action {
        kind: ActionKind,
        step: usize,
        #[source]
        source: TmuxError,
    },

    /// An error from the workshop registry.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The workbench window has no live pane tagged `agent`.
    #[error("no live agent pane in '{session}:{window}'")]
    NoAgentPane { session: String, window: String },

    /// Keys could not be delivered within the retry budget.
    #[error("failed to deliver keys to {pane}: {source}")]
    Nudge {
        pane: String,
        #[source]
        source: TmuxError,
    },
}

impl ReconcileError {
    /// Kind of the action that failed, when the error came from the executor.
    pub fn action_kind(&self) -> Option<ActionKind> {
        match self {
            ReconcileError::Action { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
