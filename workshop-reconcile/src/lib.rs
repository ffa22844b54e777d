//! # workshop-reconcile
//!
//! Observe → plan → apply for workshop tmux sessions.
//!
//! Build a [`Reconciler`] over a [`workshop_tmux::Tmux`] port, call
//! [`Reconciler::plan_apply`] to diff the desired workbenches against the live
//! session, then [`Reconciler::execute_plan`] to converge it. [`pipeline::run`]
//! does both for workshops stored in the registry.

pub mod conventions;
pub mod enrich;
pub mod error;
pub mod execute;
pub mod nudge;
pub mod observe;
pub mod pipeline;
pub mod plan;
mod reconciler;

pub use conventions::Role;
pub use error::ReconcileError;
pub use observe::{ActualPane, ActualSession, ActualState, ActualWindow};
pub use plan::{ActionKind, ApplyAction, ApplyPlan, Phase, WindowStatus};
pub use reconciler::Reconciler;
