use workshop_core::{DesiredWorkbench, Settings};
use workshop_tmux::Tmux;

use crate::error::ReconcileError;
use crate::plan::ApplyPlan;
use crate::{execute, observe, plan};

/// Entry point of the engine: plans and applies against one tmux server.
///
/// Holds no state between calls; every [`plan_apply`](Self::plan_apply)
/// observes the session afresh.
pub struct Reconciler<'a> {
    tmux: &'a dyn Tmux,
    settings: &'a Settings,
}

impl<'a> Reconciler<'a> {
    pub fn new(tmux: &'a dyn Tmux, settings: &'a Settings) -> Self {
        Self { tmux, settings }
    }

    /// Observe `session` and diff it against `desired`. Read-only.
    pub fn plan_apply(
        &self,
        session: &str,
        desired: &[DesiredWorkbench],
    ) -> Result<ApplyPlan, ReconcileError> {
        let actual = observe::observe(self.tmux, session)?;
        let plan = plan::build(session, desired, &actual);
        tracing::debug!(
            session,
            exists = plan.session_exists,
            actions = plan.actions.len(),
            "plan generated",
        );
        Ok(plan)
    }

    /// Apply `plan` in order, stopping at the first failing action.
    pub fn execute_plan(&self, plan: &ApplyPlan) -> Result<(), ReconcileError> {
        execute::execute_plan(self.tmux, self.settings, plan)
    }
}
