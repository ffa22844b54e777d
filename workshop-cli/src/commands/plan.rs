//! `workshop plan <workshop> [--json]`: observe and diff, apply nothing.

use anyhow::{Context, Result};
use clap::Args;

use workshop_core::WorkshopName;
use workshop_reconcile::pipeline::{self, RunMode};
use workshop_reconcile::ApplyPlan;

#[derive(Args, Debug)]
pub struct PlanArgs {
    pub workshop: String,

    /// Emit the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let (settings, tmux) = super::load_settings(&home)?;
        let name = WorkshopName::from(self.workshop);

        let report = pipeline::run_workshop(&home, &tmux, &settings, &name, RunMode::DryRun)
            .with_context(|| format!("failed to plan workshop '{name}'"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report.plan).context("failed to serialize plan JSON")?
            );
        } else {
            print_plan("[plan] ", &report.plan);
        }
        Ok(())
    }
}

/// Numbered action listing shared by `plan` and `open`.
pub(crate) fn print_plan(prefix: &str, plan: &ApplyPlan) {
    let state = if plan.session_exists { "exists" } else { "absent" };
    println!("{prefix}session '{}' ({state})", plan.session_name);
    if plan.actions.is_empty() {
        println!("{prefix}✓ nothing to do");
        return;
    }
    for (i, action) in plan.actions.iter().enumerate() {
        println!("  {:>2}. {:<17} {}", i + 1, action.kind(), action.description());
    }
}
