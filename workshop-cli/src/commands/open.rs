//! `workshop open <workshop>`: create or converge the tmux session.

use anyhow::{Context, Result};
use clap::Args;

use workshop_core::WorkshopName;
use workshop_reconcile::pipeline::{self, RunMode};

#[derive(Args, Debug)]
pub struct OpenArgs {
    pub workshop: String,
}

impl OpenArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let (settings, tmux) = super::load_settings(&home)?;
        let name = WorkshopName::from(self.workshop);

        let report = pipeline::run_workshop(&home, &tmux, &settings, &name, RunMode::Open)
            .with_context(|| format!("failed to open workshop '{name}'"))?;

        super::plan::print_plan("", &report.plan);
        if report.applied {
            println!(
                "✓ '{}' converged ({} actions). Attach with: tmux attach -t '={}'",
                name,
                report.plan.actions.len(),
                name
            );
        } else {
            println!("No workbenches in '{name}'. Run: workshop bench add {name} <name> --path <dir>");
        }
        Ok(())
    }
}
