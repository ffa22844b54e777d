//! `workshop nudge <workshop> <bench> <message>`

use anyhow::{Context, Result};
use clap::Args;

use workshop_reconcile::nudge;

#[derive(Args, Debug)]
pub struct NudgeArgs {
    pub workshop: String,

    /// Workbench (window) whose agent pane receives the message.
    pub bench: String,

    /// Text typed into the agent pane, followed by Enter.
    pub message: String,
}

impl NudgeArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let (settings, tmux) = super::load_settings(&home)?;
        let policy = nudge::retry_policy(&settings.nudge);

        let pane = nudge::nudge_session(&tmux, &self.workshop, &self.bench, &self.message, &policy)
            .with_context(|| format!("failed to nudge '{}:{}'", self.workshop, self.bench))?;
        println!("✓ Nudged agent pane {pane} in '{}:{}'", self.workshop, self.bench);
        Ok(())
    }
}
