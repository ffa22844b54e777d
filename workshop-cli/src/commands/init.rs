//! `workshop init <name>`

use anyhow::{Context, Result};
use clap::Args;

use workshop_core::{registry, WorkshopName};

/// Register a workshop in `~/.workshop/workshops/`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Workshop name; also the tmux session name.
    pub name: String,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let name = WorkshopName::from(self.name);
        let workshop = registry::init_at(&home, name.clone())
            .with_context(|| format!("failed to init workshop '{name}'"))?;

        println!("✓ Workshop '{}' ready ({} workbenches)", workshop.name, workshop.workbenches.len());
        println!(
            "  Saved to: {}",
            registry::workshop_path_at(&home, &workshop.name).display()
        );
        Ok(())
    }
}
