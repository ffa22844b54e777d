//! `workshop list`

use anyhow::{Context, Result};
use chrono::Utc;

use workshop_core::registry;

pub fn run() -> Result<()> {
    let home = super::home()?;
    let workshops = registry::list_workshops_at(&home)
        .context("failed to load registry; run `workshop init` first")?;

    if workshops.is_empty() {
        println!("No workshops registered.");
        println!("Run: workshop init <name>");
        return Ok(());
    }

    for workshop in &workshops {
        let age = Utc::now().signed_duration_since(workshop.updated_at);
        println!(
            "\nWorkshop: {} (updated {})",
            workshop.name,
            format_age(age.num_seconds())
        );
        if workshop.workbenches.is_empty() {
            println!("  (no workbenches)");
        }
        for bench in &workshop.workbenches {
            println!("  {} ({})", bench.name, bench.path.display());
        }
    }
    Ok(())
}

fn format_age(seconds: i64) -> String {
    match seconds.max(0) {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}
