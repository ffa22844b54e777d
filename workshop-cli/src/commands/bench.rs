//! `workshop bench add|remove|list`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use workshop_core::{registry, WorkshopName};

/// Manage the workbenches of a workshop.
#[derive(Subcommand, Debug)]
pub enum BenchCommand {
    /// Append a workbench; it becomes a window on the next `open`.
    Add(AddArgs),

    /// Remove a workbench from the registry. Its window is left running.
    Remove(RemoveArgs),

    /// List workbenches in window order.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub workshop: String,

    /// Workbench name; also the tmux window name.
    pub name: String,

    /// Working directory of the workbench panes. Defaults to the current
    /// directory.
    #[arg(long, short = 'p')]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    pub workshop: String,
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    pub workshop: String,
}

pub fn run(cmd: BenchCommand) -> Result<()> {
    let home = super::home()?;
    match cmd {
        BenchCommand::Add(args) => add(&home, args),
        BenchCommand::Remove(args) => remove(&home, args),
        BenchCommand::List(args) => list(&home, args),
    }
}

fn add(home: &std::path::Path, args: AddArgs) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("cannot read current directory")?,
    };
    let path = path
        .canonicalize()
        .with_context(|| format!("cannot resolve path '{}'", path.display()))?;

    let workshop = WorkshopName::from(args.workshop);
    let bench = registry::add_workbench_at(home, &workshop, &args.name, path)
        .with_context(|| format!("failed to add '{}' to workshop '{workshop}'", args.name))?;

    println!(
        "✓ Added workbench '{}' to '{}' ({})",
        bench.name,
        workshop,
        bench.path.display()
    );
    Ok(())
}

fn remove(home: &std::path::Path, args: RemoveArgs) -> Result<()> {
    let workshop = WorkshopName::from(args.workshop);
    let bench = registry::remove_workbench_at(home, &workshop, &args.name)
        .with_context(|| format!("failed to remove '{}' from workshop '{workshop}'", args.name))?;
    println!("✓ Removed workbench '{}' from '{}'", bench.name, workshop);
    Ok(())
}

fn list(home: &std::path::Path, args: ListArgs) -> Result<()> {
    let workshop = WorkshopName::from(args.workshop);
    let shop = registry::load_workshop_at(home, &workshop)
        .with_context(|| format!("failed to load workshop '{workshop}'"))?;
    if shop.workbenches.is_empty() {
        println!("No workbenches in '{workshop}'.");
        println!("Run: workshop bench add {workshop} <name> --path <dir>");
        return Ok(());
    }
    for (i, bench) in shop.workbenches.iter().enumerate() {
        println!("{:>2}. {} ({})", i + 1, bench.name, bench.path.display());
    }
    Ok(())
}
