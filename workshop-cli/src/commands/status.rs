//! `workshop status [<workshop>] [--json]`: window health per workshop.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use workshop_core::{registry, WorkshopName};
use workshop_reconcile::pipeline::{self, ReconcileReport, RunMode};
use workshop_reconcile::{Phase, WindowStatus};

/// Arguments for `workshop status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Limit to one workshop.
    pub workshop: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let (settings, tmux) = super::load_settings(&home)?;

        let names: Vec<WorkshopName> = match self.workshop {
            Some(name) => vec![WorkshopName::from(name)],
            None => registry::list_workshops_at(&home)
                .context("failed to load registry; run `workshop init` first")?
                .into_iter()
                .map(|w| w.name)
                .collect(),
        };

        let mut rows = Vec::new();
        for name in &names {
            let report = pipeline::run_workshop(&home, &tmux, &settings, name, RunMode::DryRun)
                .with_context(|| format!("status check failed for '{name}'"))?;
            let desired = registry::load_workshop_at(&home, name)
                .with_context(|| format!("failed to load workshop '{name}'"))?
                .workbenches
                .into_iter()
                .map(|b| b.name)
                .collect::<Vec<_>>();
            rows.push(build_status(&report, &desired));
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&StatusJson { workshops: rows })
                    .context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_tables(&rows);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum WindowState {
    Healthy,
    Missing,
    DeadPanes,
    Guests,
    Overflow,
}

#[derive(Debug, Serialize)]
struct WindowRow {
    name: String,
    state: WindowState,
    pane_count: usize,
    dead_panes: usize,
    guest_panes: usize,
    is_overflow: bool,
}

#[derive(Debug, Serialize)]
struct WorkshopStatus {
    name: String,
    session_exists: bool,
    /// Topology-changing actions `open` would run.
    pending_changes: usize,
    windows: Vec<WindowRow>,
}

#[derive(Serialize)]
struct StatusJson {
    workshops: Vec<WorkshopStatus>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "window")]
    window: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "panes")]
    panes: usize,
    #[tabled(rename = "dead")]
    dead: usize,
    #[tabled(rename = "guests")]
    guests: usize,
}

fn build_status(report: &ReconcileReport, desired: &[String]) -> WorkshopStatus {
    let plan = &report.plan;
    let mut windows: Vec<WindowRow> = plan.window_summary.iter().map(window_row).collect();
    for name in desired {
        if !plan.window_summary.iter().any(|w| &w.name == name) {
            windows.push(WindowRow {
                name: name.clone(),
                state: WindowState::Missing,
                pane_count: 0,
                dead_panes: 0,
                guest_panes: 0,
                is_overflow: false,
            });
        }
    }

    WorkshopStatus {
        name: report.workshop.0.clone(),
        session_exists: plan.session_exists,
        pending_changes: plan
            .actions
            .iter()
            .filter(|a| matches!(a.phase(), Phase::Create | Phase::Cleanup))
            .count(),
        windows,
    }
}

fn window_row(status: &WindowStatus) -> WindowRow {
    let state = if status.dead_panes > 0 {
        WindowState::DeadPanes
    } else if status.guest_panes > 0 {
        WindowState::Guests
    } else if status.is_overflow {
        WindowState::Overflow
    } else {
        WindowState::Healthy
    };
    WindowRow {
        name: status.name.clone(),
        state,
        pane_count: status.pane_count,
        dead_panes: status.dead_panes,
        guest_panes: status.guest_panes,
        is_overflow: status.is_overflow,
    }
}

fn print_tables(rows: &[WorkshopStatus]) {
    println!("Workshop v{} | {} workshops", env!("CARGO_PKG_VERSION"), rows.len());
    if rows.is_empty() {
        println!("No workshops registered.");
        return;
    }

    let separator = "■".repeat(56).bright_black().to_string();
    println!("{separator}");
    println!(
        "Indicators: {} HEALTHY  {} OVERFLOW  {} GUESTS  {} DEAD  {} MISSING",
        state_indicator(WindowState::Healthy),
        state_indicator(WindowState::Overflow),
        state_indicator(WindowState::Guests),
        state_indicator(WindowState::DeadPanes),
        state_indicator(WindowState::Missing),
    );
    println!("{separator}");

    let mut needs_open = false;
    for workshop in rows {
        let session = if workshop.session_exists {
            "running".green().to_string()
        } else {
            "not running".bright_black().to_string()
        };
        println!("{} ({session})", workshop.name.to_uppercase().bold());
        needs_open |= workshop.pending_changes > 0;

        let table_rows: Vec<StatusTableRow> = workshop
            .windows
            .iter()
            .map(|w| StatusTableRow {
                window: w.name.clone(),
                state: format!("{} {}", state_indicator(w.state), state_label(w.state)),
                panes: w.pane_count,
                dead: w.dead_panes,
                guests: w.guest_panes,
            })
            .collect();
        if table_rows.is_empty() {
            println!("  (no windows)");
        } else {
            let mut table = Table::new(table_rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        println!("{separator}");
    }

    if needs_open {
        println!("Run 'workshop open <workshop>' to converge.");
    }
}

fn state_label(state: WindowState) -> &'static str {
    match state {
        WindowState::Healthy => "HEALTHY",
        WindowState::Missing => "MISSING",
        WindowState::DeadPanes => "DEAD",
        WindowState::Guests => "GUESTS",
        WindowState::Overflow => "OVERFLOW",
    }
}

fn state_indicator(state: WindowState) -> String {
    match state {
        WindowState::Healthy => "■".green().bold().to_string(),
        WindowState::Overflow => "■".cyan().bold().to_string(),
        WindowState::Guests => "■".yellow().bold().to_string(),
        WindowState::DeadPanes => "■".red().bold().to_string(),
        WindowState::Missing => "■".bright_black().bold().to_string(),
    }
}
