//! Workshop: tmux workbenches for AI coding agents.
//!
//! # Usage
//!
//! ```text
//! workshop init <name>
//! workshop list
//! workshop bench add <workshop> <name> --path <dir>
//! workshop bench remove <workshop> <name>
//! workshop bench list <workshop>
//! workshop plan <workshop> [--json]
//! workshop open <workshop>
//! workshop status [<workshop>] [--json]
//! workshop nudge <workshop> <bench> <message>
//! workshop daemon run|logs
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    bench::BenchCommand, daemon::DaemonCommand, init::InitArgs, nudge::NudgeArgs,
    open::OpenArgs, plan::PlanArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "workshop",
    version,
    about = "Keep tmux workbenches for AI coding agents in shape",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a workshop (one tmux session).
    Init(InitArgs),

    /// List workshops and their workbenches.
    List,

    /// Manage the workbenches of a workshop.
    Bench {
        #[command(subcommand)]
        command: BenchCommand,
    },

    /// Show what `open` would do, without touching tmux.
    Plan(PlanArgs),

    /// Create or converge the workshop's tmux session.
    Open(OpenArgs),

    /// Show window health for one or all workshops.
    Status(StatusArgs),

    /// Type a message into a workbench's agent pane.
    Nudge(NudgeArgs),

    /// Run or inspect the convergence daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    // The daemon installs its own subscriber.
    if !matches!(cli.command, Commands::Daemon { .. }) {
        init_tracing();
    }
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::List => commands::list::run(),
        Commands::Bench { command } => commands::bench::run(command),
        Commands::Plan(args) => args.run(),
        Commands::Open(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Nudge(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
