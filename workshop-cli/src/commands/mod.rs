//! Subcommand implementations. Each takes its clap args and returns
//! `anyhow::Result`, adding context at the boundary.

pub mod bench;
pub mod daemon;
pub mod init;
pub mod list;
pub mod nudge;
pub mod open;
pub mod plan;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

use workshop_core::{config, registry, Settings};
use workshop_tmux::TmuxCli;

pub(crate) fn home() -> Result<PathBuf> {
    registry::home().context("could not determine home directory")
}

/// Settings from `~/.workshop/config.yaml` and a tmux client built from them.
pub(crate) fn load_settings(home: &std::path::Path) -> Result<(Settings, TmuxCli)> {
    let settings = config::load_at(home).context("failed to load ~/.workshop/config.yaml")?;
    tracing::debug!(tmux = %settings.tmux_bin, "settings loaded");
    let tmux = TmuxCli::new(settings.tmux_bin.clone());
    Ok((settings, tmux))
}
