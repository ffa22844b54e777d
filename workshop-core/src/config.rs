//! User settings loaded from `~/.workshop/config.yaml`.
//!
//! The file is optional and every field has a default, so a partial file such
//! as
//!
//! ```yaml
//! agent_command: "claude-agent connect {bench_id}"
//! nudge:
//!   attempts: 5
//! ```
//!
//! is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::registry::workshop_root;

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Program used to talk to the tmux server.
    pub tmux_bin: String,

    /// Root process of every agent pane. `{bench_id}`, `{workshop_id}`,
    /// `{bench}` and `{path}` are substituted before launch.
    pub agent_command: String,

    /// Typed into the editor pane after the template is built.
    pub editor_command: Option<String>,

    /// Width of the editor pane, in percent of the window.
    pub main_pane_width: u8,

    pub nudge: NudgeSettings,

    pub daemon: DaemonSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tmux_bin: "tmux".to_string(),
            agent_command: "agent connect --bench {bench_id} --workshop {workshop_id}".to_string(),
            editor_command: None,
            main_pane_width: 60,
            nudge: NudgeSettings::default(),
            daemon: DaemonSettings::default(),
        }
    }
}

/// Key delivery retry policy for nudges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeSettings {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for NudgeSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 500,
        }
    }
}

impl NudgeSettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Seconds between periodic convergence passes.
    pub interval_secs: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl DaemonSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Settings {
    /// Expand the agent command template for one workbench.
    ///
    /// Values are shell-quoted where needed, since tmux hands the result to
    /// `sh -c`. Placeholders are expanded in a single pass, so a value that
    /// itself contains `{bench}` is left alone. Unknown `{...}` text is kept.
    pub fn agent_command_for(
        &self,
        bench: &str,
        bench_id: &str,
        workshop_id: &str,
        path: &Path,
    ) -> String {
        let path = path.display().to_string();
        let mut out = String::with_capacity(self.agent_command.len());
        let mut rest = self.agent_command.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let value = tail.find('}').and_then(|end| {
                let value = match &tail[1..end] {
                    "bench_id" => bench_id,
                    "workshop_id" => workshop_id,
                    "bench" => bench,
                    "path" => path.as_str(),
                    _ => return None,
                };
                Some((value, end))
            });
            match value {
                Some((value, end)) => {
                    out.push_str(&shell_quote(value));
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Single-quote `value` for `sh` unless it is made only of characters the
/// shell never treats specially.
fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c));
    if plain {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

/// `<home>/.workshop/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    workshop_root(home).join("config.yaml")
}

/// Load settings, falling back to defaults when the file does not exist.
pub fn load_at(home: &Path) -> Result<Settings, RegistryError> {
    let path = config_path_at(home);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}
