//! The query/command surface of a tmux server.
//!
//! Sessions are addressed by name. Windows and panes are addressed by their
//! server-wide ids (`@N`, `%N`): window names are free text a human can
//! duplicate, ids are not. Anywhere a window target is expected, a pane id
//! also works and resolves to the window holding that pane. Every method is
//! one blocking round trip; nothing is cached between calls.

use std::path::Path;

use crate::error::TmuxError;

/// One row of `list-panes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneInfo {
    /// Server-wide pane id, e.g. `%12`.
    pub id: String,
    /// Position inside the window.
    pub index: u32,
    /// The pane's process has exited and the pane is kept by `remain-on-exit`.
    pub dead: bool,
    /// Raw value of the requested pane option, empty when unset.
    pub tag: String,
}

/// One row of `list-windows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Server-wide window id, e.g. `@3`.
    pub id: String,
    /// Window name; not unique.
    pub name: String,
}

/// Direction of a new split, relative to the pane being split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// New pane to the right.
    Horizontal,
    /// New pane below.
    Vertical,
}

pub trait Tmux {
    // -- queries -----------------------------------------------------------

    /// `false` when the session (or the whole server) is absent. Any other
    /// failure to ask is an error.
    fn has_session(&self, session: &str) -> Result<bool, TmuxError>;

    /// Windows in index order.
    fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, TmuxError>;

    /// Panes of a window in index order, with the value of `tag_option`.
    fn list_panes(&self, window: &str, tag_option: &str) -> Result<Vec<PaneInfo>, TmuxError>;

    // -- structure ---------------------------------------------------------

    /// Create a detached session whose first window is `window`. Returns the
    /// id of its only pane.
    fn new_session(&self, session: &str, window: &str, cwd: &Path) -> Result<String, TmuxError>;

    /// Append a window to a session. Returns the id of its only pane.
    fn new_window(&self, session: &str, window: &str, cwd: &Path) -> Result<String, TmuxError>;

    /// Split `pane`. Returns the id of the new pane.
    fn split_pane(&self, pane: &str, split: Split, cwd: &Path) -> Result<String, TmuxError>;

    /// Kill the pane's process and start `command` as its root process.
    fn respawn_pane(&self, pane: &str, command: &str) -> Result<(), TmuxError>;

    /// Move `pane` into a new window named `new_name`, placed right after
    /// `after_window`.
    fn break_pane(&self, pane: &str, after_window: &str, new_name: &str)
        -> Result<(), TmuxError>;

    /// Move `pane` into an existing window.
    fn join_pane(&self, pane: &str, window: &str) -> Result<(), TmuxError>;

    fn kill_pane(&self, pane: &str) -> Result<(), TmuxError>;

    fn kill_window(&self, window: &str) -> Result<(), TmuxError>;

    fn select_layout(&self, window: &str, layout: &str) -> Result<(), TmuxError>;

    // -- options and cosmetics ---------------------------------------------

    fn set_pane_option(&self, pane: &str, key: &str, value: &str) -> Result<(), TmuxError>;

    fn set_window_option(&self, window: &str, key: &str, value: &str) -> Result<(), TmuxError>;

    fn set_session_option(&self, session: &str, key: &str, value: &str) -> Result<(), TmuxError>;

    /// Bind `key` in the prefix table to a tmux command.
    fn bind_key(&self, key: &str, command: &[&str]) -> Result<(), TmuxError>;

    fn set_pane_title(&self, pane: &str, title: &str) -> Result<(), TmuxError>;

    /// Type `keys` into a pane. Each element is one `send-keys` argument, so
    /// `["hello", "Enter"]` types the text and presses return.
    fn send_keys(&self, pane: &str, keys: &[&str]) -> Result<(), TmuxError>;
}

/// Exact-match session target (`=name`), so `api` never resolves to `api2`.
pub fn session_target(session: &str) -> String {
    format!("={session}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_use_exact_match_prefix() {
        assert_eq!(session_target("forge"), "=forge");
    }
}
