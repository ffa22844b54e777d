//! Cosmetic enrichment pass: pane titles, session options, key bindings and a
//! per-window "enriched" flag.
//!
//! Everything here is best-effort. A failing tmux call is logged at `warn` and
//! skipped; enrichment never fails the plan it belongs to.

use workshop_tmux::{Tmux, TmuxError};

use crate::conventions::{Role, ENRICHED_OPTION, ROLE_OPTION};

const SESSION_OPTIONS: &[(&str, &str)] = &[
    ("mouse", "on"),
    ("pane-border-status", "top"),
    ("pane-border-format", " #{pane_index}: #{pane_title} "),
];

const KEY_BINDINGS: &[(&str, &[&str])] = &[
    ("M-n", &["next-window"]),
    ("M-p", &["previous-window"]),
];

/// Counts of the tmux calls made by one enrichment pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOutcome {
    pub applied: usize,
    pub failed: usize,
}

impl EnrichOutcome {
    fn record(&mut self, what: &str, result: Result<(), TmuxError>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(err) => {
                self.failed += 1;
                tracing::warn!(what, error = %err, "enrichment step failed, continuing");
            }
        }
    }
}

/// Title shown in the pane border: the role, or the position for guests.
pub fn pane_title(role: Role, index: u32) -> String {
    match role.tag() {
        Some(tag) => tag.to_string(),
        None => format!("pane-{index}"),
    }
}

pub fn apply_enrichment(tmux: &dyn Tmux, session: &str) -> EnrichOutcome {
    let mut outcome = EnrichOutcome::default();

    for (key, value) in SESSION_OPTIONS {
        outcome.record(key, tmux.set_session_option(session, key, value));
    }
    for (key, command) in KEY_BINDINGS {
        outcome.record(key, tmux.bind_key(key, command));
    }

    let windows = match tmux.list_windows(session) {
        Ok(windows) => windows,
        Err(err) => {
            outcome.record("list-windows", Err(err));
            return outcome;
        }
    };

    for window in windows {
        match tmux.list_panes(&window.id, ROLE_OPTION) {
            Ok(panes) => {
                for pane in panes {
                    let title = pane_title(Role::from_tag(&pane.tag), pane.index);
                    outcome.record("pane-title", tmux.set_pane_title(&pane.id, &title));
                }
            }
            Err(err) => outcome.record("list-panes", Err(err)),
        }
        outcome.record(
            ENRICHED_OPTION,
            tmux.set_window_option(&window.id, ENRICHED_OPTION, "1"),
        );
    }

    tracing::debug!(session, applied = outcome.applied, failed = outcome.failed, "enrichment done");
    outcome
}
