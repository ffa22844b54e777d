//! Keystroke delivery to workbench panes.
//!
//! Delivery goes through a [`RetryPolicy`]: a pane whose process is still
//! starting may reject the first `send-keys`, and a bounded, fixed-pause retry
//! is the whole recovery story.

use workshop_core::NudgeSettings;
use workshop_tmux::{RetryPolicy, Tmux, TmuxError};

use crate::conventions::{Role, ROLE_OPTION};
use crate::error::ReconcileError;

pub fn retry_policy(settings: &NudgeSettings) -> RetryPolicy {
    RetryPolicy::new(settings.attempts, settings.backoff())
}

/// Send `keys` to `pane` as one `send-keys` call, retried under `policy`.
pub fn send_keys(
    tmux: &dyn Tmux,
    pane: &str,
    keys: &[&str],
    policy: &RetryPolicy,
) -> Result<(), ReconcileError> {
    policy
        .run("send-keys", || tmux.send_keys(pane, keys))
        .map_err(|source| ReconcileError::Nudge {
            pane: pane.to_string(),
            source,
        })
}

/// Type `message` into the live agent pane of `session:window` and press
/// Enter. Returns the pane id that received it.
///
/// When several windows carry the workbench name, the first one holding a
/// live agent pane wins.
pub fn nudge_session(
    tmux: &dyn Tmux,
    session: &str,
    window: &str,
    message: &str,
    policy: &RetryPolicy,
) -> Result<String, ReconcileError> {
    let agent = find_agent_pane(tmux, session, window)?.ok_or_else(|| {
        ReconcileError::NoAgentPane {
            session: session.to_string(),
            window: window.to_string(),
        }
    })?;

    // Text and Enter go separately so a slow TUI does not swallow the newline.
    // `--` keeps a message such as "-continue" from being read as a flag.
    send_keys(tmux, &agent, &["-l", "--", message], policy)?;
    send_keys(tmux, &agent, &["Enter"], policy)?;
    tracing::info!(session, window, pane = %agent, "agent nudged");
    Ok(agent)
}

fn find_agent_pane(
    tmux: &dyn Tmux,
    session: &str,
    window: &str,
) -> Result<Option<String>, ReconcileError> {
    let wrap = |source: TmuxError| ReconcileError::Observe {
        session: session.to_string(),
        source,
    };

    for candidate in tmux.list_windows(session).map_err(wrap)? {
        if candidate.name != window {
            continue;
        }
        let agent = tmux
            .list_panes(&candidate.id, ROLE_OPTION)
            .map_err(wrap)?
            .into_iter()
            .find(|p| !p.dead && Role::from_tag(&p.tag) == Role::Agent);
        if let Some(pane) = agent {
            return Ok(Some(pane.id));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use workshop_tmux::fake::{FakeTmux, PaneSpec};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    fn workbench(fake: &FakeTmux) -> Vec<String> {
        fake.add_window(
            "forge",
            "api",
            vec![
                PaneSpec::bare().option(ROLE_OPTION, "editor"),
                PaneSpec::bare().option(ROLE_OPTION, "agent"),
                PaneSpec::bare().option(ROLE_OPTION, "shell"),
            ],
        )
    }

    #[test]
    fn nudge_reaches_agent_pane() {
        let fake = FakeTmux::new();
        let ids = workbench(&fake);

        let pane = nudge_session(&fake, "forge", "api", "continue", &policy(1)).unwrap();
        assert_eq!(pane, ids[1]);
        assert_eq!(fake.panes("forge", "api")[1].keys, ["-l -- continue", "Enter"]);
    }

    #[test]
    fn leading_dash_message_is_sent_as_text() {
        let fake = FakeTmux::new();
        let ids = workbench(&fake);

        nudge_session(&fake, "forge", "api", "-continue", &policy(1)).unwrap();
        let sent = fake
            .calls()
            .into_iter()
            .find(|c| c.starts_with("send-keys") && c.contains("continue"))
            .unwrap();
        assert_eq!(sent, format!("send-keys {} -l -- -continue", ids[1]));
    }

    #[test]
    fn duplicate_window_names_fall_through_to_the_live_agent() {
        let fake = FakeTmux::new();
        fake.add_window("forge", "api", vec![PaneSpec::bare()]);
        let ids = workbench(&fake);

        let pane = nudge_session(&fake, "forge", "api", "go", &policy(1)).unwrap();
        assert_eq!(pane, ids[1]);
    }

    #[test]
    fn missing_window_has_no_agent() {
        let fake = FakeTmux::new();
        workbench(&fake);

        let err = nudge_session(&fake, "forge", "web", "go", &policy(1)).unwrap_err();
        assert!(matches!(err, ReconcileError::NoAgentPane { .. }), "got: {err}");
    }

    #[test]
    fn missing_session_is_an_observe_error() {
        let fake = FakeTmux::new();
        let err = nudge_session(&fake, "forge", "api", "go", &policy(1)).unwrap_err();
        assert!(matches!(err, ReconcileError::Observe { .. }), "got: {err}");
    }

    #[test]
    fn transient_failures_are_retried() {
        let fake = FakeTmux::new();
        workbench(&fake);
        fake.fail_times("send-keys", 2);

        nudge_session(&fake, "forge", "api", "go", &policy(3)).unwrap();
        let sends = fake.calls().iter().filter(|c| c.starts_with("send-keys")).count();
        assert_eq!(sends, 4);
    }

    #[test]
    fn exhausted_retries_surface_nudge_error() {
        let fake = FakeTmux::new();
        workbench(&fake);
        fake.fail_on("send-keys");

        let err = nudge_session(&fake, "forge", "api", "go", &policy(2)).unwrap_err();
        assert!(matches!(err, ReconcileError::Nudge { .. }), "got: {err}");
    }

    #[test]
    fn dead_agent_is_not_a_target() {
        let fake = FakeTmux::new();
        let ids = workbench(&fake);
        fake.mark_dead(&ids[1]);

        let err = nudge_session(&fake, "forge", "api", "go", &policy(1)).unwrap_err();
        assert!(matches!(err, ReconcileError::NoAgentPane { .. }));
    }

    #[test]
    fn policy_follows_settings() {
        let settings = NudgeSettings {
            attempts: 5,
            backoff_ms: 20,
        };
        assert_eq!(retry_policy(&settings), RetryPolicy::new(5, Duration::from_millis(20)));
    }
}
