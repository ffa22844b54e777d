//! Pane identity and layout conventions shared by the planner and executor.
//!
//! A workbench window always starts as:
//!
//! ```text
//! +------------+---------+
//! |            |  agent  |
//! |   editor   +---------+
//! |            |  shell  |
//! +------------+---------+
//! ```
//!
//! which is tmux's `main-vertical` layout with the editor as main pane. Each
//! pane carries its identity in pane-level user options, readable from outside
//! the pane and independent of whatever process it is running.

use std::fmt;

use serde::Serialize;

use workshop_core::{types::OVERFLOW_SUFFIX, DesiredWorkbench, Settings};
use workshop_tmux::{Split, Tmux, TmuxError};

/// Pane option holding the [`Role`] tag.
pub const ROLE_OPTION: &str = "@role";
/// Pane option holding the workbench id.
pub const BENCH_ID_OPTION: &str = "@bench_id";
/// Pane option holding the workshop id.
pub const WORKSHOP_ID_OPTION: &str = "@workshop_id";
/// Window flag set by the enrichment pass.
pub const ENRICHED_OPTION: &str = "@workshop_enriched";

pub const WORKBENCH_LAYOUT: &str = "main-vertical";
pub const MAIN_PANE_WIDTH_OPTION: &str = "main-pane-width";

/// Identity of a pane inside a workbench window. Assigned once, at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Editor,
    Agent,
    Shell,
    /// No tag: a guest pane created outside the reconciler.
    Untagged,
}

impl Role {
    /// Parse a raw `@role` value. Empty means untagged; anything unknown is
    /// `None`.
    pub fn parse(tag: &str) -> Option<Role> {
        match tag.trim() {
            "" => Some(Role::Untagged),
            "editor" => Some(Role::Editor),
            "agent" => Some(Role::Agent),
            "shell" => Some(Role::Shell),
            _ => None,
        }
    }

    /// Lenient form of [`Role::parse`] for handlers: unknown tags count as
    /// untagged.
    pub fn from_tag(tag: &str) -> Role {
        Role::parse(tag).unwrap_or(Role::Untagged)
    }

    /// Value written to `@role`; `None` for untagged panes.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Role::Editor => Some("editor"),
            Role::Agent => Some("agent"),
            Role::Shell => Some("shell"),
            Role::Untagged => None,
        }
    }

    pub fn is_guest(self) -> bool {
        self == Role::Untagged
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().unwrap_or("untagged"))
    }
}

/// `<window>-imps`
pub fn overflow_window_name(window: &str) -> String {
    format!("{window}{OVERFLOW_SUFFIX}")
}

pub fn is_overflow_window(name: &str) -> bool {
    name.ends_with(OVERFLOW_SUFFIX)
}

/// Where a new workbench window goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First window of a brand-new session.
    NewSession,
    /// Appended to an existing session.
    NewWindow,
}

/// Build the three-pane template for `bench` in `session`.
pub fn build_workbench(
    tmux: &dyn Tmux,
    settings: &Settings,
    session: &str,
    bench: &DesiredWorkbench,
    placement: Placement,
) -> Result<(), TmuxError> {
    let editor = match placement {
        Placement::NewSession => tmux.new_session(session, &bench.name, &bench.path)?,
        Placement::NewWindow => tmux.new_window(session, &bench.name, &bench.path)?,
    };
    let agent = tmux.split_pane(&editor, Split::Horizontal, &bench.path)?;
    let shell = tmux.split_pane(&agent, Split::Vertical, &bench.path)?;

    // Keep the agent pane around after its process exits so it can be
    // inspected and respawned.
    tmux.set_pane_option(&agent, "remain-on-exit", "on")?;
    let command = settings.agent_command_for(
        &bench.name,
        &bench.id.0,
        &bench.workshop_id.0,
        &bench.path,
    );
    tmux.respawn_pane(&agent, &command)?;

    for (pane, role) in [
        (&editor, Role::Editor),
        (&agent, Role::Agent),
        (&shell, Role::Shell),
    ] {
        tag_pane(tmux, pane, role, bench)?;
    }

    if let Some(editor_command) = settings.editor_command.as_deref() {
        tmux.send_keys(&editor, &[editor_command, "Enter"])?;
    }

    // The editor pane id targets exactly the window just built, even when
    // another window already carries the same name.
    reassert_layout(tmux, settings, &editor)?;
    tracing::info!(session, window = %bench.name, %editor, %agent, %shell, "workbench built");
    Ok(())
}

fn tag_pane(
    tmux: &dyn Tmux,
    pane: &str,
    role: Role,
    bench: &DesiredWorkbench,
) -> Result<(), TmuxError> {
    if let Some(tag) = role.tag() {
        tmux.set_pane_option(pane, ROLE_OPTION, tag)?;
    }
    tmux.set_pane_option(pane, BENCH_ID_OPTION, &bench.id.0)?;
    tmux.set_pane_option(pane, WORKSHOP_ID_OPTION, &bench.workshop_id.0)
}

/// Reassert the workbench geometry on `window` (a window id, or a pane id
/// inside the window).
///
/// tmux reads `main-pane-width` when the layout is selected, so the option
/// must be written first.
pub fn reassert_layout(tmux: &dyn Tmux, settings: &Settings, window: &str) -> Result<(), TmuxError> {
    let width = format!("{}%", settings.main_pane_width.clamp(10, 90));
    tmux.set_window_option(window, MAIN_PANE_WIDTH_OPTION, &width)?;
    tmux.select_layout(window, WORKBENCH_LAYOUT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use workshop_core::{WorkbenchId, WorkshopId};
    use workshop_tmux::fake::FakeTmux;

    fn bench() -> DesiredWorkbench {
        DesiredWorkbench {
            name: "api".into(),
            path: PathBuf::from("/code/api"),
            id: WorkbenchId::from("b-api"),
            workshop_id: WorkshopId::from("w-1"),
        }
    }

    #[test]
    fn role_parse_accepts_vocabulary_and_empty() {
        assert_eq!(Role::parse("editor"), Some(Role::Editor));
        assert_eq!(Role::parse("agent"), Some(Role::Agent));
        assert_eq!(Role::parse("shell"), Some(Role::Shell));
        assert_eq!(Role::parse(""), Some(Role::Untagged));
        assert_eq!(Role::parse("vim"), None);
        assert_eq!(Role::from_tag("vim"), Role::Untagged);
    }

    #[test]
    fn overflow_names() {
        assert_eq!(overflow_window_name("api"), "api-imps");
        assert!(is_overflow_window("api-imps"));
        assert!(!is_overflow_window("imps-api"));
    }

    #[test]
    fn template_tags_all_three_panes_and_starts_agent() {
        let fake = FakeTmux::new();
        let settings = Settings::default();
        build_workbench(&fake, &settings, "forge", &bench(), Placement::NewSession).unwrap();

        let panes = fake.panes("forge", "api");
        let roles: Vec<Option<&str>> = panes.iter().map(|p| p.option(ROLE_OPTION)).collect();
        assert_eq!(roles, [Some("editor"), Some("agent"), Some("shell")]);
        assert!(panes.iter().all(|p| p.option(BENCH_ID_OPTION) == Some("b-api")));
        assert!(panes.iter().all(|p| p.option(WORKSHOP_ID_OPTION) == Some("w-1")));
        assert!(panes.iter().all(|p| p.cwd == PathBuf::from("/code/api")));

        let agent_cmd = panes[1].command.as_deref().unwrap();
        assert_eq!(agent_cmd, "agent connect --bench b-api --workshop w-1");
    }

    #[test]
    fn editor_command_is_typed_when_configured() {
        let fake = FakeTmux::new();
        let settings = Settings {
            editor_command: Some("nvim .".into()),
            ..Settings::default()
        };
        build_workbench(&fake, &settings, "forge", &bench(), Placement::NewSession).unwrap();
        assert_eq!(fake.panes("forge", "api")[0].keys, ["nvim . Enter"]);
    }

    #[test]
    fn layout_lands_on_the_new_window_when_name_is_taken() {
        let fake = FakeTmux::new();
        fake.add_window("forge", "api", vec![workshop_tmux::fake::PaneSpec::bare()]);
        build_workbench(&fake, &Settings::default(), "forge", &bench(), Placement::NewWindow)
            .unwrap();

        assert_eq!(fake.window_names("forge"), ["api", "api"]);
        // The pre-existing window is untouched.
        assert_eq!(fake.panes("forge", "api").len(), 1);
        assert_eq!(fake.layout("forge", "api"), None);
        assert!(fake.calls().iter().any(|c| c == "select-layout forge:api main-vertical"));
    }

    #[test]
    fn layout_width_is_set_before_selection() {
        let fake = FakeTmux::new();
        fake.add_window("forge", "api", vec![workshop_tmux::fake::PaneSpec::bare()]);
        let api = fake.window_id("forge", "api").unwrap();
        reassert_layout(&fake, &Settings::default(), &api).unwrap();

        let layout = fake.layout("forge", "api").unwrap();
        assert_eq!(layout.name, WORKBENCH_LAYOUT);
        assert_eq!(layout.main_pane_width.as_deref(), Some("60%"));
    }
}
