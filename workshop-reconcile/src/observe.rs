//! Actual-state observer: read-only queries against the tmux server.
//!
//! Nothing here is cached. Each call to [`observe`] asks tmux afresh because a
//! human (or another process) may have reshaped the session since the last
//! look.

use serde::Serialize;

use workshop_tmux::{PaneInfo, Tmux, TmuxError};

use crate::conventions::{is_overflow_window, Role, ROLE_OPTION};
use crate::error::ReconcileError;
use crate::plan::WindowStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActualSession {
    pub name: String,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActualPane {
    pub id: String,
    pub index: u32,
    pub dead: bool,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActualWindow {
    /// Server-wide window id (`@N`); the only unambiguous handle, since
    /// names can repeat.
    pub id: String,
    pub name: String,
    pub panes: Vec<ActualPane>,
}

impl ActualWindow {
    pub fn is_overflow(&self) -> bool {
        is_overflow_window(&self.name)
    }

    pub fn dead_panes(&self) -> usize {
        self.panes.iter().filter(|p| p.dead).count()
    }

    /// Untagged panes, in index order.
    pub fn guest_panes(&self) -> impl Iterator<Item = &ActualPane> {
        self.panes.iter().filter(|p| p.role.is_guest())
    }

    pub fn has_tagged_pane(&self) -> bool {
        self.panes.iter().any(|p| !p.role.is_guest())
    }

    /// Health summary. Guests are only counted for workbench windows.
    pub fn status(&self) -> WindowStatus {
        let is_overflow = self.is_overflow();
        let pane_count = self.panes.len();
        let dead_panes = self.dead_panes();
        let guest_panes = if is_overflow {
            0
        } else {
            self.guest_panes().count()
        };
        WindowStatus {
            name: self.name.clone(),
            pane_count,
            dead_panes,
            guest_panes,
            healthy: dead_panes == 0 && (!is_overflow || pane_count > 0),
            is_overflow,
        }
    }
}

/// Snapshot of one session. `windows` is empty when the session is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActualState {
    pub session: ActualSession,
    pub windows: Vec<ActualWindow>,
}

impl ActualState {
    pub fn absent(session: &str) -> Self {
        Self {
            session: ActualSession {
                name: session.to_string(),
                exists: false,
            },
            windows: Vec::new(),
        }
    }

    /// First window named `name`.
    pub fn window(&self, name: &str) -> Option<&ActualWindow> {
        self.windows.iter().find(|w| w.name == name)
    }
}

/// Observe `session`. A missing session is an empty state, not an error; any
/// failing query aborts the whole observation.
pub fn observe(tmux: &dyn Tmux, session: &str) -> Result<ActualState, ReconcileError> {
    let wrap = |source: TmuxError| ReconcileError::Observe {
        session: session.to_string(),
        source,
    };

    if !tmux.has_session(session).map_err(wrap)? {
        tracing::debug!(session, "session does not exist");
        return Ok(ActualState::absent(session));
    }

    let mut windows = Vec::new();
    for window in tmux.list_windows(session).map_err(wrap)? {
        let panes = tmux
            .list_panes(&window.id, ROLE_OPTION)
            .map_err(wrap)?
            .into_iter()
            .map(|info| classify(session, &window.name, info))
            .collect();
        windows.push(ActualWindow {
            id: window.id,
            name: window.name,
            panes,
        });
    }

    tracing::debug!(session, windows = windows.len(), "session observed");
    Ok(ActualState {
        session: ActualSession {
            name: session.to_string(),
            exists: true,
        },
        windows,
    })
}

fn classify(session: &str, window: &str, info: PaneInfo) -> ActualPane {
    let role = Role::parse(&info.tag).unwrap_or_else(|| {
        tracing::warn!(
            session,
            window,
            pane = %info.id,
            tag = %info.tag,
            "unknown role tag, treating pane as untagged",
        );
        Role::Untagged
    });
    ActualPane {
        id: info.id,
        index: info.index,
        dead: info.dead,
        role,
    }
}
