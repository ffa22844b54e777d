//! Plan generator: a pure diff of desired workbenches against an observed
//! session.
//!
//! Actions are collected into four phase buckets and concatenated in
//! [`Phase`] order, so a later step never targets a window an earlier step
//! has yet to create:
//!
//! ```text
//! Create   CreateSession | AddWindow
//! Cleanup  KillEmptyImps | PruneDeadPanes | RelocateGuests
//! Layout   ReconcileLayout
//! Enrich   ApplyEnrichment
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use workshop_core::DesiredWorkbench;

use crate::observe::ActualState;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Discriminant of [`ApplyAction`], used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    CreateSession,
    AddWindow,
    RelocateGuests,
    PruneDeadPanes,
    KillEmptyImps,
    ReconcileLayout,
    ApplyEnrichment,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so listings can align on width.
        f.pad(match self {
            ActionKind::CreateSession => "create-session",
            ActionKind::AddWindow => "add-window",
            ActionKind::RelocateGuests => "relocate-guests",
            ActionKind::PruneDeadPanes => "prune-dead-panes",
            ActionKind::KillEmptyImps => "kill-empty-imps",
            ActionKind::ReconcileLayout => "reconcile-layout",
            ActionKind::ApplyEnrichment => "apply-enrichment",
        })
    }
}

/// Ordering bucket of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Create,
    Cleanup,
    Layout,
    Enrich,
}

/// One step of an [`ApplyPlan`]. Each variant carries only the context its
/// handler needs. Actions on existing windows target `window_id`; `window` is
/// the name, kept for listings and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplyAction {
    CreateSession {
        session: String,
        workbench: DesiredWorkbench,
    },
    AddWindow {
        session: String,
        workbench: DesiredWorkbench,
    },
    RelocateGuests {
        session: String,
        window: String,
        window_id: String,
    },
    PruneDeadPanes {
        session: String,
        window: String,
        window_id: String,
    },
    KillEmptyImps {
        session: String,
        window: String,
        window_id: String,
    },
    ReconcileLayout {
        session: String,
        window: String,
        window_id: String,
    },
    ApplyEnrichment {
        session: String,
    },
}

impl ApplyAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ApplyAction::CreateSession { .. } => ActionKind::CreateSession,
            ApplyAction::AddWindow { .. } => ActionKind::AddWindow,
            ApplyAction::RelocateGuests { .. } => ActionKind::RelocateGuests,
            ApplyAction::PruneDeadPanes { .. } => ActionKind::PruneDeadPanes,
            ApplyAction::KillEmptyImps { .. } => ActionKind::KillEmptyImps,
            ApplyAction::ReconcileLayout { .. } => ActionKind::ReconcileLayout,
            ApplyAction::ApplyEnrichment { .. } => ActionKind::ApplyEnrichment,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.kind() {
            ActionKind::CreateSession | ActionKind::AddWindow => Phase::Create,
            ActionKind::RelocateGuests | ActionKind::PruneDeadPanes | ActionKind::KillEmptyImps => {
                Phase::Cleanup
            }
            ActionKind::ReconcileLayout => Phase::Layout,
            ActionKind::ApplyEnrichment => Phase::Enrich,
        }
    }

    pub fn session(&self) -> &str {
        match self {
            ApplyAction::CreateSession { session, .. }
            | ApplyAction::AddWindow { session, .. }
            | ApplyAction::RelocateGuests { session, .. }
            | ApplyAction::PruneDeadPanes { session, .. }
            | ApplyAction::KillEmptyImps { session, .. }
            | ApplyAction::ReconcileLayout { session, .. }
            | ApplyAction::ApplyEnrichment { session } => session,
        }
    }

    /// Target window; `None` for session-wide actions.
    pub fn window(&self) -> Option<&str> {
        match self {
            ApplyAction::CreateSession { workbench, .. }
            | ApplyAction::AddWindow { workbench, .. } => Some(&workbench.name),
            ApplyAction::RelocateGuests { window, .. }
            | ApplyAction::PruneDeadPanes { window, .. }
            | ApplyAction::KillEmptyImps { window, .. }
            | ApplyAction::ReconcileLayout { window, .. } => Some(window),
            ApplyAction::ApplyEnrichment { .. } => None,
        }
    }

    /// Server-wide id of the target window, for actions on existing windows.
    pub fn window_id(&self) -> Option<&str> {
        match self {
            ApplyAction::RelocateGuests { window_id, .. }
            | ApplyAction::PruneDeadPanes { window_id, .. }
            | ApplyAction::KillEmptyImps { window_id, .. }
            | ApplyAction::ReconcileLayout { window_id, .. } => Some(window_id),
            ApplyAction::CreateSession { .. }
            | ApplyAction::AddWindow { .. }
            | ApplyAction::ApplyEnrichment { .. } => None,
        }
    }

    /// Human-readable one-liner for plan listings.
    pub fn description(&self) -> String {
        match self {
            ApplyAction::CreateSession { session, workbench } => format!(
                "create session '{session}' with workbench '{}' at {}",
                workbench.name,
                workbench.path.display()
            ),
            ApplyAction::AddWindow { workbench, .. } => format!(
                "add workbench window '{}' at {}",
                workbench.name,
                workbench.path.display()
            ),
            ApplyAction::RelocateGuests { window, window_id, .. } => {
                format!("move guest panes of '{window}' ({window_id}) to its overflow window")
            }
            ApplyAction::PruneDeadPanes { window, window_id, .. } => {
                format!("kill dead panes in '{window}' ({window_id})")
            }
            ApplyAction::KillEmptyImps { window, window_id, .. } => {
                format!("kill emptied overflow window '{window}' ({window_id})")
            }
            ApplyAction::ReconcileLayout { window, window_id, .. } => {
                format!("reassert layout of '{window}' ({window_id})")
            }
            ApplyAction::ApplyEnrichment { session } => {
                format!("apply titles, bindings and flags to '{session}'")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowStatus {
    pub name: String,
    pub pane_count: usize,
    pub dead_panes: usize,
    pub guest_panes: usize,
    pub healthy: bool,
    pub is_overflow: bool,
}

/// Output of [`build`]: consumed once by the executor, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyPlan {
    pub session_name: String,
    pub session_exists: bool,
    pub actions: Vec<ApplyAction>,
    pub window_summary: Vec<WindowStatus>,
}

impl ApplyPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Default)]
struct Buckets {
    create: Vec<ApplyAction>,
    cleanup: Vec<ApplyAction>,
    layout: Vec<ApplyAction>,
    enrich: Vec<ApplyAction>,
}

impl Buckets {
    fn push(&mut self, action: ApplyAction) {
        match action.phase() {
            Phase::Create => self.create.push(action),
            Phase::Cleanup => self.cleanup.push(action),
            Phase::Layout => self.layout.push(action),
            Phase::Enrich => self.enrich.push(action),
        }
    }

    fn concat(self) -> Vec<ApplyAction> {
        let mut out = self.create;
        out.extend(self.cleanup);
        out.extend(self.layout);
        out.extend(self.enrich);
        out
    }
}

/// Diff `desired` against `actual`. Pure: performs no I/O.
pub fn build(session: &str, desired: &[DesiredWorkbench], actual: &ActualState) -> ApplyPlan {
    let desired = dedupe(desired);
    let mut buckets = Buckets::default();
    let mut window_summary = Vec::new();

    if !actual.session.exists {
        if let Some((first, rest)) = desired.split_first() {
            buckets.push(ApplyAction::CreateSession {
                session: session.to_string(),
                workbench: (*first).clone(),
            });
            for bench in rest {
                buckets.push(ApplyAction::AddWindow {
                    session: session.to_string(),
                    workbench: (*bench).clone(),
                });
            }
            buckets.push(ApplyAction::ApplyEnrichment {
                session: session.to_string(),
            });
        }
        return ApplyPlan {
            session_name: session.to_string(),
            session_exists: false,
            actions: buckets.concat(),
            window_summary,
        };
    }

    for bench in &desired {
        if actual.window(&bench.name).is_none() {
            buckets.push(ApplyAction::AddWindow {
                session: session.to_string(),
                workbench: (*bench).clone(),
            });
        }
    }

    // Windows are walked one by one, so two windows sharing a name each get
    // their own cleanup.
    for window in &actual.windows {
        let status = window.status();
        let session = session.to_string();
        let name = window.name.clone();
        let window_id = window.id.clone();

        let cleanup = if status.is_overflow {
            if status.dead_panes == status.pane_count {
                Some(ApplyAction::KillEmptyImps { session, window: name, window_id })
            } else if status.dead_panes > 0 {
                Some(ApplyAction::PruneDeadPanes { session, window: name, window_id })
            } else {
                None
            }
        } else if status.guest_panes > 0 && window.has_tagged_pane() {
            Some(ApplyAction::RelocateGuests { session, window: name, window_id })
        } else {
            None
        };
        if let Some(action) = cleanup {
            buckets.push(action);
        }
        window_summary.push(status);
    }

    for bench in &desired {
        if let Some(window) = actual.window(&bench.name) {
            buckets.push(ApplyAction::ReconcileLayout {
                session: session.to_string(),
                window: bench.name.clone(),
                window_id: window.id.clone(),
            });
        }
    }

    buckets.push(ApplyAction::ApplyEnrichment {
        session: session.to_string(),
    });

    ApplyPlan {
        session_name: session.to_string(),
        session_exists: true,
        actions: buckets.concat(),
        window_summary,
    }
}

/// Keep the first workbench of each name.
fn dedupe(desired: &[DesiredWorkbench]) -> Vec<&DesiredWorkbench> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(desired.len());
    for bench in desired {
        if seen.insert(&bench.name) {
            out.push(bench);
        } else {
            tracing::warn!(workbench = %bench.name, "duplicate desired workbench ignored");
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
