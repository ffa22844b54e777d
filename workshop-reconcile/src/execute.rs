//! Action executor.
//!
//! Actions run strictly in plan order. The first failure stops the queue and
//! is returned tagged with the failing action's kind and 1-based step number.
//! Nothing is rolled back: every handler is idempotent, so re-running the
//! observe → plan → apply cycle is the recovery path.

use workshop_core::Settings;
use workshop_tmux::{Tmux, TmuxError};

use crate::conventions::{self, overflow_window_name, Placement, Role, ROLE_OPTION};
use crate::enrich;
use crate::error::ReconcileError;
use crate::plan::{ApplyAction, ApplyPlan};

pub fn execute_plan(
    tmux: &dyn Tmux,
    settings: &Settings,
    plan: &ApplyPlan,
) -> Result<(), ReconcileError> {
    let total = plan.actions.len();
    for (i, action) in plan.actions.iter().enumerate() {
        let step = i + 1;
        tracing::info!(
            session = %plan.session_name,
            step,
            total,
            kind = %action.kind(),
            "{}",
            action.description(),
        );
        apply(tmux, settings, action).map_err(|source| {
            tracing::error!(step, kind = %action.kind(), error = %source, "action failed, aborting plan");
            ReconcileError::Action {
                kind: action.kind(),
                step,
                source,
            }
        })?;
    }
    tracing::info!(session = %plan.session_name, actions = total, "plan applied");
    Ok(())
}

fn apply(tmux: &dyn Tmux, settings: &Settings, action: &ApplyAction) -> Result<(), TmuxError> {
    match action {
        ApplyAction::CreateSession { session, workbench } => {
            conventions::build_workbench(tmux, settings, session, workbench, Placement::NewSession)
        }
        ApplyAction::AddWindow { session, workbench } => {
            conventions::build_workbench(tmux, settings, session, workbench, Placement::NewWindow)
        }
        ApplyAction::RelocateGuests {
            session,
            window,
            window_id,
        } => relocate_guests(tmux, session, window, window_id),
        ApplyAction::PruneDeadPanes { window, window_id, .. } => {
            prune_dead_panes(tmux, window, window_id).map(drop)
        }
        ApplyAction::KillEmptyImps { window, window_id, .. } => {
            kill_empty_imps(tmux, window, window_id)
        }
        ApplyAction::ReconcileLayout { window_id, .. } => {
            conventions::reassert_layout(tmux, settings, window_id)
        }
        ApplyAction::ApplyEnrichment { session } => {
            enrich::apply_enrichment(tmux, session);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Move every untagged pane of window `window_id` (named `window`) into
/// `<window>-imps`, creating the overflow window right after it when none
/// exists yet. An existing overflow window is the first one with that name.
pub fn relocate_guests(
    tmux: &dyn Tmux,
    session: &str,
    window: &str,
    window_id: &str,
) -> Result<(), TmuxError> {
    let panes = tmux.list_panes(window_id, ROLE_OPTION)?;
    let (guests, tagged): (Vec<_>, Vec<_>) = panes
        .into_iter()
        .partition(|p| Role::from_tag(&p.tag).is_guest());

    if guests.is_empty() {
        tracing::debug!(session, window, "no guest panes, nothing to relocate");
        return Ok(());
    }
    if tagged.is_empty() {
        // Not a workbench; moving every pane out would destroy the window.
        tracing::debug!(session, window, "window has no tagged panes, leaving guests");
        return Ok(());
    }

    let overflow = overflow_window_name(window);
    let mut remaining = guests.iter();
    let existing = tmux
        .list_windows(session)?
        .into_iter()
        .find(|w| w.name == overflow)
        .map(|w| w.id);
    // After break-pane, the moved pane's id targets the new overflow window.
    let target = match existing {
        Some(id) => id,
        None => match remaining.next() {
            Some(first) => {
                tmux.break_pane(&first.id, window_id, &overflow)?;
                tracing::info!(session, window, pane = %first.id, %overflow, "overflow window created");
                first.id.clone()
            }
            None => return Ok(()),
        },
    };
    for guest in remaining {
        tmux.join_pane(&guest.id, &target)?;
        tracing::info!(session, window, pane = %guest.id, %overflow, "guest pane relocated");
    }
    Ok(())
}

/// Kill the dead panes of window `window_id`; returns how many were killed.
pub fn prune_dead_panes(tmux: &dyn Tmux, window: &str, window_id: &str) -> Result<usize, TmuxError> {
    let panes = tmux.list_panes(window_id, ROLE_OPTION)?;
    let mut killed = 0;
    for pane in panes.iter().filter(|p| p.dead) {
        tmux.kill_pane(&pane.id)?;
        killed += 1;
    }
    tracing::info!(window, window_id, killed, "dead panes pruned");
    Ok(killed)
}

/// Kill an overflow window whose panes are all dead. If a live pane has
/// appeared since planning, only the dead panes are removed.
pub fn kill_empty_imps(tmux: &dyn Tmux, window: &str, window_id: &str) -> Result<(), TmuxError> {
    let panes = tmux.list_panes(window_id, ROLE_OPTION)?;
    if panes.iter().any(|p| !p.dead) {
        tracing::warn!(window, window_id, "overflow window gained a live pane, pruning instead");
        return prune_dead_panes(tmux, window, window_id).map(drop);
    }
    tmux.kill_window(window_id)?;
    tracing::info!(window, window_id, "overflow window killed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workshop_tmux::fake::{FakeTmux, PaneSpec};

    fn tagged(role: &str) -> PaneSpec {
        PaneSpec::bare().option(ROLE_OPTION, role)
    }

    fn id_of(fake: &FakeTmux, window: &str) -> String {
        fake.window_id("forge", window).unwrap()
    }

    #[test]
    fn relocation_creates_overflow_after_source_window() {
        let fake = FakeTmux::new();
        fake.add_window(
            "forge",
            "api",
            vec![tagged("editor"), tagged("agent"), PaneSpec::bare(), PaneSpec::bare()],
        );
        fake.add_window("forge", "web", vec![tagged("editor")]);

        relocate_guests(&fake, "forge", "api", &id_of(&fake, "api")).unwrap();

        assert_eq!(fake.window_names("forge"), ["api", "api-imps", "web"]);
        assert_eq!(fake.panes("forge", "api").len(), 2);
        assert_eq!(fake.panes("forge", "api-imps").len(), 2);
    }

    #[test]
    fn relocation_joins_existing_overflow() {
        let fake = FakeTmux::new();
        fake.add_window(
            "forge",
            "api",
            vec![tagged("editor"), PaneSpec::bare(), PaneSpec::bare()],
        );
        fake.add_window("forge", "api-imps", vec![PaneSpec::bare()]);

        relocate_guests(&fake, "forge", "api", &id_of(&fake, "api")).unwrap();

        assert_eq!(fake.panes("forge", "api").len(), 1);
        assert_eq!(fake.panes("forge", "api-imps").len(), 3);
        assert!(!fake.calls().iter().any(|c| c.starts_with("break-pane")));
    }

    #[test]
    fn relocation_without_guests_is_a_noop() {
        let fake = FakeTmux::new();
        fake.add_window("forge", "api", vec![tagged("editor"), tagged("agent")]);
        relocate_guests(&fake, "forge", "api", &id_of(&fake, "api")).unwrap();
        assert_eq!(fake.window_names("forge"), ["api"]);
    }

    #[test]
    fn relocation_only_touches_the_targeted_window() {
        let fake = FakeTmux::new();
        fake.add_window("forge", "api", vec![tagged("editor"), tagged("agent")]);
        fake.add_window("forge", "api", vec![tagged("editor"), PaneSpec::bare()]);
        let second = fake.list_windows("forge").unwrap()[1].id.clone();

        relocate_guests(&fake, "forge", "api", &second).unwrap();

        assert_eq!(fake.window_names("forge"), ["api", "api", "api-imps"]);
        assert_eq!(fake.panes("forge", "api").len(), 2);
        assert_eq!(fake.list_panes(&second, ROLE_OPTION).unwrap().len(), 1);
    }

    #[test]
    fn prune_leaves_live_panes() {
        let fake = FakeTmux::new();
        let ids = fake.add_window(
            "forge",
            "api-imps",
            vec![PaneSpec::bare().dead(), PaneSpec::bare(), PaneSpec::bare().dead()],
        );
        assert_eq!(prune_dead_panes(&fake, "api-imps", &id_of(&fake, "api-imps")).unwrap(), 2);

        let left: Vec<String> = fake.panes("forge", "api-imps").into_iter().map(|p| p.id).collect();
        assert_eq!(left, [ids[1].clone()]);
    }

    #[test]
    fn kill_empty_imps_spares_window_with_live_pane() {
        let fake = FakeTmux::new();
        fake.add_window("forge", "api", vec![tagged("editor")]);
        fake.add_window("forge", "api-imps", vec![PaneSpec::bare().dead(), PaneSpec::bare()]);

        kill_empty_imps(&fake, "api-imps", &id_of(&fake, "api-imps")).unwrap();
        assert_eq!(fake.panes("forge", "api-imps").len(), 1);

        fake.add_window("forge", "web-imps", vec![PaneSpec::bare().dead()]);
        kill_empty_imps(&fake, "web-imps", &id_of(&fake, "web-imps")).unwrap();
        assert_eq!(fake.window_names("forge"), ["api", "api-imps"]);
    }
}
