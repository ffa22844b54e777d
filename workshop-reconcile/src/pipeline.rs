//! Shared reconcile pipeline entrypoint used by CLI and daemon.
//!
//! registry → desired workbenches → observe → plan → (maybe) apply.

use std::path::Path;

use serde::Serialize;

use workshop_core::{registry, types::validate_name, Settings, WorkshopName};
use workshop_tmux::Tmux;

use crate::error::ReconcileError;
use crate::plan::ApplyPlan;
use crate::Reconciler;

/// What to do with the generated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Plan only; touch nothing.
    DryRun,
    /// Apply, creating the session if needed.
    Open,
    /// Apply only when the session already exists. The daemon never spawns
    /// sessions on its own.
    Maintain,
}

/// Scope for a reconcile pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileScope {
    /// Every registered workshop.
    All,
    /// A single named workshop.
    Workshop(WorkshopName),
}

/// Outcome of one workshop's run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub workshop: WorkshopName,
    pub plan: ApplyPlan,
    /// Whether the plan was executed.
    pub applied: bool,
}

/// Reconcile a single workshop. The workshop name is the session name.
pub fn run_workshop(
    home: &Path,
    tmux: &dyn Tmux,
    settings: &Settings,
    name: &WorkshopName,
    mode: RunMode,
) -> Result<ReconcileReport, ReconcileError> {
    validate_name(&name.0)?;
    let workshop = registry::load_workshop_at(home, name)?;
    let desired = workshop.desired_workbenches();
    let reconciler = Reconciler::new(tmux, settings);
    let plan = reconciler.plan_apply(&name.0, &desired)?;

    let apply = match mode {
        RunMode::DryRun => false,
        RunMode::Open => !plan.is_empty(),
        RunMode::Maintain => plan.session_exists,
    };
    if apply {
        reconciler.execute_plan(&plan)?;
    } else {
        tracing::debug!(workshop = %name, ?mode, "plan not applied");
    }

    Ok(ReconcileReport {
        workshop: name.clone(),
        plan,
        applied: apply,
    })
}

/// Run the pipeline for a scope.
///
/// With [`ReconcileScope::All`] a failing workshop is logged and skipped so one
/// broken session does not starve the rest; the first error is returned only
/// for a single-workshop scope.
pub fn run(
    home: &Path,
    tmux: &dyn Tmux,
    settings: &Settings,
    scope: &ReconcileScope,
    mode: RunMode,
) -> Result<Vec<ReconcileReport>, ReconcileError> {
    match scope {
        ReconcileScope::Workshop(name) => {
            Ok(vec![run_workshop(home, tmux, settings, name, mode)?])
        }
        ReconcileScope::All => {
            let mut reports = Vec::new();
            for workshop in registry::list_workshops_at(home)? {
                match run_workshop(home, tmux, settings, &workshop.name, mode) {
                    Ok(report) => reports.push(report),
                    Err(err) => {
                        tracing::warn!(workshop = %workshop.name, error = %err, "reconcile failed")
                    }
                }
            }
            Ok(reports)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::rstest;
    use tempfile::TempDir;
    use workshop_core::RegistryError;
    use workshop_tmux::fake::FakeTmux;

    use super::*;

    fn seeded_home(benches: &[&str]) -> TempDir {
        let home = TempDir::new().expect("home");
        let name = WorkshopName::from("forge");
        registry::init_at(home.path(), name.clone()).expect("init");
        for bench in benches {
            registry::add_workbench_at(home.path(), &name, bench, PathBuf::from("/code"))
                .expect("add");
        }
        home
    }

    #[test]
    fn run_all_empty_registry_returns_empty_vec() {
        let home = TempDir::new().expect("home");
        let fake = FakeTmux::new();
        let reports = run(
            home.path(),
            &fake,
            &Settings::default(),
            &ReconcileScope::All,
            RunMode::Open,
        )
        .expect("run");
        assert!(reports.is_empty());
    }

    #[test]
    fn dry_run_plans_without_touching_tmux() {
        let home = seeded_home(&["api", "web"]);
        let fake = FakeTmux::new();
        let name = WorkshopName::from("forge");

        let report = run_workshop(home.path(), &fake, &Settings::default(), &name, RunMode::DryRun)
            .expect("run");
        assert!(!report.applied);
        assert_eq!(report.plan.actions.len(), 3);
        assert!(!fake.session_exists("forge"));
    }

    #[test]
    fn open_creates_the_session() {
        let home = seeded_home(&["api", "web"]);
        let fake = FakeTmux::new();
        let name = WorkshopName::from("forge");

        let report = run_workshop(home.path(), &fake, &Settings::default(), &name, RunMode::Open)
            .expect("run");
        assert!(report.applied);
        assert_eq!(fake.window_names("forge"), ["api", "web"]);
    }

    #[test]
    fn maintain_never_spawns_a_session() {
        let home = seeded_home(&["api"]);
        let fake = FakeTmux::new();
        let name = WorkshopName::from("forge");

        let report =
            run_workshop(home.path(), &fake, &Settings::default(), &name, RunMode::Maintain)
                .expect("run");
        assert!(!report.applied);
        assert!(!fake.session_exists("forge"));
    }

    #[test]
    fn unknown_workshop_is_a_registry_error() {
        let home = TempDir::new().expect("home");
        let fake = FakeTmux::new();
        let err = run_workshop(
            home.path(),
            &fake,
            &Settings::default(),
            &WorkshopName::from("ghost"),
            RunMode::DryRun,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Registry(RegistryError::WorkshopNotFound { .. })
        ));
    }

    #[rstest]
    #[case::parent_dir("../forge")]
    #[case::tmux_separator("forge.api")]
    #[case::session_separator("forge:0")]
    fn unsafe_workshop_name_is_rejected_before_tmux(#[case] raw: &str) {
        let home = seeded_home(&["api"]);
        let fake = FakeTmux::new();
        let err = run_workshop(
            home.path(),
            &fake,
            &Settings::default(),
            &WorkshopName::from(raw),
            RunMode::Open,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Registry(RegistryError::InvalidName { .. })
        ));
        assert!(fake.calls().is_empty());
    }
}
