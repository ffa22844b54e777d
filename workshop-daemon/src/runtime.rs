use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use workshop_core::{config, WorkshopName};
use workshop_reconcile::pipeline::{self, ReconcileReport, ReconcileScope, RunMode};
use workshop_tmux::TmuxCli;

use crate::error::{io_err, task_err, DaemonError};
use crate::log_rotation::LogFile;
use crate::paths::{log_path, logs_dir, workshops_root, DEBOUNCE_WINDOW, ROTATION_CHECK_INTERVAL};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CycleTarget {
    All,
    Workshop(WorkshopName),
}

impl CycleTarget {
    fn scope(&self) -> ReconcileScope {
        match self {
            CycleTarget::All => ReconcileScope::All,
            CycleTarget::Workshop(name) => ReconcileScope::Workshop(name.clone()),
        }
    }

    fn label(&self) -> String {
        match self {
            CycleTarget::All => "all".to_string(),
            CycleTarget::Workshop(name) => name.0.clone(),
        }
    }
}

struct CycleJob {
    target: CycleTarget,
    source: &'static str,
    respond_to: oneshot::Sender<Result<CycleSummary, String>>,
}

/// Result of one reconcile cycle, as logged by the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub target: String,
    pub source: String,
    pub workshops: Vec<String>,
    /// Workshops whose plan was executed.
    pub applied: usize,
    /// Actions across all executed plans.
    pub actions: usize,
    pub duration_ms: u128,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    ensure_runtime_dirs(home)?;
    init_tracing(home);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon runtime until ctrl-c or a task fails.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;
    let interval = config::load_at(&home)?.daemon.interval();
    tracing::info!(home = %home.display(), interval_secs = interval.as_secs(), "daemon starting");

    let (job_tx, job_rx) = mpsc::channel::<CycleJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let job_tx = job_tx.clone();
        tokio::spawn(async move {
            let result = watcher_task(home, job_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let tick_handle = {
        let shutdown = shutdown_tx.clone();
        let job_tx = job_tx.clone();
        tokio::spawn(async move {
            let result = tick_task(interval, job_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = processor_task(home, job_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = log_rotation_task(home, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, shutting down daemon");
                        let _ = shutdown.send(());
                        Ok(())
                    }
                    Err(err) => Err(task_err("signal_handler", err)),
                },
            }
        })
    };

    let (watcher_result, tick_result, processor_result, rotation_result, signal_result) = tokio::join!(
        watcher_handle,
        tick_handle,
        processor_handle,
        rotation_handle,
        signal_handle
    );

    handle_join("watcher", watcher_result)?;
    handle_join("tick", tick_result)?;
    handle_join("processor", processor_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("daemon stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

async fn watcher_task(
    home: PathBuf,
    job_tx: mpsc::Sender<CycleJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let root = workshops_root(&home);
    // Canonicalize so event paths (which arrive resolved, e.g. /private/var
    // on macOS) match the prefix checks below.
    let root = fs::canonicalize(&root).unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&root, RecursiveMode::NonRecursive)?;
    tracing::debug!(path = %root.display(), "watching workshop registry");

    let mut debounce = HashMap::<PathBuf, Instant>::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    let Some(name) = workshop_for_path(&path, &root) else { continue };
                    if !should_process_event(&mut debounce, &path, Instant::now()) {
                        continue;
                    }

                    match enqueue_cycle(&job_tx, CycleTarget::Workshop(name), "watcher").await {
                        Ok(summary) => log_summary(&summary),
                        Err(err) => tracing::error!(error = %err, "watcher-triggered reconcile failed"),
                    }
                }
            }
        }
    }

    Ok(())
}

async fn tick_task(
    every: Duration,
    job_tx: mpsc::Sender<CycleJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                match enqueue_cycle(&job_tx, CycleTarget::All, "tick").await {
                    Ok(summary) => log_summary(&summary),
                    Err(DaemonError::ChannelClosed(what)) => {
                        tracing::debug!(what, "processor gone, stopping tick");
                        break;
                    }
                    Err(err) => tracing::error!(error = %err, "periodic reconcile failed"),
                }
            }
        }
    }
    Ok(())
}

/// Runs jobs one at a time, so at most one reconciler applies to a session.
async fn processor_task(
    home: PathBuf,
    mut job_rx: mpsc::Receiver<CycleJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = job_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let started = Instant::now();

                let target = job.target.clone();
                let home = home.clone();
                let result = tokio::task::spawn_blocking(move || run_cycle(&home, &target))
                    .await
                    .map_err(|err| task_err("processor", err))?;

                let outcome = result
                    .map(|reports| build_summary(&job.target, job.source, &reports, started.elapsed()))
                    .map_err(|err| err.to_string());
                let _ = job.respond_to.send(outcome);
            }
        }
    }
    Ok(())
}

async fn log_rotation_task(
    home: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(ROTATION_CHECK_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick fires immediately; skip it so startup never rotates.
    interval.tick().await;
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let home = home.clone();
                // Errors are logged inside rotate_logs.
                tokio::task::spawn_blocking(move || crate::log_rotation::rotate_logs(&home))
                    .await
                    .ok();
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One blocking reconcile pass. Settings are reloaded per cycle so edits to
/// `config.yaml` apply without a restart.
fn run_cycle(home: &Path, target: &CycleTarget) -> Result<Vec<ReconcileReport>, DaemonError> {
    let settings = config::load_at(home)?;
    let tmux = TmuxCli::new(settings.tmux_bin.clone());
    let reports = pipeline::run(home, &tmux, &settings, &target.scope(), RunMode::Maintain)?;
    Ok(reports)
}

async fn enqueue_cycle(
    job_tx: &mpsc::Sender<CycleJob>,
    target: CycleTarget,
    source: &'static str,
) -> Result<CycleSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    job_tx
        .send(CycleJob {
            target,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("job queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("job response"))?;
    outcome.map_err(|reason| task_err("reconcile", reason))
}

fn build_summary(
    target: &CycleTarget,
    source: &'static str,
    reports: &[ReconcileReport],
    duration: Duration,
) -> CycleSummary {
    let applied: Vec<&ReconcileReport> = reports.iter().filter(|r| r.applied).collect();
    CycleSummary {
        target: target.label(),
        source: source.to_string(),
        workshops: reports.iter().map(|r| r.workshop.0.clone()).collect(),
        applied: applied.len(),
        actions: applied.iter().map(|r| r.plan.actions.len()).sum(),
        duration_ms: duration.as_millis(),
    }
}

fn log_summary(summary: &CycleSummary) {
    tracing::info!(
        target = %summary.target,
        source = %summary.source,
        workshops = summary.workshops.len(),
        applied = summary.applied,
        actions = summary.actions,
        duration_ms = summary.duration_ms,
        "reconcile cycle completed",
    );
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Workshop named by a registry file event, if the path is `<root>/<name>.yaml`.
fn workshop_for_path(path: &Path, root: &Path) -> Option<WorkshopName> {
    if path.parent() != Some(root) {
        return None;
    }
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml"))
        .unwrap_or(false);
    if !is_yaml {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(WorkshopName::from)
}

fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= Duration::from_secs(30));
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [workshops_root(home), logs_dir(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(task_err(task, format!("join failure: {err}"))),
    }
}

/// Human-readable logs on stderr, JSON lines in `~/.workshop/logs/daemon.log`.
fn init_tracing(home: &Path) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .json()
        .with_target(false)
        .with_writer(LogFile::new(log_path(home)));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
