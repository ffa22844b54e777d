//! In-memory tmux server for tests.
//!
//! [`FakeTmux`] keeps sessions, windows and panes in a mutex-guarded model and
//! mimics the tmux behaviors the reconciler depends on: windows and panes get
//! server-wide ids, window names may repeat, pane indices follow position,
//! killing or moving the last pane of a window destroys the window, and an
//! emptied session disappears. Every call is appended to a log so tests
//! can assert on what was (and was not) invoked, and any operation can be made
//! to fail on demand.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::TmuxError;
use crate::port::{PaneInfo, Split, Tmux, WindowInfo};

/// Observable state of one fake pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePane {
    pub id: String,
    pub dead: bool,
    pub cwd: PathBuf,
    pub options: BTreeMap<String, String>,
    pub title: String,
    /// Root process set through `respawn-pane`.
    pub command: Option<String>,
    /// Every `send-keys` argument list, joined with spaces.
    pub keys: Vec<String>,
}

impl FakePane {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Layout last selected on a window, with the `main-pane-width` value that
/// was in effect at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeLayout {
    pub name: String,
    pub main_pane_width: Option<String>,
}

/// Seed description of a pane for [`FakeTmux::add_window`].
#[derive(Debug, Clone, Default)]
pub struct PaneSpec {
    options: BTreeMap<String, String>,
    dead: bool,
}

impl PaneSpec {
    /// A pane with no options at all.
    pub fn bare() -> Self {
        Self::default()
    }

    pub fn option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }

    pub fn dead(mut self) -> Self {
        self.dead = true;
        self
    }
}

#[derive(Debug, Default)]
struct FakeWindow {
    id: String,
    name: String,
    panes: Vec<FakePane>,
    options: BTreeMap<String, String>,
    layout: Option<FakeLayout>,
}

#[derive(Debug, Default)]
struct FakeSession {
    name: String,
    windows: Vec<FakeWindow>,
    options: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    sessions: Vec<FakeSession>,
    bindings: BTreeMap<String, String>,
    next_pane: u32,
    next_window: u32,
    calls: Vec<String>,
    /// op name → remaining failures (`None` = always fail).
    failures: HashMap<String, Option<u32>>,
}

impl State {
    fn alloc_pane(&mut self, cwd: &Path) -> FakePane {
        let id = format!("%{}", self.next_pane);
        self.next_pane += 1;
        FakePane {
            id,
            dead: false,
            cwd: cwd.to_path_buf(),
            options: BTreeMap::new(),
            title: String::new(),
            command: None,
            keys: Vec::new(),
        }
    }

    fn alloc_window(&mut self, name: &str, panes: Vec<FakePane>) -> FakeWindow {
        let id = format!("@{}", self.next_window);
        self.next_window += 1;
        FakeWindow {
            id,
            name: name.to_string(),
            panes,
            ..FakeWindow::default()
        }
    }

    fn session(&self, name: &str) -> Option<&FakeSession> {
        self.sessions.iter().find(|s| s.name == name)
    }

    fn session_mut(&mut self, name: &str) -> Result<&mut FakeSession, TmuxError> {
        self.sessions
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| TmuxError::command("find-session", format!("can't find session: {name}")))
    }

    /// First window named `window`, for inspection helpers.
    fn named_window(&self, session: &str, window: &str) -> Option<&FakeWindow> {
        self.session(session)?.windows.iter().find(|w| w.name == window)
    }

    /// (session index, window index) of a window id, or of the window holding
    /// a pane id.
    fn resolve(&self, target: &str) -> Result<(usize, usize), TmuxError> {
        if target.starts_with('%') {
            let (si, wi, _) = self.locate(target)?;
            return Ok((si, wi));
        }
        for (si, session) in self.sessions.iter().enumerate() {
            if let Some(wi) = session.windows.iter().position(|w| w.id == target) {
                return Ok((si, wi));
            }
        }
        Err(TmuxError::command("find-window", format!("can't find window: {target}")))
    }

    fn window_mut(&mut self, target: &str) -> Result<&mut FakeWindow, TmuxError> {
        let (si, wi) = self.resolve(target)?;
        Ok(&mut self.sessions[si].windows[wi])
    }

    /// `session:name` of a window target, for the call log.
    fn label(&self, target: &str) -> String {
        match self.resolve(target) {
            Ok((si, wi)) => format!(
                "{}:{}",
                self.sessions[si].name, self.sessions[si].windows[wi].name
            ),
            Err(_) => target.to_string(),
        }
    }

    /// (session index, window index, pane index) of a pane id.
    fn locate(&self, pane: &str) -> Result<(usize, usize, usize), TmuxError> {
        for (si, session) in self.sessions.iter().enumerate() {
            for (wi, window) in session.windows.iter().enumerate() {
                if let Some(pi) = window.panes.iter().position(|p| p.id == pane) {
                    return Ok((si, wi, pi));
                }
            }
        }
        Err(TmuxError::command("find-pane", format!("can't find pane: {pane}")))
    }

    fn pane_mut(&mut self, pane: &str) -> Result<&mut FakePane, TmuxError> {
        let (si, wi, pi) = self.locate(pane)?;
        Ok(&mut self.sessions[si].windows[wi].panes[pi])
    }

    /// Remove a pane, collapsing an emptied window and session the way tmux does.
    fn take_pane(&mut self, pane: &str) -> Result<FakePane, TmuxError> {
        let (si, wi, pi) = self.locate(pane)?;
        let taken = self.sessions[si].windows[wi].panes.remove(pi);
        if self.sessions[si].windows[wi].panes.is_empty() {
            self.sessions[si].windows.remove(wi);
        }
        if self.sessions[si].windows.is_empty() {
            self.sessions.remove(si);
        }
        Ok(taken)
    }
}

/// In-memory [`Tmux`] implementation.
#[derive(Debug, Default)]
pub struct FakeTmux {
    state: Mutex<State>,
}

impl FakeTmux {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Log the call and apply any injected failure for `op`.
    fn begin(&self, op: &str, detail: String) -> Result<MutexGuard<'_, State>, TmuxError> {
        let mut state = self.lock();
        state.calls.push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{op} {detail}")
        });
        if let Some(rule) = state.failures.get_mut(op) {
            let fail = match rule {
                None => true,
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    true
                }
            };
            if fail {
                return Err(TmuxError::command(op, "injected failure"));
            }
        }
        Ok(state)
    }

    // -- seeding -----------------------------------------------------------

    /// Add a window with the given panes, creating the session if needed.
    /// Returns the new pane ids in order.
    pub fn add_window(&self, session: &str, window: &str, panes: Vec<PaneSpec>) -> Vec<String> {
        let mut state = self.lock();
        let mut created = Vec::with_capacity(panes.len());
        for wanted in panes {
            let mut pane = state.alloc_pane(Path::new("/"));
            pane.options = wanted.options;
            pane.dead = wanted.dead;
            created.push(pane);
        }
        let ids: Vec<String> = created.iter().map(|p| p.id.clone()).collect();

        if state.session(session).is_none() {
            state.sessions.push(FakeSession {
                name: session.to_string(),
                ..FakeSession::default()
            });
        }
        let new_window = state.alloc_window(window, created);
        if let Ok(s) = state.session_mut(session) {
            s.windows.push(new_window);
        }
        ids
    }

    /// Simulate the root process of a pane exiting under `remain-on-exit`.
    pub fn mark_dead(&self, pane: &str) {
        if let Ok(p) = self.lock().pane_mut(pane) {
            p.dead = true;
        }
    }

    /// Make every future call of `op` (e.g. `"kill-window"`) fail.
    pub fn fail_on(&self, op: &str) {
        self.lock().failures.insert(op.to_string(), None);
    }

    /// Make the next `times` calls of `op` fail, then succeed again.
    pub fn fail_times(&self, op: &str, times: u32) {
        self.lock().failures.insert(op.to_string(), Some(times));
    }

    // -- inspection --------------------------------------------------------

    /// Every call so far, as `"<op> <args>"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn session_exists(&self, session: &str) -> bool {
        self.lock().session(session).is_some()
    }

    /// Id of the first window named `window`.
    pub fn window_id(&self, session: &str, window: &str) -> Option<String> {
        self.lock().named_window(session, window).map(|w| w.id.clone())
    }

    pub fn window_names(&self, session: &str) -> Vec<String> {
        self.lock()
            .session(session)
            .map(|s| s.windows.iter().map(|w| w.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Panes of the first window named `window`.
    pub fn panes(&self, session: &str, window: &str) -> Vec<FakePane> {
        self.lock()
            .named_window(session, window)
            .map(|w| w.panes.clone())
            .unwrap_or_default()
    }

    pub fn window_option(&self, session: &str, window: &str, key: &str) -> Option<String> {
        self.lock()
            .named_window(session, window)
            .and_then(|w| w.options.get(key).cloned())
    }

    pub fn session_option(&self, session: &str, key: &str) -> Option<String> {
        self.lock()
            .session(session)
            .and_then(|s| s.options.get(key).cloned())
    }

    pub fn layout(&self, session: &str, window: &str) -> Option<FakeLayout> {
        self.lock()
            .named_window(session, window)
            .and_then(|w| w.layout.clone())
    }

    pub fn binding(&self, key: &str) -> Option<String> {
        self.lock().bindings.get(key).cloned()
    }
}

impl Tmux for FakeTmux {
    fn has_session(&self, session: &str) -> Result<bool, TmuxError> {
        let state = self.begin("has-session", session.to_string())?;
        Ok(state.session(session).is_some())
    }

    fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, TmuxError> {
        let mut state = self.begin("list-windows", session.to_string())?;
        let s = state.session_mut(session)?;
        Ok(s.windows
            .iter()
            .map(|w| WindowInfo {
                id: w.id.clone(),
                name: w.name.clone(),
            })
            .collect())
    }

    fn list_panes(&self, window: &str, tag_option: &str) -> Result<Vec<PaneInfo>, TmuxError> {
        let label = self.lock().label(window);
        let mut state = self.begin("list-panes", label)?;
        let w = state.window_mut(window)?;
        Ok(w.panes
            .iter()
            .enumerate()
            .map(|(index, pane)| PaneInfo {
                id: pane.id.clone(),
                index: index as u32,
                dead: pane.dead,
                tag: pane.option(tag_option).unwrap_or_default().to_string(),
            })
            .collect())
    }

    fn new_session(&self, session: &str, window: &str, cwd: &Path) -> Result<String, TmuxError> {
        let mut state = self.begin("new-session", format!("{session}:{window}"))?;
        if state.session(session).is_some() {
            return Err(TmuxError::command(
                "new-session",
                format!("duplicate session: {session}"),
            ));
        }
        let pane = state.alloc_pane(cwd);
        let id = pane.id.clone();
        let first = state.alloc_window(window, vec![pane]);
        state.sessions.push(FakeSession {
            name: session.to_string(),
            windows: vec![first],
            options: BTreeMap::new(),
        });
        Ok(id)
    }

    fn new_window(&self, session: &str, window: &str, cwd: &Path) -> Result<String, TmuxError> {
        let mut state = self.begin("new-window", format!("{session}:{window}"))?;
        state.session_mut(session)?;
        let pane = state.alloc_pane(cwd);
        let id = pane.id.clone();
        let new_window = state.alloc_window(window, vec![pane]);
        state.session_mut(session)?.windows.push(new_window);
        Ok(id)
    }

    fn split_pane(&self, pane: &str, split: Split, cwd: &Path) -> Result<String, TmuxError> {
        let mut state = self.begin("split-window", format!("{pane} {split:?}"))?;
        let (si, wi, pi) = state.locate(pane)?;
        let new_pane = state.alloc_pane(cwd);
        let id = new_pane.id.clone();
        state.sessions[si].windows[wi].panes.insert(pi + 1, new_pane);
        Ok(id)
    }

    fn respawn_pane(&self, pane: &str, command: &str) -> Result<(), TmuxError> {
        let mut state = self.begin("respawn-pane", format!("{pane} {command}"))?;
        let p = state.pane_mut(pane)?;
        p.command = Some(command.to_string());
        p.dead = false;
        Ok(())
    }

    fn break_pane(&self, pane: &str, after_window: &str, new_name: &str)
        -> Result<(), TmuxError> {
        let label = self.lock().label(after_window);
        let mut state = self.begin("break-pane", format!("{pane} {label} -> {new_name}"))?;
        let (si, wi, _) = state.locate(pane)?;
        if state.sessions[si].windows[wi].panes.len() < 2 {
            return Err(TmuxError::command("break-pane", "can't break with only one pane"));
        }
        let (target_si, target_wi) = state.resolve(after_window)?;
        let after_id = state.sessions[target_si].windows[target_wi].id.clone();
        let moved = state.take_pane(pane)?;
        let new_window = state.alloc_window(new_name, vec![moved]);

        let s = &mut state.sessions[target_si];
        let position = s
            .windows
            .iter()
            .position(|w| w.id == after_id)
            .map(|i| i + 1)
            .unwrap_or(s.windows.len());
        s.windows.insert(position, new_window);
        Ok(())
    }

    fn join_pane(&self, pane: &str, window: &str) -> Result<(), TmuxError> {
        let label = self.lock().label(window);
        let mut state = self.begin("join-pane", format!("{pane} -> {label}"))?;
        let source = state.locate(pane)?;
        let target = state.resolve(window)?;
        if (source.0, source.1) == target {
            return Err(TmuxError::command("join-pane", "source and target panes must be different"));
        }
        let target_id = state.sessions[target.0].windows[target.1].id.clone();
        let moved = state.take_pane(pane)?;
        state.window_mut(&target_id)?.panes.push(moved);
        Ok(())
    }

    fn kill_pane(&self, pane: &str) -> Result<(), TmuxError> {
        let mut state = self.begin("kill-pane", pane.to_string())?;
        state.take_pane(pane).map(drop)
    }

    fn kill_window(&self, window: &str) -> Result<(), TmuxError> {
        let label = self.lock().label(window);
        let mut state = self.begin("kill-window", label)?;
        let (si, wi) = state.resolve(window)?;
        state.sessions[si].windows.remove(wi);
        if state.sessions[si].windows.is_empty() {
            state.sessions.remove(si);
        }
        Ok(())
    }

    fn select_layout(&self, window: &str, layout: &str) -> Result<(), TmuxError> {
        let label = self.lock().label(window);
        let mut state = self.begin("select-layout", format!("{label} {layout}"))?;
        let w = state.window_mut(window)?;
        w.layout = Some(FakeLayout {
            name: layout.to_string(),
            main_pane_width: w.options.get("main-pane-width").cloned(),
        });
        Ok(())
    }

    fn set_pane_option(&self, pane: &str, key: &str, value: &str) -> Result<(), TmuxError> {
        let mut state = self.begin("set-option-pane", format!("{pane} {key}={value}"))?;
        state
            .pane_mut(pane)?
            .options
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_window_option(&self, window: &str, key: &str, value: &str) -> Result<(), TmuxError> {
        let label = self.lock().label(window);
        let mut state = self.begin("set-option-window", format!("{label} {key}={value}"))?;
        state
            .window_mut(window)?
            .options
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_session_option(&self, session: &str, key: &str, value: &str) -> Result<(), TmuxError> {
        let mut state = self.begin("set-option-session", format!("{session} {key}={value}"))?;
        state
            .session_mut(session)?
            .options
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn bind_key(&self, key: &str, command: &[&str]) -> Result<(), TmuxError> {
        let joined = command.join(" ");
        let mut state = self.begin("bind-key", format!("{key} {joined}"))?;
        state.bindings.insert(key.to_string(), joined);
        Ok(())
    }

    fn set_pane_title(&self, pane: &str, title: &str) -> Result<(), TmuxError> {
        let mut state = self.begin("select-pane-title", format!("{pane} {title}"))?;
        state.pane_mut(pane)?.title = title.to_string();
        Ok(())
    }

    fn send_keys(&self, pane: &str, keys: &[&str]) -> Result<(), TmuxError> {
        let joined = keys.join(" ");
        let mut state = self.begin("send-keys", format!("{pane} {joined}"))?;
        state.pane_mut(pane)?.keys.push(joined);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pane_window(fake: &FakeTmux) -> Vec<String> {
        fake.add_window(
            "forge",
            "api",
            vec![PaneSpec::bare().option("@role", "editor"), PaneSpec::bare()],
        )
    }

    fn id_of(fake: &FakeTmux, window: &str) -> String {
        fake.window_id("forge", window).unwrap()
    }

    #[test]
    fn list_panes_reports_index_by_position_and_tag() {
        let fake = FakeTmux::new();
        let ids = two_pane_window(&fake);
        let panes = fake.list_panes(&id_of(&fake, "api"), "@role").unwrap();
        assert_eq!(panes[0].id, ids[0]);
        assert_eq!(panes[0].tag, "editor");
        assert_eq!(panes[1].index, 1);
        assert_eq!(panes[1].tag, "");
    }

    #[test]
    fn pane_id_resolves_to_its_window() {
        let fake = FakeTmux::new();
        let ids = two_pane_window(&fake);
        assert_eq!(fake.list_panes(&ids[1], "@role").unwrap().len(), 2);
        fake.set_window_option(&ids[0], "main-pane-width", "50%").unwrap();
        assert_eq!(
            fake.window_option("forge", "api", "main-pane-width").as_deref(),
            Some("50%")
        );
    }

    #[test]
    fn duplicate_window_names_have_distinct_ids() {
        let fake = FakeTmux::new();
        let first = fake.add_window("forge", "zsh", vec![PaneSpec::bare()]);
        let second = fake.add_window("forge", "zsh", vec![PaneSpec::bare().dead()]);

        let windows = fake.list_windows("forge").unwrap();
        assert_eq!(windows.len(), 2);
        assert_ne!(windows[0].id, windows[1].id);
        assert!(windows.iter().all(|w| w.name == "zsh"));

        let panes = fake.list_panes(&windows[1].id, "@role").unwrap();
        assert_eq!(panes[0].id, second[0]);
        assert!(panes[0].dead);

        fake.kill_window(&windows[1].id).unwrap();
        assert_eq!(fake.panes("forge", "zsh")[0].id, first[0]);
        assert_eq!(fake.window_names("forge"), ["zsh"]);
    }

    #[test]
    fn killing_last_pane_removes_window_and_session() {
        let fake = FakeTmux::new();
        let ids = fake.add_window("forge", "solo", vec![PaneSpec::bare()]);
        fake.kill_pane(&ids[0]).unwrap();
        assert!(!fake.session_exists("forge"));
    }

    #[test]
    fn break_pane_inserts_window_after_source() {
        let fake = FakeTmux::new();
        let ids = two_pane_window(&fake);
        fake.add_window("forge", "web", vec![PaneSpec::bare()]);

        fake.break_pane(&ids[1], &id_of(&fake, "api"), "api-imps").unwrap();
        assert_eq!(fake.window_names("forge"), ["api", "api-imps", "web"]);
        assert_eq!(fake.panes("forge", "api").len(), 1);
        assert!(fake.calls().contains(&format!("break-pane {} forge:api -> api-imps", ids[1])));
    }

    #[test]
    fn break_pane_refuses_last_pane() {
        let fake = FakeTmux::new();
        let ids = fake.add_window("forge", "solo", vec![PaneSpec::bare()]);
        assert!(fake.break_pane(&ids[0], &id_of(&fake, "solo"), "solo-imps").is_err());
    }

    #[test]
    fn join_pane_moves_between_windows() {
        let fake = FakeTmux::new();
        let ids = two_pane_window(&fake);
        fake.add_window("forge", "api-imps", vec![PaneSpec::bare()]);
        fake.join_pane(&ids[1], &id_of(&fake, "api-imps")).unwrap();
        assert_eq!(fake.panes("forge", "api-imps").len(), 2);
        assert_eq!(fake.panes("forge", "api").len(), 1);
    }

    #[test]
    fn missing_targets_are_errors() {
        let fake = FakeTmux::new();
        assert!(!fake.has_session("forge").unwrap());
        assert!(fake.list_windows("forge").is_err());
        assert!(fake.kill_window("@9").is_err());
        assert!(fake.kill_pane("%99").is_err());
    }

    #[test]
    fn select_layout_captures_width_in_effect() {
        let fake = FakeTmux::new();
        two_pane_window(&fake);
        let api = id_of(&fake, "api");
        fake.select_layout(&api, "main-vertical").unwrap();
        fake.set_window_option(&api, "main-pane-width", "60%").unwrap();

        // Width set after selection is not picked up.
        let layout = fake.layout("forge", "api").unwrap();
        assert_eq!(layout.main_pane_width, None);
    }

    #[test]
    fn injected_failures_are_counted() {
        let fake = FakeTmux::new();
        let ids = two_pane_window(&fake);
        fake.fail_times("send-keys", 1);
        assert!(fake.send_keys(&ids[0], &["hi"]).is_err());
        assert!(fake.send_keys(&ids[0], &["hi"]).is_ok());

        fake.fail_on("kill-pane");
        assert!(fake.kill_pane(&ids[1]).is_err());
        assert!(fake.kill_pane(&ids[1]).is_err());
        assert_eq!(fake.calls().iter().filter(|c| c.starts_with("kill-pane")).count(), 2);
    }
}
