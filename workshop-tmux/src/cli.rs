//! [`Tmux`] implementation that shells out to the tmux binary.
//!
//! Every call is one `tmux …` process. Output that carries data is requested
//! with an explicit `-F` format and parsed by the `parse_*` helpers below, so
//! the parsers can be tested without a server.

use std::path::Path;
use std::process::Command;

use crate::error::TmuxError;
use crate::port::{session_target, PaneInfo, Split, Tmux, WindowInfo};

const PANE_ID_FORMAT: &str = "#{pane_id}";
const WINDOW_FORMAT: &str = "#{window_id}\t#{window_name}";

/// Talks to the tmux server through the command line.
#[derive(Debug, Clone)]
pub struct TmuxCli {
    program: String,
}

impl Default for TmuxCli {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run `tmux <args>` and return stdout on success.
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        tracing::trace!(program = %self.program, ?args, "tmux");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| TmuxError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            };
            return Err(TmuxError::command(args.first().copied().unwrap_or(""), stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_for_pane_id(&self, args: &[&str]) -> Result<String, TmuxError> {
        let out = self.run(args)?;
        parse_pane_id(&out)
    }
}

impl Tmux for TmuxCli {
    fn has_session(&self, session: &str) -> Result<bool, TmuxError> {
        let target = session_target(session);
        match self.run(&["has-session", "-t", &target]) {
            Ok(_) => Ok(true),
            Err(TmuxError::Command { stderr, .. }) if is_absent_session(&stderr) => {
                tracing::debug!(session, %stderr, "session absent");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, TmuxError> {
        let target = session_target(session);
        let out = self.run(&["list-windows", "-t", &target, "-F", WINDOW_FORMAT])?;
        parse_list_windows(&out)
    }

    fn list_panes(&self, window: &str, tag_option: &str) -> Result<Vec<PaneInfo>, TmuxError> {
        let format = list_panes_format(tag_option);
        let out = self.run(&["list-panes", "-t", window, "-F", &format])?;
        parse_list_panes(&out)
    }

    fn new_session(&self, session: &str, window: &str, cwd: &Path) -> Result<String, TmuxError> {
        let cwd = cwd.display().to_string();
        self.run_for_pane_id(&[
            "new-session", "-d", "-s", session, "-n", window, "-c", &cwd, "-P", "-F",
            PANE_ID_FORMAT,
        ])
    }

    fn new_window(&self, session: &str, window: &str, cwd: &Path) -> Result<String, TmuxError> {
        let cwd = cwd.display().to_string();
        let target = format!("{}:", session_target(session));
        self.run_for_pane_id(&[
            "new-window", "-d", "-t", &target, "-n", window, "-c", &cwd, "-P", "-F",
            PANE_ID_FORMAT,
        ])
    }

    fn split_pane(&self, pane: &str, split: Split, cwd: &Path) -> Result<String, TmuxError> {
        let flag = match split {
            Split::Horizontal => "-h",
            Split::Vertical => "-v",
        };
        let cwd = cwd.display().to_string();
        self.run_for_pane_id(&[
            "split-window", "-d", flag, "-t", pane, "-c", &cwd, "-P", "-F", PANE_ID_FORMAT,
        ])
    }

    fn respawn_pane(&self, pane: &str, command: &str) -> Result<(), TmuxError> {
        self.run(&["respawn-pane", "-k", "-t", pane, command]).map(drop)
    }

    fn break_pane(&self, pane: &str, after_window: &str, new_name: &str)
        -> Result<(), TmuxError> {
        self.run(&["break-pane", "-d", "-a", "-s", pane, "-t", after_window, "-n", new_name])
            .map(drop)
    }

    fn join_pane(&self, pane: &str, window: &str) -> Result<(), TmuxError> {
        self.run(&["join-pane", "-d", "-s", pane, "-t", window]).map(drop)
    }

    fn kill_pane(&self, pane: &str) -> Result<(), TmuxError> {
        self.run(&["kill-pane", "-t", pane]).map(drop)
    }

    fn kill_window(&self, window: &str) -> Result<(), TmuxError> {
        self.run(&["kill-window", "-t", window]).map(drop)
    }

    fn select_layout(&self, window: &str, layout: &str) -> Result<(), TmuxError> {
        self.run(&["select-layout", "-t", window, layout]).map(drop)
    }

    fn set_pane_option(&self, pane: &str, key: &str, value: &str) -> Result<(), TmuxError> {
        self.run(&["set-option", "-p", "-t", pane, key, value]).map(drop)
    }

    fn set_window_option(&self, window: &str, key: &str, value: &str) -> Result<(), TmuxError> {
        self.run(&["set-option", "-w", "-t", window, key, value]).map(drop)
    }

    fn set_session_option(&self, session: &str, key: &str, value: &str) -> Result<(), TmuxError> {
        let target = session_target(session);
        self.run(&["set-option", "-t", &target, key, value]).map(drop)
    }

    fn bind_key(&self, key: &str, command: &[&str]) -> Result<(), TmuxError> {
        let mut args = vec!["bind-key", key];
        args.extend_from_slice(command);
        self.run(&args).map(drop)
    }

    fn set_pane_title(&self, pane: &str, title: &str) -> Result<(), TmuxError> {
        self.run(&["select-pane", "-t", pane, "-T", title]).map(drop)
    }

    fn send_keys(&self, pane: &str, keys: &[&str]) -> Result<(), TmuxError> {
        let mut args = vec!["send-keys", "-t", pane];
        args.extend_from_slice(keys);
        self.run(&args).map(drop)
    }
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

/// `list-panes -F` format: id, index, dead flag and one pane option,
/// tab-separated.
pub fn list_panes_format(tag_option: &str) -> String {
    format!("#{{pane_id}}\t#{{pane_index}}\t#{{pane_dead}}\t#{{{tag_option}}}")
}

/// Parse lines produced by [`list_panes_format`].
pub fn parse_list_panes(output: &str) -> Result<Vec<PaneInfo>, TmuxError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_pane_line)
        .collect()
}

fn parse_pane_line(line: &str) -> Result<PaneInfo, TmuxError> {
    let parse_err = |reason: &str| TmuxError::Parse {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let mut fields = line.splitn(4, '\t');
    let id = fields.next().unwrap_or_default();
    if !id.starts_with('%') {
        return Err(parse_err("pane id must start with '%'"));
    }
    let index = fields
        .next()
        .ok_or_else(|| parse_err("missing pane index"))?
        .parse::<u32>()
        .map_err(|_| parse_err("pane index is not a number"))?;
    let dead = match fields.next() {
        Some("1") => true,
        Some("0") => false,
        _ => return Err(parse_err("pane_dead must be 0 or 1")),
    };
    let tag = fields.next().unwrap_or_default().trim().to_string();

    Ok(PaneInfo {
        id: id.to_string(),
        index,
        dead,
        tag,
    })
}

/// Parse `list-windows -F "#{window_id}\t#{window_name}"` output. The name
/// is everything after the first tab, so names containing tabs survive.
pub fn parse_list_windows(output: &str) -> Result<Vec<WindowInfo>, TmuxError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (id, name) = line.split_once('\t').unwrap_or((line, ""));
            if !id.starts_with('@') {
                return Err(TmuxError::Parse {
                    line: line.to_string(),
                    reason: "window id must start with '@'".to_string(),
                });
            }
            Ok(WindowInfo {
                id: id.to_string(),
                name: name.trim_end().to_string(),
            })
        })
        .collect()
}

/// Whether `has-session` stderr means "there is no such session" rather than
/// "the server could not be asked". A missing socket file is the no-server
/// case; any other connect error (permissions, a wedged server) is a real
/// failure.
pub fn is_absent_session(stderr: &str) -> bool {
    stderr.contains("can't find session")
        || stderr.contains("session not found")
        || stderr.contains("no server running")
        || (stderr.contains("error connecting to") && stderr.contains("No such file or directory"))
}

fn parse_pane_id(output: &str) -> Result<String, TmuxError> {
    let id = output.trim();
    if id.starts_with('%') && id.len() > 1 {
        Ok(id.to_string())
    } else {
        Err(TmuxError::Parse {
            line: id.to_string(),
            reason: "expected a pane id".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn list_panes_format_reads_requested_option() {
        assert_eq!(
            list_panes_format("@role"),
            "#{pane_id}\t#{pane_index}\t#{pane_dead}\t#{@role}"
        );
    }

    #[test]
    fn parses_tagged_untagged_and_dead_panes() {
        let out = "%1\t0\t0\teditor\n%2\t1\t0\tagent\n%7\t2\t1\t\n";
        let panes = parse_list_panes(out).unwrap();
        assert_eq!(panes.len(), 3);
        assert_eq!(panes[0].id, "%1");
        assert_eq!(panes[0].tag, "editor");
        assert_eq!(panes[1].index, 1);
        assert!(panes[2].dead);
        assert_eq!(panes[2].tag, "");
    }

    #[test]
    fn missing_trailing_tag_field_is_untagged() {
        let panes = parse_list_panes("%3\t0\t0").unwrap();
        assert_eq!(panes[0].tag, "");
    }

    #[test]
    fn garbage_line_is_a_parse_error() {
        let err = parse_list_panes("no server running").unwrap_err();
        assert!(matches!(err, TmuxError::Parse { .. }));
        let err = parse_list_panes("%1\tx\t0\t").unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn windows_keep_ids_and_duplicate_names() {
        let windows = parse_list_windows("@1\tapi\n\n@4\tzsh\n@7\tzsh\n").unwrap();
        let ids: Vec<&str> = windows.iter().map(|w| w.id.as_str()).collect();
        let names: Vec<&str> = windows.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(ids, ["@1", "@4", "@7"]);
        assert_eq!(names, ["api", "zsh", "zsh"]);
    }

    #[test]
    fn window_line_without_id_is_a_parse_error() {
        let err = parse_list_windows("api\n").unwrap_err();
        assert!(matches!(err, TmuxError::Parse { .. }));
    }

    #[rstest]
    #[case::no_session("can't find session: forge", true)]
    #[case::old_wording("session not found: forge", true)]
    #[case::no_server("no server running on /tmp/tmux-1000/default", true)]
    #[case::no_socket(
        "error connecting to /tmp/tmux-1000/default (No such file or directory)",
        true
    )]
    #[case::socket_denied(
        "error connecting to /tmp/tmux-1000/default (Permission denied)",
        false
    )]
    #[case::bare_exit("exit status: 1", false)]
    #[case::protocol("server version is too old for client", false)]
    fn has_session_stderr_classification(#[case] stderr: &str, #[case] absent: bool) {
        assert_eq!(is_absent_session(stderr), absent);
    }

    #[test]
    fn pane_id_output_is_validated() {
        assert_eq!(parse_pane_id("%42\n").unwrap(), "%42");
        assert!(parse_pane_id("").is_err());
    }

    /// A stand-in tmux that prints `stderr` and exits 1 for every command.
    #[cfg(unix)]
    fn failing_tmux(dir: &std::path::Path, stderr: &str) -> TmuxCli {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("tmux");
        std::fs::write(&path, format!("#!/bin/sh\necho \"{stderr}\" >&2\nexit 1\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        TmuxCli::new(path.display().to_string())
    }

    #[cfg(unix)]
    #[test]
    fn missing_session_reads_as_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let tmux = failing_tmux(dir.path(), "can't find session: forge");
        assert!(!tmux.has_session("forge").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn unreachable_server_is_an_error_not_an_absent_session() {
        let dir = tempfile::TempDir::new().unwrap();
        let tmux = failing_tmux(
            dir.path(),
            "error connecting to /tmp/tmux-1000/default (Permission denied)",
        );
        let err = tmux.has_session("forge").unwrap_err();
        assert!(matches!(err, TmuxError::Command { .. }), "got: {err}");
        assert!(err.to_string().contains("Permission denied"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let tmux = TmuxCli::new("/definitely/not/a/tmux");
        let err = tmux.has_session("forge").unwrap_err();
        assert!(matches!(err, TmuxError::Spawn { .. }), "got: {err}");
    }
}
