use std::path::{Path, PathBuf};
use std::time::Duration;

use workshop_core::registry::{workshop_root, workshops_dir_at};

/// Editors often save in bursts (write, rename, chmod); events for the same
/// file inside this window collapse into one reconcile.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// How often the log file size is checked.
pub const ROTATION_CHECK_INTERVAL: Duration = Duration::from_secs(5);

pub const DAEMON_LOG: &str = "daemon.log";

pub fn workshops_root(home: &Path) -> PathBuf {
    workshops_dir_at(home)
}

pub fn logs_dir(home: &Path) -> PathBuf {
    workshop_root(home).join("logs")
}

pub fn log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(DAEMON_LOG)
}
