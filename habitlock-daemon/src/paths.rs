use std::path::{Path, PathBuf};
use std::time::Duration;

use habitlock_core::store::habitlock_root;

pub const DAEMON_LABEL: &str = "dev.habitlock.daemon";

/// Fallback cadence for time-based transitions (a deadline passing with
/// no socket trigger).
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// A connection that never completes a command line is abandoned after this.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-side bound on one command exchange; a hung daemon must not
/// block the caller forever.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DAEMON_SOCKET: &str = "habitlockd.sock";
pub const DAEMON_STDOUT_LOG: &str = "daemon.log";
pub const DAEMON_STDERR_LOG: &str = "daemon-err.log";

pub fn run_dir(home: &Path) -> PathBuf {
    habitlock_root(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    run_dir(home).join(DAEMON_SOCKET)
}

pub fn state_dir(home: &Path) -> PathBuf {
    habitlock_root(home).join("state")
}

pub fn bypass_state_path(home: &Path) -> PathBuf {
    state_dir(home).join("bypass.json")
}

pub fn backups_dir(home: &Path) -> PathBuf {
    habitlock_root(home).join("backups")
}

pub fn logs_dir(home: &Path) -> PathBuf {
    habitlock_root(home).join("logs")
}

pub fn stdout_log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(DAEMON_STDOUT_LOG)
}

pub fn stderr_log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(DAEMON_STDERR_LOG)
}

pub fn launch_agents_dir(home: &Path) -> PathBuf {
    home.join("Library").join("LaunchAgents")
}

pub fn launchd_plist_path(home: &Path) -> PathBuf {
    launch_agents_dir(home).join(format!("{DAEMON_LABEL}.plist"))
}
