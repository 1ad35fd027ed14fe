//! macOS launchd integration: install the daemon as a per-user
//! LaunchAgent so it starts at login and restarts after crashes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{io_err, DaemonError};
use crate::paths::{
    launch_agents_dir, launchd_plist_path, logs_dir, run_dir, socket_path, state_dir,
    stderr_log_path, stdout_log_path, DAEMON_LABEL,
};

/// Where the CLI binary lands when installed system-wide. `install`
/// prefers the running executable's own path when it can resolve one.
const DEFAULT_BINARY_PATH: &str = "/usr/local/bin/habitlock";

/// Render the LaunchAgent plist. The agent runs `habitlock daemon run`
/// in the foreground; launchd owns the process lifecycle.
pub fn render_plist(binary: &Path, home: &Path) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{binary}</string>
    <string>daemon</string>
    <string>run</string>
  </array>
  <key>RunAtLoad</key>
  <true/>
  <key>KeepAlive</key>
  <true/>
  <key>ProcessType</key>
  <string>Background</string>
  <key>StandardOutPath</key>
  <string>{stdout}</string>
  <key>StandardErrorPath</key>
  <string>{stderr}</string>
</dict>
</plist>
"#,
        label = DAEMON_LABEL,
        binary = binary.display(),
        stdout = stdout_log_path(home).display(),
        stderr = stderr_log_path(home).display(),
    )
}

/// Write the plist, bootstrap it into the user's gui domain, and kick
/// the service so it starts immediately. Returns the plist path.
pub fn install(home: &Path) -> Result<PathBuf, DaemonError> {
    ensure_macos()?;

    for dir in [launch_agents_dir(home), logs_dir(home), run_dir(home), state_dir(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }

    let binary = daemon_binary_path();
    let plist = launchd_plist_path(home);
    fs::write(&plist, render_plist(&binary, home)).map_err(|e| io_err(&plist, e))?;

    let domain = launchctl_domain()?;
    let service = format!("{domain}/{DAEMON_LABEL}");

    // A previous generation may still be loaded; boot it out first.
    let _ = run_launchctl(&["bootout", &service], true);
    run_launchctl(&["bootstrap", &domain, &plist.display().to_string()], false)?;
    run_launchctl(&["kickstart", "-k", &service], false)?;

    tracing::info!(plist = %plist.display(), "launchd agent installed");
    Ok(plist)
}

/// Boot the service out of launchd, remove the plist, and clean up the
/// control socket. Missing pieces are not errors.
pub fn uninstall(home: &Path) -> Result<(), DaemonError> {
    ensure_macos()?;

    let plist = launchd_plist_path(home);
    if plist.exists() {
        let domain = launchctl_domain()?;
        let service = format!("{domain}/{DAEMON_LABEL}");
        let _ = run_launchctl(&["bootout", &service], true);
        fs::remove_file(&plist).map_err(|e| io_err(&plist, e))?;
    }

    let socket = socket_path(home);
    if socket.exists() {
        let _ = fs::remove_file(socket);
    }

    tracing::info!("launchd agent removed");
    Ok(())
}

fn daemon_binary_path() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|_| PathBuf::from(DEFAULT_BINARY_PATH))
}

#[cfg(target_os = "macos")]
fn ensure_macos() -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn ensure_macos() -> Result<(), DaemonError> {
    Err(DaemonError::Launchd(
        "launchd management is only supported on macOS".to_string(),
    ))
}

fn run_launchctl(args: &[&str], ignore_failure: bool) -> Result<(), DaemonError> {
    let output = Command::new("launchctl")
        .args(args)
        .output()
        .map_err(|e| io_err("launchctl", e))?;

    if output.status.success() || ignore_failure {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(DaemonError::Launchd(format!(
        "launchctl {} failed (status {}): {} {}",
        args.first().copied().unwrap_or_default(),
        output.status,
        stdout,
        stderr
    )))
}

fn launchctl_domain() -> Result<String, DaemonError> {
    let output = Command::new("id")
        .arg("-u")
        .output()
        .map_err(|e| io_err("id -u", e))?;
    if !output.status.success() {
        return Err(DaemonError::Launchd(format!(
            "failed to resolve current uid (status {})",
            output.status
        )));
    }

    let uid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if uid.is_empty() {
        return Err(DaemonError::Launchd(
            "current uid from `id -u` was empty".to_string(),
        ));
    }
    Ok(format!("gui/{uid}"))
}
