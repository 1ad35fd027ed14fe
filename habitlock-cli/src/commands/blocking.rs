//! `habitlock refresh` / `reset` / `status` — blocking state commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use habitlock_daemon::paths::backups_dir;
use habitlock_daemon::protocol::{request_bypass_status, request_ping, request_refresh, request_reset};
use habitlock_daemon::DaemonError;
use habitlock_hosts::{HostsError, HostsFile, DEFAULT_HOSTS_PATH};

use super::home_dir;

pub fn refresh() -> Result<()> {
    let home = home_dir()?;
    match request_refresh(&home) {
        Ok(()) => {
            println!("refresh complete");
            Ok(())
        }
        Err(err) => fail(err, "refresh failed"),
    }
}

pub fn reset() -> Result<()> {
    let home = home_dir()?;
    match request_reset(&home) {
        Ok(()) => {
            println!("managed hosts section cleared");
            Ok(())
        }
        Err(err) => fail(err, "reset failed"),
    }
}

/// Daemon liveness, bypass window, and the domains currently written to
/// the hosts file. Reads the hosts file directly so it works even when
/// the daemon is down.
pub fn status() -> Result<()> {
    let home = home_dir()?;

    let running = request_ping(&home).is_ok();
    let bypass = if running {
        request_bypass_status(&home).ok()
    } else {
        None
    };

    let hosts = HostsFile::new(DEFAULT_HOSTS_PATH, backups_dir(&home));
    let managed = match hosts.managed_domains() {
        Ok(domains) => domains,
        Err(HostsError::NotFound { .. }) => Vec::new(),
        Err(err) => return Err(err).context("failed to read hosts file"),
    };

    let payload = serde_json::json!({
        "daemonRunning": running,
        "bypass": bypass,
        "blockedDomains": managed,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to render status JSON")?
    );
    Ok(())
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Path to a snapshot under `~/.habitlock/backups/`.
    pub snapshot: PathBuf,
}

/// Emergency recovery: works without the daemon, but a running daemon's
/// next cycle will rewrite the managed section again.
pub fn restore(args: RestoreArgs) -> Result<()> {
    let home = home_dir()?;
    let hosts = HostsFile::new(DEFAULT_HOSTS_PATH, backups_dir(&home));
    hosts
        .restore(&args.snapshot)
        .with_context(|| format!("failed to restore {}", args.snapshot.display()))?;
    println!("restored hosts file from {}", args.snapshot.display());
    Ok(())
}

fn fail(err: DaemonError, context: &'static str) -> Result<()> {
    if let DaemonError::DaemonNotRunning { socket } = &err {
        println!("daemon is not running (socket missing: {})", socket.display());
        std::process::exit(1);
    }
    Err(err).context(context)
}
