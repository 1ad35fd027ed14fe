//! `habitlock daemon` — daemon lifecycle and launchd management.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use habitlock_daemon::paths::{stderr_log_path, stdout_log_path};
use habitlock_daemon::protocol::request_ping;
use habitlock_daemon::{launchd, run_blocking, DaemonConfig, DaemonError};

use super::home_dir;

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (scheduler + socket server).
    Run,
    /// Check whether the daemon is answering on its socket.
    Ping,
    /// Install and bootstrap the launchd agent (macOS).
    Install,
    /// Boot out and remove the launchd agent (macOS).
    Uninstall,
    /// Print recent daemon log lines.
    Logs(DaemonLogsArgs),
}

#[derive(Args, Debug)]
pub struct DaemonLogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,

    /// Show only the stderr log file.
    #[arg(long)]
    pub stderr_only: bool,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = home_dir()?;

    match command {
        DaemonCommand::Run => {
            run_blocking(DaemonConfig::new(&home)).context("daemon exited with error")?;
        }
        DaemonCommand::Ping => match request_ping(&home) {
            Ok(()) => println!("daemon is running"),
            Err(DaemonError::DaemonNotRunning { socket }) => {
                println!("daemon is not running (socket missing: {})", socket.display());
                std::process::exit(1);
            }
            Err(err) => return Err(err).context("failed to ping daemon"),
        },
        DaemonCommand::Install => {
            let path = launchd::install(&home).context("failed to install launchd agent")?;
            println!("installed launchd agent: {}", path.display());
        }
        DaemonCommand::Uninstall => {
            launchd::uninstall(&home).context("failed to uninstall launchd agent")?;
            println!("uninstalled launchd agent");
        }
        DaemonCommand::Logs(args) => {
            if args.stderr_only {
                print_tail(&stderr_log_path(&home), args.lines)
                    .context("failed to read daemon stderr log")?;
            } else {
                print_tail(&stdout_log_path(&home), args.lines)
                    .context("failed to read daemon stdout log")?;
                print_tail(&stderr_log_path(&home), args.lines)
                    .context("failed to read daemon stderr log")?;
            }
        }
    }

    Ok(())
}

fn print_tail(path: &std::path::Path, lines: usize) -> Result<()> {
    if !path.exists() {
        println!("log file not found: {}", path.display());
        return Ok(());
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut tail = VecDeque::<String>::new();
    for line in reader.lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    println!("==> {} <==", path.display());
    for line in tail {
        println!("{line}");
    }
    Ok(())
}
