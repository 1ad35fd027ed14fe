//! `habitlock bypass` — temporary blocking override.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use habitlock_daemon::protocol::{request_bypass, request_bypass_cancel, request_bypass_status};
use habitlock_daemon::{BypassStatus, DaemonError};

use super::home_dir;

#[derive(Subcommand, Debug)]
pub enum BypassCommand {
    /// Suspend blocking for a number of minutes.
    Start(BypassStartArgs),
    /// End the bypass immediately.
    Cancel,
    /// Show the current bypass window.
    Status,
}

#[derive(Args, Debug)]
pub struct BypassStartArgs {
    /// Bypass duration in minutes.
    #[arg(value_parser = clap::value_parser!(u32).range(1..=120))]
    pub minutes: u32,
}

pub fn run(command: BypassCommand) -> Result<()> {
    let home = home_dir()?;

    match command {
        BypassCommand::Start(args) => match request_bypass(&home, args.minutes) {
            Ok(status) => print_window(&status),
            Err(err) => return fail(err, "failed to activate bypass"),
        },
        BypassCommand::Cancel => match request_bypass_cancel(&home) {
            Ok(()) => println!("bypass cancelled"),
            Err(err) => return fail(err, "failed to cancel bypass"),
        },
        BypassCommand::Status => match request_bypass_status(&home) {
            Ok(status) => print_window(&status),
            Err(err) => return fail(err, "failed to query bypass status"),
        },
    }

    Ok(())
}

fn print_window(status: &BypassStatus) {
    match status.bypass_until {
        Some(until) if status.is_active => {
            println!(
                "bypass active: {} minute(s) remaining (until {})",
                status.remaining_minutes,
                until.to_rfc3339()
            );
        }
        _ => println!("no bypass active"),
    }
}

fn fail(err: DaemonError, context: &'static str) -> Result<()> {
    if let DaemonError::DaemonNotRunning { socket } = &err {
        println!("daemon is not running (socket missing: {})", socket.display());
        std::process::exit(1);
    }
    Err(err).context(context)
}
