//! habitlock — deadline-based distraction blocking.
//!
//! # Usage
//!
//! ```text
//! habitlock daemon run|ping|install|uninstall|logs
//! habitlock refresh
//! habitlock reset
//! habitlock bypass start <minutes>
//! habitlock bypass cancel
//! habitlock bypass status
//! habitlock status
//! habitlock restore <snapshot>
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{bypass::BypassCommand, daemon::DaemonCommand};

#[derive(Parser, Debug)]
#[command(
    name = "habitlock",
    version,
    about = "Block distracting domains until daily habits are logged",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the background daemon and launchd integration.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Ask the daemon to re-evaluate habits and update the hosts file now.
    Refresh,

    /// Clear the managed hosts section unconditionally.
    Reset,

    /// Manage the temporary blocking bypass.
    Bypass {
        #[command(subcommand)]
        command: BypassCommand,
    },

    /// Show daemon, bypass, and blocking status.
    Status,

    /// Copy a hosts backup snapshot over the live hosts file.
    Restore(commands::blocking::RestoreArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Daemon { command } => commands::daemon::run(command),
        Commands::Refresh => commands::blocking::refresh(),
        Commands::Reset => commands::blocking::reset(),
        Commands::Bypass { command } => commands::bypass::run(command),
        Commands::Status => commands::blocking::status(),
        Commands::Restore(args) => commands::blocking::restore(args),
    }
}
