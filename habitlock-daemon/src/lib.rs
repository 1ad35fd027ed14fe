//! The habitlock background daemon: evaluates habit deadlines, rewrites
//! the managed `/etc/hosts` section, and serves a line-oriented control
//! protocol over a Unix domain socket.

pub mod bypass;
pub mod error;
pub mod launchd;
pub mod paths;
pub mod protocol;
pub mod runtime;

pub use bypass::{BypassState, BypassStatus, BypassStore};
pub use error::DaemonError;
pub use runtime::{run, run_blocking, ApplySummary, Daemon, DaemonConfig};
