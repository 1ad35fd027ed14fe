//! Line-oriented control protocol.
//!
//! One UTF-8 command line in, one response line out, then the server
//! closes the connection. Plain words for command outcomes (`pong`,
//! `ok`, `error: …`); bypass state responses are a single JSON object.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::bypass::{BypassStatus, MAX_BYPASS_MINUTES, MIN_BYPASS_MINUTES};
use crate::error::{io_err, DaemonError};
use crate::paths::{socket_path, RESPONSE_TIMEOUT};

pub const RESP_PONG: &str = "pong";
pub const RESP_OK: &str = "ok";
pub const ERR_UNKNOWN_COMMAND: &str = "error: unknown command";
pub const ERR_INVALID_DURATION: &str = "error: invalid duration (1-120 minutes)";

/// A parsed control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Health check only.
    Ping,
    /// Run scheduler + hosts-file manager now.
    Refresh,
    /// Clear the managed section unconditionally.
    Reset,
    /// Activate a bypass for the given number of minutes (1–120).
    Bypass(u32),
    /// Clear the bypass.
    BypassCancel,
    /// Read bypass state without mutating it.
    BypassStatus,
}

/// A request the server answers with a fixed error line instead of
/// running anything. Not an error condition for the server itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnknownCommand,
    InvalidDuration,
}

impl Rejection {
    pub fn response(&self) -> &'static str {
        match self {
            Rejection::UnknownCommand => ERR_UNKNOWN_COMMAND,
            Rejection::InvalidDuration => ERR_INVALID_DURATION,
        }
    }
}

impl Command {
    /// Parse one command line. Whitespace-tolerant; anything outside
    /// the known set is an [`Rejection::UnknownCommand`].
    pub fn parse(line: &str) -> Result<Command, Rejection> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or(Rejection::UnknownCommand)?;
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(Rejection::UnknownCommand);
        }

        match (verb, arg) {
            ("ping", None) => Ok(Command::Ping),
            ("refresh", None) => Ok(Command::Refresh),
            ("reset", None) => Ok(Command::Reset),
            ("bypass", minutes) => {
                let minutes: u32 = minutes
                    .and_then(|m| m.parse().ok())
                    .ok_or(Rejection::InvalidDuration)?;
                if !(MIN_BYPASS_MINUTES..=MAX_BYPASS_MINUTES).contains(&minutes) {
                    return Err(Rejection::InvalidDuration);
                }
                Ok(Command::Bypass(minutes))
            }
            ("bypass-cancel", None) => Ok(Command::BypassCancel),
            ("bypass-status", None) => Ok(Command::BypassStatus),
            _ => Err(Rejection::UnknownCommand),
        }
    }
}

// ---------------------------------------------------------------------------
// Client side (CLI and the web backend)
// ---------------------------------------------------------------------------

/// Send one command line to the daemon socket and return one response line.
pub fn send_command(home: &Path, command: &str) -> Result<String, DaemonError> {
    send_command_with_timeout(home, command, RESPONSE_TIMEOUT)
}

fn send_command_with_timeout(
    home: &Path,
    command: &str,
    timeout: std::time::Duration,
) -> Result<String, DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::DaemonNotRunning {
                socket: socket.clone(),
            }
        } else {
            io_err(&socket, err)
        }
    })?;

    stream
        .set_read_timeout(Some(timeout))
        .map_err(|e| io_err(&socket, e))?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(|e| io_err(&socket, e))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| io_err(&socket, e))?;
    stream.write_all(b"\n").map_err(|e| io_err(&socket, e))?;
    stream.flush().map_err(|e| io_err(&socket, e))?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }

    Ok(line.trim_end().to_string())
}

/// `ping` → expects `pong`.
pub fn request_ping(home: &Path) -> Result<(), DaemonError> {
    expect_response(send_command(home, "ping")?, RESP_PONG)
}

/// `refresh` → expects `ok`.
pub fn request_refresh(home: &Path) -> Result<(), DaemonError> {
    expect_response(send_command(home, "refresh")?, RESP_OK)
}

/// `reset` → expects `ok`.
pub fn request_reset(home: &Path) -> Result<(), DaemonError> {
    expect_response(send_command(home, "reset")?, RESP_OK)
}

/// `bypass <minutes>` → parsed status payload.
pub fn request_bypass(home: &Path, minutes: u32) -> Result<BypassStatus, DaemonError> {
    parse_status(send_command(home, &format!("bypass {minutes}"))?)
}

/// `bypass-cancel` → expects `ok`.
pub fn request_bypass_cancel(home: &Path) -> Result<(), DaemonError> {
    expect_response(send_command(home, "bypass-cancel")?, RESP_OK)
}

/// `bypass-status` → parsed status payload.
pub fn request_bypass_status(home: &Path) -> Result<BypassStatus, DaemonError> {
    parse_status(send_command(home, "bypass-status")?)
}

fn expect_response(response: String, expected: &str) -> Result<(), DaemonError> {
    if response == expected {
        Ok(())
    } else {
        Err(DaemonError::Protocol(response))
    }
}

fn parse_status(response: String) -> Result<BypassStatus, DaemonError> {
    if response.starts_with("error:") {
        return Err(DaemonError::Protocol(response));
    }
    Ok(serde_json::from_str(&response)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("ping"), Ok(Command::Ping));
        assert_eq!(Command::parse("refresh"), Ok(Command::Refresh));
        assert_eq!(Command::parse("reset"), Ok(Command::Reset));
        assert_eq!(Command::parse("bypass 30"), Ok(Command::Bypass(30)));
        assert_eq!(Command::parse("bypass-cancel"), Ok(Command::BypassCancel));
        assert_eq!(Command::parse("bypass-status"), Ok(Command::BypassStatus));
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert_eq!(Command::parse("  ping  "), Ok(Command::Ping));
        assert_eq!(Command::parse("bypass   15"), Ok(Command::Bypass(15)));
    }

    #[test]
    fn rejects_unknown_commands() {
        for line in ["", "nope", "ping now", "refresh all", "bypass 5 extra"] {
            assert_eq!(
                Command::parse(line),
                Err(Rejection::UnknownCommand),
                "line: {line:?}"
            );
        }
    }

    #[test]
    fn bypass_duration_bounds_are_inclusive() {
        assert_eq!(Command::parse("bypass 1"), Ok(Command::Bypass(1)));
        assert_eq!(Command::parse("bypass 120"), Ok(Command::Bypass(120)));
        for line in ["bypass 0", "bypass 121", "bypass 200", "bypass", "bypass ten", "bypass -5"] {
            assert_eq!(
                Command::parse(line),
                Err(Rejection::InvalidDuration),
                "line: {line:?}"
            );
        }
    }

    #[test]
    fn unresponsive_daemon_does_not_block_the_client_forever() {
        use std::os::unix::net::UnixListener;
        use std::time::Duration;

        let home = tempfile::TempDir::new().unwrap();
        let socket = socket_path(home.path());
        std::fs::create_dir_all(socket.parent().unwrap()).unwrap();
        let listener = UnixListener::bind(&socket).unwrap();

        // Accept the connection but never answer.
        let mute_server = std::thread::spawn(move || {
            let conn = listener.accept();
            std::thread::sleep(Duration::from_millis(500));
            drop(conn);
        });

        let err = send_command_with_timeout(home.path(), "ping", Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, DaemonError::Io { .. }), "got: {err}");
        mute_server.join().unwrap();
    }

    #[test]
    fn rejection_responses_are_exact() {
        assert_eq!(
            Rejection::UnknownCommand.response(),
            "error: unknown command"
        );
        assert_eq!(
            Rejection::InvalidDuration.response(),
            "error: invalid duration (1-120 minutes)"
        );
    }
}
