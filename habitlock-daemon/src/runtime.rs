use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use habitlock_hosts::HostsFile;
use habitlock_scheduler::evaluate_at;

use crate::bypass::BypassStore;
use crate::error::{io_err, DaemonError};
use crate::paths::{
    backups_dir, bypass_state_path, logs_dir, run_dir, socket_path, state_dir,
    CONNECTION_TIMEOUT, POLL_INTERVAL,
};
use crate::protocol::{Command, RESP_OK, RESP_PONG};

/// Runtime configuration. Tests point `hosts_path` at a temp file;
/// production uses the defaults.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub home: PathBuf,
    pub hosts_path: PathBuf,
    pub poll_interval: Duration,
}

impl DaemonConfig {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            hosts_path: PathBuf::from(habitlock_hosts::DEFAULT_HOSTS_PATH),
            poll_interval: POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyKind {
    /// Evaluate habits, then rewrite the managed section accordingly.
    Refresh,
    /// Clear the managed section unconditionally.
    Reset,
}

struct ApplyJob {
    kind: ApplyKind,
    source: &'static str,
    respond_to: oneshot::Sender<Result<ApplySummary, String>>,
}

/// Outcome of one decide-and-mutate cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ApplySummary {
    pub blocked: usize,
    pub incomplete: usize,
    pub missed: usize,
}

/// The daemon orchestrator: owns the apply queue, the poll timer, and
/// the control-socket server. Explicit start/stop so multiple instances
/// (e.g. under test) never collide on shared handles.
pub struct Daemon {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<Result<(), DaemonError>>)>,
}

impl Daemon {
    /// Create runtime directories, bind the control socket, and spawn
    /// the worker tasks. Fails fast when another instance holds the
    /// socket.
    pub async fn start(config: DaemonConfig) -> Result<Self, DaemonError> {
        ensure_runtime_dirs(&config.home)?;

        let socket = socket_path(&config.home);
        prepare_socket_for_bind(&socket)?;
        let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
        set_socket_permissions(&socket)?;

        let bypass = Arc::new(BypassStore::new(bypass_state_path(&config.home)));
        let (apply_tx, apply_rx) = mpsc::channel::<ApplyJob>(64);
        let (shutdown_tx, _) = broadcast::channel::<()>(16);

        let mut tasks = Vec::new();

        tasks.push((
            "apply_processor",
            spawn_guarded(&shutdown_tx, {
                let config = config.clone();
                let bypass = bypass.clone();
                let shutdown = shutdown_tx.subscribe();
                apply_processor_task(config, bypass, apply_rx, shutdown)
            }),
        ));

        tasks.push((
            "poll_timer",
            spawn_guarded(&shutdown_tx, {
                let apply_tx = apply_tx.clone();
                let shutdown = shutdown_tx.subscribe();
                poll_timer_task(config.poll_interval, apply_tx, shutdown)
            }),
        ));

        tasks.push((
            "socket_server",
            spawn_guarded(&shutdown_tx, {
                let bypass = bypass.clone();
                let apply_tx = apply_tx.clone();
                let shutdown = shutdown_tx.subscribe();
                socket_server_task(listener, socket, bypass, apply_tx, shutdown)
            }),
        ));

        tracing::info!(home = %config.home.display(), "daemon started");
        Ok(Self { shutdown_tx, tasks })
    }

    /// Handle for signal integration and tests.
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Stop accepting connections, remove the socket file, and wait for
    /// every task. An in-flight hosts mutation runs to completion first.
    pub async fn stop(self) -> Result<(), DaemonError> {
        let _ = self.shutdown_tx.send(());
        for (name, handle) in self.tasks {
            handle_join(name, handle.await)?;
        }
        tracing::info!("daemon stopped");
        Ok(())
    }
}

/// Run the daemon until ctrl-c (or an internal task failure).
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    let daemon = Daemon::start(config).await?;
    let mut shutdown_rx = daemon.shutdown_signal().subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("received ctrl-c, shutting down daemon"),
                Err(err) => {
                    tracing::error!(error = %err, "ctrl-c handler failed, shutting down");
                }
            }
        }
    }

    daemon.stop().await
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn run_blocking(config: DaemonConfig) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

// ---------------------------------------------------------------------------
// Apply processor — the single serialization point for hosts mutations
// ---------------------------------------------------------------------------

async fn apply_processor_task(
    config: DaemonConfig,
    bypass: Arc<BypassStore>,
    mut apply_rx: mpsc::Receiver<ApplyJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = apply_rx.recv() => {
                let Some(job) = maybe_job else { break };

                let kind = job.kind;
                let source = job.source;
                let config_for_cycle = config.clone();
                let bypass_for_cycle = bypass.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    run_cycle_blocking(&config_for_cycle, &bypass_for_cycle, kind)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("apply task join error: {err}")))?;

                let outcome = match outcome {
                    Ok(summary) => {
                        tracing::info!(
                            source,
                            blocked = summary.blocked,
                            incomplete = summary.incomplete,
                            missed = summary.missed,
                            "apply cycle completed",
                        );
                        Ok(summary)
                    }
                    Err(err) => {
                        tracing::error!(source, error = %err, "apply cycle failed");
                        Err(err.to_string())
                    }
                };

                let _ = job.respond_to.send(outcome);
            }
        }
    }
    Ok(())
}

/// One decide-and-mutate cycle. Runs on the blocking pool; callers are
/// serialized through the apply queue.
fn run_cycle_blocking(
    config: &DaemonConfig,
    bypass: &BypassStore,
    kind: ApplyKind,
) -> Result<ApplySummary, DaemonError> {
    let hosts = HostsFile::new(&config.hosts_path, backups_dir(&config.home));

    match kind {
        ApplyKind::Reset => {
            hosts.apply(&[])?;
            Ok(ApplySummary::default())
        }
        ApplyKind::Refresh => {
            let now = Utc::now();
            let bypass_active = bypass.state().is_active(now);
            let evaluation = evaluate_at(&config.home, now, bypass_active)?;
            hosts.apply(&evaluation.domains_to_block)?;
            Ok(ApplySummary {
                blocked: evaluation.domains_to_block.len(),
                incomplete: evaluation.incomplete.len(),
                missed: evaluation.missed.len(),
            })
        }
    }
}

async fn enqueue_apply(
    apply_tx: &mpsc::Sender<ApplyJob>,
    kind: ApplyKind,
    source: &'static str,
) -> Result<ApplySummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    apply_tx
        .send(ApplyJob {
            kind,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("apply queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("apply response"))?;
    outcome.map_err(DaemonError::Protocol)
}

// ---------------------------------------------------------------------------
// Poll timer — fallback for purely time-based transitions
// ---------------------------------------------------------------------------

async fn poll_timer_task(
    poll_interval: Duration,
    apply_tx: mpsc::Sender<ApplyJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(poll_interval);
    // The first tick fires immediately so the hosts file converges on
    // startup without waiting a full interval.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                if let Err(err) = enqueue_apply(&apply_tx, ApplyKind::Refresh, "timer").await {
                    // No retry policy: the next tick is the recovery path.
                    tracing::error!(error = %err, "timer-triggered refresh failed");
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

async fn socket_server_task(
    listener: UnixListener,
    socket: PathBuf,
    bypass: Arc<BypassStore>,
    apply_tx: mpsc::Sender<ApplyJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                // Transient accept failures (connection aborted, fd
                // exhaustion) must never take the listener down.
                let stream = match accepted {
                    Ok((stream, _)) => stream,
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed on control socket");
                        continue;
                    }
                };
                let bypass = bypass.clone();
                let apply_tx = apply_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, bypass, apply_tx).await {
                        tracing::warn!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

/// One connection: one newline-terminated command, one newline-terminated
/// response, then the server closes.
async fn handle_socket_client(
    stream: UnixStream,
    bypass: Arc<BypassStore>,
    apply_tx: mpsc::Sender<ApplyJob>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // The buffered reader accumulates partial reads until a newline;
    // the timeout abandons clients that never complete a line.
    let line = match tokio::time::timeout(CONNECTION_TIMEOUT, lines.next_line()).await {
        Err(_) => {
            tracing::warn!("socket client timed out before sending a command");
            return Ok(());
        }
        Ok(result) => result.map_err(|e| io_err("control socket read", e))?,
    };
    let Some(line) = line else {
        return Ok(()); // client closed without sending anything
    };

    let response = match Command::parse(&line) {
        Ok(command) => dispatch_command(command, &bypass, &apply_tx).await,
        Err(rejection) => rejection.response().to_string(),
    };

    write_response(&mut writer, &response).await
}

async fn dispatch_command(
    command: Command,
    bypass: &Arc<BypassStore>,
    apply_tx: &mpsc::Sender<ApplyJob>,
) -> String {
    match command {
        Command::Ping => RESP_PONG.to_string(),
        Command::Refresh => match enqueue_apply(apply_tx, ApplyKind::Refresh, "socket").await {
            Ok(_) => RESP_OK.to_string(),
            Err(err) => {
                tracing::error!(error = %err, "refresh command failed");
                "error: refresh failed".to_string()
            }
        },
        Command::Reset => match enqueue_apply(apply_tx, ApplyKind::Reset, "socket").await {
            Ok(_) => RESP_OK.to_string(),
            Err(err) => {
                tracing::error!(error = %err, "reset command failed");
                "error: reset failed".to_string()
            }
        },
        Command::Bypass(minutes) => {
            let now = Utc::now();
            match bypass.activate(minutes, now) {
                Ok(state) => {
                    spawn_follow_up_refresh(apply_tx.clone(), "bypass");
                    status_json(&state.status(now))
                }
                Err(err) => {
                    tracing::error!(error = %err, "bypass activation failed");
                    "error: bypass activation failed".to_string()
                }
            }
        }
        Command::BypassCancel => match bypass.cancel() {
            Ok(()) => {
                spawn_follow_up_refresh(apply_tx.clone(), "bypass-cancel");
                RESP_OK.to_string()
            }
            Err(err) => {
                tracing::error!(error = %err, "bypass cancel failed");
                "error: bypass cancel failed".to_string()
            }
        },
        Command::BypassStatus => status_json(&bypass.state().status(Utc::now())),
    }
}

/// Bypass changes should reach the hosts file without waiting for the
/// next poll tick; the refresh runs through the same serialized queue.
fn spawn_follow_up_refresh(apply_tx: mpsc::Sender<ApplyJob>, source: &'static str) {
    tokio::spawn(async move {
        if let Err(err) = enqueue_apply(&apply_tx, ApplyKind::Refresh, source).await {
            tracing::warn!(error = %err, source, "follow-up refresh failed");
        }
    });
}

fn status_json(status: &crate::bypass::BypassStatus) -> String {
    serde_json::to_string(status).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to serialize bypass status");
        "error: bypass status unavailable".to_string()
    })
}

async fn write_response(writer: &mut OwnedWriteHalf, response: &str) -> Result<(), DaemonError> {
    writer
        .write_all(response.as_bytes())
        .await
        .map_err(|e| io_err("control socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("control socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("control socket flush", e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Startup plumbing
// ---------------------------------------------------------------------------

fn spawn_guarded(
    shutdown_tx: &broadcast::Sender<()>,
    task: impl std::future::Future<Output = Result<(), DaemonError>> + Send + 'static,
) -> JoinHandle<Result<(), DaemonError>> {
    let shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        let result = task.await;
        let _ = shutdown.send(());
        result
    })
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [run_dir(home), state_dir(home), backups_dir(home), logs_dir(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

/// Remove a stale socket left by a crashed prior instance. A socket a
/// live daemon still answers on is a hard startup error.
fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "control socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale control socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Group-accessible but not world-writable: the web backend runs as the
/// same user/group as the daemon.
#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o660)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use habitlock_core::store::{save_habit_at, save_settings_at};
    use habitlock_core::types::{Habit, HabitId, Settings};
    use tempfile::TempDir;

    const BASE_HOSTS: &str = "127.0.0.1 localhost\n::1 localhost\n";

    fn test_config(dir: &TempDir) -> DaemonConfig {
        let hosts = dir.path().join("hosts");
        fs::write(&hosts, BASE_HOSTS).expect("seed hosts file");
        DaemonConfig {
            home: dir.path().to_path_buf(),
            hosts_path: hosts,
            // Long enough that only the immediate startup tick fires.
            poll_interval: Duration::from_secs(3600),
        }
    }

    fn always_overdue_habit(id: &str) -> Habit {
        Habit {
            id: HabitId::from(id),
            name: format!("habit {id}"),
            deadline: Some("00:00".to_string()),
            active_days: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    async fn send(home: &Path, line: &str) -> String {
        let home = home.to_path_buf();
        let line = line.to_string();
        tokio::task::spawn_blocking(move || crate::protocol::send_command(&home, &line))
            .await
            .expect("client task join")
            .expect("send command")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ping_round_trip_over_live_socket() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::start(test_config(&dir)).await.expect("start");

        assert_eq!(send(dir.path(), "ping").await, "pong");

        daemon.stop().await.expect("stop");
        assert!(
            !socket_path(dir.path()).exists(),
            "socket file should be removed on shutdown"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_command_gets_fixed_error_line() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::start(test_config(&dir)).await.expect("start");

        assert_eq!(send(dir.path(), "selfdestruct").await, "error: unknown command");
        assert_eq!(
            send(dir.path(), "bypass 500").await,
            "error: invalid duration (1-120 minutes)"
        );

        daemon.stop().await.expect("stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refresh_bypass_and_reset_flow() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        save_habit_at(dir.path(), &always_overdue_habit("exercise")).unwrap();
        save_settings_at(
            dir.path(),
            &Settings {
                blocked_domains: vec!["reddit.com".to_string()],
            },
        )
        .unwrap();

        let daemon = Daemon::start(config.clone()).await.expect("start");

        assert_eq!(send(dir.path(), "refresh").await, "ok");
        let hosts = fs::read_to_string(&config.hosts_path).unwrap();
        assert!(hosts.contains("127.0.0.1 reddit.com"), "hosts: {hosts}");
        assert!(hosts.contains("127.0.0.1 www.reddit.com"));
        assert!(hosts.starts_with(BASE_HOSTS), "unmanaged lines preserved");

        let status = send(dir.path(), "bypass 30").await;
        assert!(status.contains("\"isActive\":true"), "status: {status}");

        // The bypass triggers its own refresh, but an explicit one is
        // deterministic: both run through the same serialized queue.
        assert_eq!(send(dir.path(), "refresh").await, "ok");
        let hosts = fs::read_to_string(&config.hosts_path).unwrap();
        assert!(!hosts.contains("reddit.com"), "bypass should clear blocking");

        assert_eq!(send(dir.path(), "bypass-cancel").await, "ok");
        assert_eq!(send(dir.path(), "refresh").await, "ok");
        let hosts = fs::read_to_string(&config.hosts_path).unwrap();
        assert!(hosts.contains("127.0.0.1 reddit.com"));

        assert_eq!(send(dir.path(), "reset").await, "ok");
        let hosts = fs::read_to_string(&config.hosts_path).unwrap();
        assert_eq!(hosts, BASE_HOSTS, "reset restores the unmanaged content");

        daemon.stop().await.expect("stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn abrupt_client_disconnect_does_not_stop_the_listener() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::start(test_config(&dir)).await.expect("start");

        // A client that sends a partial command and hangs up without
        // reading a response.
        {
            use std::io::Write;
            let mut stream =
                StdUnixStream::connect(socket_path(dir.path())).expect("connect");
            stream.write_all(b"refre").expect("write");
        }

        assert_eq!(send(dir.path(), "ping").await, "pong");
        daemon.stop().await.expect("stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_commands_serialize_hosts_mutations() {
        use habitlock_hosts::section;

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        save_habit_at(dir.path(), &always_overdue_habit("exercise")).unwrap();
        save_settings_at(
            dir.path(),
            &Settings {
                blocked_domains: vec!["reddit.com".to_string()],
            },
        )
        .unwrap();

        let daemon = Daemon::start(config.clone()).await.expect("start");

        let responses = tokio::join!(
            send(dir.path(), "refresh"),
            send(dir.path(), "reset"),
            send(dir.path(), "refresh"),
            send(dir.path(), "reset"),
            send(dir.path(), "refresh"),
            send(dir.path(), "refresh"),
        );
        let responses = [
            responses.0,
            responses.1,
            responses.2,
            responses.3,
            responses.4,
            responses.5,
        ];
        for response in &responses {
            assert_eq!(response, "ok");
        }

        let content = fs::read_to_string(&config.hosts_path).unwrap();
        assert!(
            content.matches(section::SECTION_BEGIN).count() <= 1,
            "contending cycles must never duplicate the section: {content:?}"
        );
        assert_eq!(
            section::strip_section(&content),
            BASE_HOSTS,
            "bytes outside the section must survive contention"
        );

        // One snapshot per completed mutation; the startup tick may have
        // contributed one more.
        let backups = fs::read_dir(backups_dir(dir.path()))
            .expect("backups dir")
            .filter_map(|e| e.ok())
            .count();
        assert!(
            (6..=7).contains(&backups),
            "expected one backup per mutation, got {backups}"
        );

        assert_eq!(send(dir.path(), "reset").await, "ok");
        assert_eq!(fs::read_to_string(&config.hosts_path).unwrap(), BASE_HOSTS);

        daemon.stop().await.expect("stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bypass_status_reports_inactive_by_default() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::start(test_config(&dir)).await.expect("start");

        let status = send(dir.path(), "bypass-status").await;
        assert!(status.contains("\"isActive\":false"), "status: {status}");
        assert!(status.contains("\"bypassUntil\":null"));

        daemon.stop().await.expect("stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_socket_file_is_replaced_on_start() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let socket = socket_path(dir.path());
        fs::create_dir_all(socket.parent().unwrap()).unwrap();
        fs::write(&socket, b"").unwrap();

        let daemon = Daemon::start(config).await.expect("start over stale socket");
        assert_eq!(send(dir.path(), "ping").await, "pong");
        daemon.stop().await.expect("stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_instance_refuses_live_socket() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::start(test_config(&dir)).await.expect("start");

        let second = Daemon::start(test_config(&dir)).await;
        assert!(second.is_err(), "live socket must not be stolen");

        daemon.stop().await.expect("stop");
    }
}
