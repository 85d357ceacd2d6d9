//! Launching and reaching the relay daemon.

use crate::config::{DaemonConfig, SocketOwner};
use crate::context::LogContext;
use crate::error::ConnectionError;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::net::UnixStream;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Socket owner from `SUDO_UID`/`SUDO_GID`, falling back to `default`
/// for each id that is unset or not a number.
pub fn resolve_owner(default: SocketOwner) -> SocketOwner {
    owner_from(
        env::var("SUDO_UID").ok().as_deref(),
        env::var("SUDO_GID").ok().as_deref(),
        default,
    )
}

fn owner_from(uid: Option<&str>, gid: Option<&str>, default: SocketOwner) -> SocketOwner {
    let parse = |v: Option<&str>| v.and_then(|s| s.trim().parse::<u32>().ok());
    SocketOwner {
        uid: parse(uid).unwrap_or(default.uid),
        gid: parse(gid).unwrap_or(default.gid),
    }
}

/// Arguments passed to the daemon binary.
pub fn daemon_args(socket_path: &Path, owner: SocketOwner) -> Vec<OsString> {
    let mut path_arg = OsString::from("--socket-path=");
    path_arg.push(socket_path);
    vec![
        path_arg,
        OsString::from(format!("--socket-own={}:{}", owner.uid, owner.gid)),
    ]
}

/// Best effort: kill running daemon instances and remove a stale socket.
pub fn terminate_existing(config: &DaemonConfig, log: &LogContext) {
    if let Some(name) = config.daemon_path.file_name() {
        match Command::new("pkill")
            .arg("-x")
            .arg(name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => log::debug!(target: log.target(), "pkill {:?}: {}", name, status),
            Err(e) => log::debug!(target: log.target(), "pkill unavailable: {}", e),
        }
    }

    match fs::remove_file(&config.socket_path) {
        Ok(()) => log::debug!(
            target: log.target(),
            "removed stale socket {}",
            config.socket_path.display()
        ),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!(
            target: log.target(),
            "could not remove {}: {}",
            config.socket_path.display(),
            e
        ),
    }
}

/// Start the daemon in its own process group with detached stdio.
pub fn spawn_daemon(
    config: &DaemonConfig,
    owner: SocketOwner,
    log: &LogContext,
) -> Result<Child, ConnectionError> {
    log::info!(
        target: log.target(),
        "starting {} (socket owner {}:{})",
        config.daemon_path.display(),
        owner.uid,
        owner.gid
    );
    Command::new(&config.daemon_path)
        .args(daemon_args(&config.socket_path, owner))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
        .map_err(ConnectionError::Spawn)
}

/// Connect to the daemon socket, retrying with exponential backoff.
///
/// If `child` is given and exits before the socket accepts, the attempt
/// ends early with [`ConnectionError::Spawn`].
pub fn connect_with_retry(
    config: &DaemonConfig,
    mut child: Option<&mut Child>,
    log: &LogContext,
) -> Result<UnixStream, ConnectionError> {
    let path = config.socket_path.as_path();
    let timeout = config.connect_timeout();
    let start = Instant::now();
    let mut delay = config.initial_backoff();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let last_error = match UnixStream::connect(path) {
            Ok(stream) => {
                log::debug!(
                    target: log.target(),
                    "connected to {} after {} attempt(s)",
                    path.display(),
                    attempts
                );
                return Ok(stream);
            }
            Err(e) => e,
        };

        if let Some(child) = child.as_deref_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ConnectionError::Spawn(io::Error::other(format!(
                    "daemon exited early with {}",
                    status
                ))));
            }
        }

        let waited = start.elapsed();
        if waited >= timeout {
            return Err(ConnectionError::Timeout {
                path: path.to_path_buf(),
                waited,
                last_error,
            });
        }

        log::trace!(target: log.target(), "connect attempt {} failed: {}", attempts, last_error);
        thread::sleep(delay.min(timeout - waited));
        delay = next_backoff(delay, config.max_backoff());
    }
}

fn next_backoff(delay: Duration, max: Duration) -> Duration {
    (delay * 2).max(Duration::from_millis(1)).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;

    fn socket_path(name: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("inputsynth-{}-{}.sock", std::process::id(), name));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_owner_from_env_values() {
        let default = SocketOwner::default();
        assert_eq!(
            owner_from(Some("1001"), Some("100"), default),
            SocketOwner { uid: 1001, gid: 100 }
        );
        assert_eq!(owner_from(None, None, default), default);
        assert_eq!(
            owner_from(Some("abc"), Some(" 42 "), default),
            SocketOwner { uid: 1000, gid: 42 }
        );
    }

    #[test]
    fn test_daemon_args() {
        let args = daemon_args(Path::new("/tmp/.ydotool_socket"), SocketOwner { uid: 5, gid: 6 });
        assert_eq!(
            args,
            vec![
                OsString::from("--socket-path=/tmp/.ydotool_socket"),
                OsString::from("--socket-own=5:6"),
            ]
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let max = Duration::from_millis(250);
        let mut delay = Duration::from_millis(20);
        let mut seen = Vec::new();
        for _ in 0..6 {
            delay = next_backoff(delay, max);
            seen.push(delay.as_millis());
        }
        assert_eq!(seen, vec![40, 80, 160, 250, 250, 250]);
        assert_eq!(next_backoff(Duration::ZERO, max), Duration::from_millis(1));
    }

    #[test]
    fn test_connect_to_listening_socket() {
        let path = socket_path("retry-ok");
        let _listener = UnixListener::bind(&path).unwrap();
        let config = DaemonConfig::attach(&path);
        assert!(connect_with_retry(&config, None, &LogContext::default()).is_ok());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_connect_times_out() {
        let path = socket_path("retry-timeout");
        let config = DaemonConfig {
            connect_timeout_ms: 60,
            initial_backoff_ms: 5,
            max_backoff_ms: 20,
            ..DaemonConfig::attach(&path)
        };

        let start = Instant::now();
        let err = connect_with_retry(&config, None, &LogContext::default()).unwrap_err();
        match err {
            ConnectionError::Timeout { path: p, waited, .. } => {
                assert_eq!(p, path);
                assert!(waited >= Duration::from_millis(60));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_early_daemon_exit_stops_retrying() {
        let binary = Path::new("/bin/true");
        if !binary.exists() {
            return;
        }
        let path = socket_path("early-exit");
        let config = DaemonConfig {
            daemon_path: binary.to_path_buf(),
            socket_path: path,
            terminate_existing: false,
            connect_timeout_ms: 5000,
            ..DaemonConfig::default()
        };
        let log = LogContext::default();
        let mut child = spawn_daemon(&config, SocketOwner::default(), &log).unwrap();

        let start = Instant::now();
        let err = connect_with_retry(&config, Some(&mut child), &log).unwrap_err();
        assert!(matches!(err, ConnectionError::Spawn(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
