//! Relay daemon client.

use super::protocol::Command;
use super::spawn;
use crate::action::{Action, KeyState};
use crate::config::DaemonConfig;
use crate::context::LogContext;
use crate::error::{ConnectionError, Result};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::process::Child;
use std::thread;

/// Connection state of a [`DaemonClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Socket open; commands are sent.
    Connected,
    /// A connect attempt failed. Terminal for this client.
    Failed,
}

/// Client for a ydotoold-style relay daemon.
///
/// Key actions are written immediately. Button, move and scroll actions
/// are queued and written by [`flush`](Self::flush). Delivery is
/// fire-and-forget: nothing is read back from the daemon.
pub struct DaemonClient {
    config: DaemonConfig,
    state: ConnectionState,
    socket: Option<UnixStream>,
    child: Option<Child>,
    queue: VecDeque<Command>,
    log: LogContext,
}

impl DaemonClient {
    /// Create a disconnected client.
    pub fn new(config: DaemonConfig, log: LogContext) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            socket: None,
            child: None,
            queue: VecDeque::new(),
            log,
        }
    }

    /// Launch the daemon (unless attaching) and connect to its socket.
    ///
    /// A failure moves the client to [`ConnectionState::Failed`]; later
    /// calls return [`ConnectionError::AlreadyFailed`] without retrying.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connected if self.is_connected() => return Ok(()),
            ConnectionState::Failed => return Err(ConnectionError::AlreadyFailed.into()),
            _ => {}
        }

        self.state = ConnectionState::Connecting;
        match self.establish() {
            Ok(socket) => {
                log::info!(
                    target: self.log.target(),
                    "connected to relay socket {}",
                    self.config.socket_path.display()
                );
                self.socket = Some(socket);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                log::error!(target: self.log.target(), "relay connection failed: {}", e);
                if self.config.spawn {
                    log::warn!(
                        target: self.log.target(),
                        "check that {} is installed and may create {}",
                        self.config.daemon_path.display(),
                        self.config.socket_path.display()
                    );
                }
                self.state = ConnectionState::Failed;
                Err(e.into())
            }
        }
    }

    fn establish(&mut self) -> std::result::Result<UnixStream, ConnectionError> {
        if self.config.spawn && self.reap_exited() {
            log::debug!(
                target: self.log.target(),
                "reusing running daemon pid {:?}",
                self.daemon_pid()
            );
        } else if self.config.spawn {
            if !self.config.daemon_path.is_file() {
                return Err(ConnectionError::DaemonNotFound(
                    self.config.daemon_path.clone(),
                ));
            }
            if self.config.terminate_existing {
                spawn::terminate_existing(&self.config, &self.log);
            }
            let owner = spawn::resolve_owner(self.config.default_owner);
            self.child = Some(spawn::spawn_daemon(&self.config, owner, &self.log)?);
        }
        spawn::connect_with_retry(&self.config, self.child.as_mut(), &self.log)
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the socket is open.
    ///
    /// A peer that went away is only noticed by the next failed write.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.socket.is_some()
    }

    /// Process id of the daemon this client launched, if it is still held.
    pub fn daemon_pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Reap the launched daemon if it has exited. Returns whether it is
    /// still running.
    fn reap_exited(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => return true,
            Ok(Some(status)) => {
                log::info!(target: self.log.target(), "daemon pid {} exited with {}", child.id(), status)
            }
            Err(e) => log::warn!(target: self.log.target(), "daemon status unknown: {}", e),
        }
        self.child = None;
        false
    }

    /// Number of queued commands.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Send a key press transition.
    pub fn key_down(&mut self, code: u16) {
        self.send_now(Command::from(Action::Key {
            code,
            state: KeyState::Down,
        }));
    }

    /// Send a key release transition.
    pub fn key_up(&mut self, code: u16) {
        self.send_now(Command::from(Action::Key {
            code,
            state: KeyState::Up,
        }));
    }

    /// Send press and release as one command.
    pub fn key_press(&mut self, code: u16) {
        self.send_now(Command::press(code));
    }

    /// Queue a button press.
    pub fn button_down(&mut self, code: u16) {
        self.enqueue(Action::Button {
            code,
            state: KeyState::Down,
        });
    }

    /// Queue a button release.
    pub fn button_up(&mut self, code: u16) {
        self.enqueue(Action::Button {
            code,
            state: KeyState::Up,
        });
    }

    /// Queue press and release as one command.
    pub fn click(&mut self, code: u16) {
        self.enqueue_command(Command::press(code));
    }

    /// Queue relative pointer motion.
    pub fn move_relative(&mut self, dx: i32, dy: i32) {
        self.enqueue(Action::Move { dx, dy });
    }

    /// Queue wheel motion.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        self.enqueue(Action::Scroll { dx, dy });
    }

    /// Queue an action for the next [`flush`](Self::flush).
    ///
    /// Dropped when not connected.
    pub fn enqueue(&mut self, action: Action) {
        self.enqueue_command(Command::from(action));
    }

    fn enqueue_command(&mut self, command: Command) {
        if self.is_connected() {
            self.queue.push_back(command);
        } else {
            log::debug!(target: self.log.target(), "not connected, dropping '{}'", command);
        }
    }

    /// Write queued commands in FIFO order. Returns how many were written.
    ///
    /// Does nothing when the queue is empty or the client is not connected.
    /// A failed write drops that command and stops the drain.
    pub fn flush(&mut self) -> usize {
        if self.queue.is_empty() {
            return 0;
        }
        if !self.is_connected() {
            log::debug!(target: self.log.target(), "not connected, {} command(s) held", self.queue.len());
            return 0;
        }

        let mut sent = 0;
        while let Some(command) = self.queue.pop_front() {
            if self.write(&command).is_err() {
                break;
            }
            sent += 1;
        }
        log::trace!(target: self.log.target(), "flushed {} command(s)", sent);
        sent
    }

    /// Close the socket and drop queued commands.
    pub fn disconnect(&mut self) {
        self.queue.clear();
        if let Some(socket) = self.socket.take() {
            if let Err(e) = socket.shutdown(Shutdown::Both) {
                log::debug!(target: self.log.target(), "socket shutdown: {}", e);
            }
            log::info!(target: self.log.target(), "disconnected from relay socket");
        }
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Disconnect and release the daemon process handle. Idempotent.
    ///
    /// The daemon keeps running. A background thread waits for it so it
    /// does not linger as a zombie once it exits.
    pub fn dispose(&mut self) {
        self.disconnect();
        if !self.reap_exited() {
            return;
        }
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        let reaper = thread::Builder::new()
            .name("ydotoold-reaper".into())
            .spawn(move || child.wait());
        match reaper {
            Ok(_) => log::debug!(target: self.log.target(), "leaving daemon pid {} running", pid),
            Err(e) => log::warn!(target: self.log.target(), "cannot watch daemon pid {}: {}", pid, e),
        }
    }

    fn send_now(&mut self, command: Command) {
        if !self.is_connected() {
            log::debug!(target: self.log.target(), "not connected, dropping '{}'", command);
            return;
        }
        let _ = self.write(&command);
    }

    fn write(&mut self, command: &Command) -> io::Result<()> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };
        let bytes = command.encode(self.config.protocol);
        match socket.write_all(&bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!(target: self.log.target(), "failed to send '{}': {}", command, e);
                if matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe
                        | io::ErrorKind::ConnectionReset
                        | io::ErrorKind::NotConnected
                ) {
                    self.socket = None;
                    self.queue.clear();
                    self.state = ConnectionState::Disconnected;
                    // the daemon may have died with the socket
                    self.reap_exited();
                }
                Err(e)
            }
        }
    }
}

impl Drop for DaemonClient {
    fn drop(&mut self) {
        self.dispose();
    }
}
