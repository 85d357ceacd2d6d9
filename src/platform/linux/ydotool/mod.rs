//! Relay daemon backend.
//!
//! Talks to a privileged `ydotoold` over its Unix socket, launching it
//! first unless configured to attach to a running instance. Useful when
//! the host process cannot open `/dev/uinput` itself.

mod client;
mod protocol;
mod spawn;

pub use client::{ConnectionState, DaemonClient};
pub use protocol::Command;
pub use spawn::{daemon_args, resolve_owner};

use crate::controller::OutputBackend;
use crate::error::Result;

impl OutputBackend for DaemonClient {
    fn connect(&mut self) -> Result<()> {
        DaemonClient::connect(self)
    }

    fn disconnect(&mut self) {
        DaemonClient::disconnect(self);
    }

    fn is_connected(&self) -> bool {
        DaemonClient::is_connected(self)
    }

    fn key_down(&mut self, code: u16) {
        DaemonClient::key_down(self, code);
    }

    fn key_up(&mut self, code: u16) {
        DaemonClient::key_up(self, code);
    }

    fn key_press(&mut self, code: u16) {
        DaemonClient::key_press(self, code);
    }

    fn move_relative(&mut self, dx: i32, dy: i32) {
        DaemonClient::move_relative(self, dx, dy);
    }

    fn scroll(&mut self, dx: i32, dy: i32) {
        DaemonClient::scroll(self, dx, dy);
    }

    fn button_down(&mut self, code: u16) {
        DaemonClient::button_down(self, code);
    }

    fn button_up(&mut self, code: u16) {
        DaemonClient::button_up(self, code);
    }

    fn click(&mut self, code: u16) {
        DaemonClient::click(self, code);
    }

    fn flush(&mut self) -> usize {
        DaemonClient::flush(self)
    }

    fn dispose(&mut self) {
        DaemonClient::dispose(self);
    }
}
