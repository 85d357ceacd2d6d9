//! Relay daemon wire formats.
//!
//! The text format is one ASCII command per socket write, with no
//! terminator and no reply:
//!
//! ```text
//! key 30:1 30:0
//! mousemove -x 5 -y -3
//! mousemove --wheel -x 0 -y 1
//! ```
//!
//! The binary format writes the same actions as 24-byte raw event records
//! with a zero timestamp, each transition followed by `SYN_REPORT`.

use crate::action::{Action, KeyState};
use crate::config::DaemonProtocol;
use crate::event::{RawEvent, encode_batch};
use std::fmt;

/// One command written to the relay socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One or more key/button transitions.
    Key(Vec<(u16, KeyState)>),
    /// Relative pointer motion.
    Move { dx: i32, dy: i32 },
    /// Wheel motion.
    Wheel { dx: i32, dy: i32 },
}

impl Command {
    /// Down then up in a single command.
    pub fn press(code: u16) -> Self {
        Command::Key(vec![(code, KeyState::Down), (code, KeyState::Up)])
    }

    /// The actions this command performs, in order.
    pub fn actions(&self) -> Vec<Action> {
        match self {
            Command::Key(transitions) => transitions
                .iter()
                .map(|&(code, state)| Action::Key { code, state })
                .collect(),
            Command::Move { dx, dy } => vec![Action::Move { dx: *dx, dy: *dy }],
            Command::Wheel { dx, dy } => vec![Action::Scroll { dx: *dx, dy: *dy }],
        }
    }

    /// Raw event records for the binary format.
    pub fn to_records(&self) -> Vec<u8> {
        let events: Vec<RawEvent> = self
            .actions()
            .iter()
            .flat_map(Action::to_raw_events)
            .collect();
        encode_batch(&events)
    }

    /// Bytes for one socket write.
    pub fn encode(&self, protocol: DaemonProtocol) -> Vec<u8> {
        match protocol {
            DaemonProtocol::Text => self.to_string().into_bytes(),
            DaemonProtocol::Binary => self.to_records(),
        }
    }
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        match action {
            Action::Key { code, state } | Action::Button { code, state } => {
                Command::Key(vec![(code, state)])
            }
            Action::Move { dx, dy } => Command::Move { dx, dy },
            Action::Scroll { dx, dy } => Command::Wheel { dx, dy },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Key(transitions) => {
                f.write_str("key")?;
                for (code, state) in transitions {
                    write!(f, " {}:{}", code, state.value())?;
                }
                Ok(())
            }
            Command::Move { dx, dy } => write!(f, "mousemove -x {} -y {}", dx, dy),
            Command::Wheel { dx, dy } => write!(f, "mousemove --wheel -x {} -y {}", dx, dy),
        }
    }
}
