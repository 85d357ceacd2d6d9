//! Semantic input actions.
//!
//! Actions are what a host asks for ("press key 30", "move by 3,-2").
//! Backends translate them into raw events or relay commands.

use crate::event::{REL_HWHEEL, REL_WHEEL, REL_X, REL_Y, RawEvent};

/// Key or button state carried by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Released (value 0).
    Up,
    /// Pressed (value 1).
    Down,
}

impl KeyState {
    /// The kernel event value.
    #[inline]
    pub const fn value(self) -> i32 {
        match self {
            KeyState::Up => 0,
            KeyState::Down => 1,
        }
    }

    /// Convert from a pressed flag.
    #[inline]
    pub const fn from_pressed(pressed: bool) -> Self {
        if pressed { KeyState::Down } else { KeyState::Up }
    }
}

/// A single semantic input action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keyboard key transition.
    Key {
        /// Kernel keycode.
        code: u16,
        /// New state.
        state: KeyState,
    },
    /// Pointer button transition.
    Button {
        /// Kernel button code.
        code: u16,
        /// New state.
        state: KeyState,
    },
    /// Relative pointer motion.
    Move {
        /// Horizontal delta.
        dx: i32,
        /// Vertical delta.
        dy: i32,
    },
    /// Wheel motion.
    Scroll {
        /// Horizontal wheel delta.
        dx: i32,
        /// Vertical wheel delta.
        dy: i32,
    },
}

impl Action {
    /// Translate into raw events, terminated by a `SYN_REPORT` barrier.
    pub fn to_raw_events(&self) -> Vec<RawEvent> {
        let mut events = match *self {
            Action::Key { code, state } | Action::Button { code, state } => {
                vec![RawEvent::key(code, state == KeyState::Down)]
            }
            Action::Move { dx, dy } => {
                vec![RawEvent::relative(REL_X, dx), RawEvent::relative(REL_Y, dy)]
            }
            Action::Scroll { dx, dy } => vec![
                RawEvent::relative(REL_WHEEL, dy),
                RawEvent::relative(REL_HWHEEL, dx),
            ],
        };
        events.push(RawEvent::syn());
        events
    }
}
