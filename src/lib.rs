//! # inputsynth
//!
//! Synthesize keyboard and mouse input on Linux.
//!
//! ## Features
//!
//! - Kernel virtual devices through `/dev/uinput`, no display server required
//! - Relay through a privileged `ydotoold` when `/dev/uinput` is not writable
//! - One facade ([`Controller`]) over both backends
//! - Full Linux keycode table with name lookups for hosts
//! - Logging through the `log` crate with per-component targets
//!
//! ## Quick Start
//!
//! ### Virtual devices
//!
//! ```no_run
//! use inputsynth::{Config, KeyCode, LogContext, MouseButton, UinputController};
//!
//! let mut controller = UinputController::uinput(&Config::default(), LogContext::default());
//! controller.connect().expect("Failed to create virtual devices");
//!
//! controller.key_press(KeyCode::LEFTMETA.code());
//! controller.move_relative(100, 50);
//! controller.click(MouseButton::Left.code());
//! controller.type_text("hello\n");
//! ```
//!
//! ### Relay daemon
//!
//! ```no_run
//! use inputsynth::{Config, DaemonController, LogContext, MouseButton};
//!
//! let mut controller = DaemonController::daemon(&Config::default(), LogContext::default());
//! controller.connect().expect("Failed to reach ydotoold");
//!
//! controller.key_press(30);
//! // Pointer actions are buffered until flushed
//! controller.move_relative(10, 0);
//! controller.click(MouseButton::Left.code());
//! controller.flush();
//! ```
//!
//! ## Architecture
//!
//! Every virtual device runs the same lifecycle ([`uinput::VirtualDevice`]):
//! open the control node, declare capabilities, register, emit, tear down.
//! Keyboard and mouse only differ in the [`uinput::Capabilities`] they
//! declare and in how they turn an [`Action`] into raw events.

pub mod action;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod event;
pub mod keycode;

mod platform;

pub use platform::{uinput, ydotool};

// Re-exports
pub use action::{Action, KeyState};
pub use config::{
    AbsoluteRange, Config, DaemonConfig, DaemonProtocol, DeviceIdentity, SocketOwner, Timing,
    UinputConfig,
};
pub use context::LogContext;
pub use controller::{Controller, DaemonController, OutputBackend, UinputController};
pub use error::{ConnectionError, Error, Result};
pub use event::{EventKind, RawEvent};
pub use keycode::{CharMapMode, KeyCode, MouseButton, char_to_key};
pub use uinput::{UinputBackend, VirtualKeyboard, VirtualMouse};
pub use ydotool::{ConnectionState, DaemonClient};
