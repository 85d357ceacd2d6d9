//! Configuration for both output backends.
//!
//! Every value has a default matching the stock ydotool/uinput setup, so
//! `Config::default()` works out of the box. With the `serde` feature the
//! whole tree can be loaded from and saved to JSON; missing fields keep
//! their defaults.

use crate::keycode::CharMapMode;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "serde")]
use crate::error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::path::Path;

/// `BUS_USB` from the kernel input headers.
pub const BUS_USB: u16 = 0x03;

/// Default uinput control node.
pub const DEFAULT_UINPUT_PATH: &str = "/dev/uinput";
/// Default relay daemon binary.
pub const DEFAULT_DAEMON_PATH: &str = "/usr/bin/ydotoold";
/// Default relay socket.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/.ydotool_socket";

/// Identity record a virtual device registers with.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceIdentity {
    /// Device name shown by the kernel; truncated to 79 bytes.
    pub name: String,
    /// Bus type (`BUS_USB` by default).
    pub bus_type: u16,
    /// Vendor id.
    pub vendor: u16,
    /// Product id.
    pub product: u16,
    /// Version number.
    pub version: u16,
}

impl DeviceIdentity {
    /// Identity with the given name and default ids.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set vendor and product ids.
    pub fn with_ids(mut self, vendor: u16, product: u16) -> Self {
        self.vendor = vendor;
        self.product = product;
        self
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            name: "inputsynth device".into(),
            bus_type: BUS_USB,
            vendor: 0x0001,
            product: 0x0001,
            version: 0x0100,
        }
    }
}

/// Range declared for absolute pointer axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AbsoluteRange {
    /// Minimum axis value.
    pub min: i32,
    /// Maximum axis value.
    pub max: i32,
}

impl Default for AbsoluteRange {
    fn default() -> Self {
        Self { min: 0, max: 65535 }
    }
}

/// Settings for the uinput backend.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UinputConfig {
    /// Path to the uinput control node.
    pub control_path: PathBuf,
    /// Keyboard identity.
    pub keyboard: DeviceIdentity,
    /// Mouse identity.
    pub mouse: DeviceIdentity,
    /// Declare absolute pointer axes with this range.
    pub absolute: Option<AbsoluteRange>,
}

impl UinputConfig {
    /// Enable absolute pointer positioning.
    pub fn with_absolute(mut self, range: AbsoluteRange) -> Self {
        self.absolute = Some(range);
        self
    }
}

impl Default for UinputConfig {
    fn default() -> Self {
        Self {
            control_path: PathBuf::from(DEFAULT_UINPUT_PATH),
            keyboard: DeviceIdentity::new("inputsynth keyboard"),
            mouse: DeviceIdentity::new("inputsynth mouse"),
            absolute: None,
        }
    }
}

/// Blocking delays used by press and click sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timing {
    /// Hold time between key down and key up.
    pub key_press_ms: u64,
    /// Hold time between button down and button up.
    pub click_ms: u64,
    /// Hold time per character when typing text.
    pub type_char_ms: u64,
}

impl Timing {
    /// Key press hold time.
    pub fn key_press(&self) -> Duration {
        Duration::from_millis(self.key_press_ms)
    }

    /// Click hold time.
    pub fn click(&self) -> Duration {
        Duration::from_millis(self.click_ms)
    }

    /// Per-character hold time for text.
    pub fn type_char(&self) -> Duration {
        Duration::from_millis(self.type_char_ms)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            key_press_ms: 10,
            click_ms: 50,
            type_char_ms: 30,
        }
    }
}

/// Wire format spoken to the relay daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DaemonProtocol {
    /// ASCII commands such as `key 30:1 30:0`.
    #[default]
    Text,
    /// 24-byte raw event records.
    Binary,
}

/// Owner (uid:gid) the daemon assigns to its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SocketOwner {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

impl Default for SocketOwner {
    fn default() -> Self {
        Self {
            uid: 1000,
            gid: 1000,
        }
    }
}

/// Settings for the relay daemon backend.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DaemonConfig {
    /// Daemon binary to launch.
    pub daemon_path: PathBuf,
    /// Socket the daemon listens on.
    pub socket_path: PathBuf,
    /// Launch the daemon; when false, only attach to an existing socket.
    pub spawn: bool,
    /// Kill running daemon instances before launching a new one.
    pub terminate_existing: bool,
    /// Give up connecting after this long.
    pub connect_timeout_ms: u64,
    /// First retry delay.
    pub initial_backoff_ms: u64,
    /// Retry delay ceiling.
    pub max_backoff_ms: u64,
    /// Socket owner used when `SUDO_UID`/`SUDO_GID` are unset.
    pub default_owner: SocketOwner,
    /// Wire format.
    pub protocol: DaemonProtocol,
}

impl DaemonConfig {
    /// Attach to an already running daemon at `socket_path`.
    pub fn attach(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            spawn: false,
            terminate_existing: false,
            ..Self::default()
        }
    }

    /// Use the given wire format.
    pub fn with_protocol(mut self, protocol: DaemonProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// First retry delay.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Retry delay ceiling.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            daemon_path: PathBuf::from(DEFAULT_DAEMON_PATH),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            spawn: true,
            terminate_existing: true,
            connect_timeout_ms: 2000,
            initial_backoff_ms: 20,
            max_backoff_ms: 250,
            default_owner: SocketOwner::default(),
            protocol: DaemonProtocol::Text,
        }
    }
}

/// Full configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// uinput backend settings.
    pub uinput: UinputConfig,
    /// Relay daemon backend settings.
    pub daemon: DaemonConfig,
    /// Press/click delays.
    pub timing: Timing,
    /// Character translation used by `type_text`.
    pub char_map: CharMapMode,
}

#[cfg(feature = "serde")]
impl Config {
    /// Load a configuration file (JSON format).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save the configuration (JSON format).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))
    }
}
