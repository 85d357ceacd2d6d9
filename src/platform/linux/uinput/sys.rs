//! uinput ioctl surface.
//!
//! Request codes and `#[repr(C)]` records mirror `<linux/uinput.h>` and
//! `<linux/input.h>`. [`DeviceControl`] abstracts the handful of calls a
//! virtual device needs so the state machine above it can run against a
//! fake in tests.

use crate::config::DeviceIdentity;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// Maximum device name length including the trailing NUL.
pub const UINPUT_MAX_NAME_SIZE: usize = 80;

const UI_DEV_CREATE: libc::c_ulong = 0x5501;
const UI_DEV_DESTROY: libc::c_ulong = 0x5502;
const UI_DEV_SETUP: libc::c_ulong = 0x405C5503;
const UI_ABS_SETUP: libc::c_ulong = 0x401C5504;
const UI_SET_EVBIT: libc::c_ulong = 0x40045564;
const UI_SET_KEYBIT: libc::c_ulong = 0x40045565;
const UI_SET_RELBIT: libc::c_ulong = 0x40045566;
const UI_SET_ABSBIT: libc::c_ulong = 0x40045567;

/// `struct input_id`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// `struct uinput_setup`
#[repr(C)]
#[derive(Debug, Clone)]
pub struct UinputSetup {
    pub id: InputId,
    pub name: [u8; UINPUT_MAX_NAME_SIZE],
    pub ff_effects_max: u32,
}

impl UinputSetup {
    /// Build the setup record for an identity. The name is truncated so a
    /// NUL terminator always fits.
    pub fn from_identity(identity: &DeviceIdentity) -> Self {
        let mut name = [0u8; UINPUT_MAX_NAME_SIZE];
        let bytes = identity.name.as_bytes();
        let len = bytes.len().min(UINPUT_MAX_NAME_SIZE - 1);
        name[..len].copy_from_slice(&bytes[..len]);

        Self {
            id: InputId {
                bustype: identity.bus_type,
                vendor: identity.vendor,
                product: identity.product,
                version: identity.version,
            },
            name,
            ff_effects_max: 0,
        }
    }
}

/// `struct input_absinfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

impl AbsInfo {
    /// Axis spanning `minimum..=maximum` with unit resolution.
    pub fn range(minimum: i32, maximum: i32) -> Self {
        Self {
            minimum,
            maximum,
            resolution: 1,
            ..Self::default()
        }
    }
}

/// `struct uinput_abs_setup`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct UinputAbsSetup {
    code: u16,
    absinfo: AbsInfo,
}

/// Which capability bitmap a `UI_SET_*BIT` request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitKind {
    /// `UI_SET_EVBIT`
    Event,
    /// `UI_SET_KEYBIT`
    Key,
    /// `UI_SET_RELBIT`
    Relative,
    /// `UI_SET_ABSBIT`
    Absolute,
}

impl BitKind {
    fn request(self) -> libc::c_ulong {
        match self {
            BitKind::Event => UI_SET_EVBIT,
            BitKind::Key => UI_SET_KEYBIT,
            BitKind::Relative => UI_SET_RELBIT,
            BitKind::Absolute => UI_SET_ABSBIT,
        }
    }
}

/// Kernel calls a virtual device is built from.
pub trait DeviceControl {
    /// Declare one capability bit.
    fn set_bit(&mut self, kind: BitKind, code: u16) -> io::Result<()>;

    /// Declare the range of an absolute axis.
    fn setup_absolute(&mut self, code: u16, info: AbsInfo) -> io::Result<()>;

    /// Phase one of registration: hand over the identity record.
    fn setup_device(&mut self, identity: &DeviceIdentity) -> io::Result<()>;

    /// Phase two of registration: create the device node.
    fn create(&mut self) -> io::Result<()>;

    /// Remove the device node.
    fn destroy(&mut self) -> io::Result<()>;

    /// Write encoded event records in a single call.
    fn write_records(&mut self, records: &[u8]) -> io::Result<()>;
}

/// An open handle on the uinput control node.
#[derive(Debug)]
pub struct UinputControl {
    file: File,
}

impl UinputControl {
    /// Open the control node write-only and non-blocking.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        Ok(Self { file })
    }

    fn check(ret: libc::c_int) -> io::Result<()> {
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl DeviceControl for UinputControl {
    fn set_bit(&mut self, kind: BitKind, code: u16) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: fd is an open uinput handle; SET_*BIT takes an int by value.
        Self::check(unsafe { libc::ioctl(fd, kind.request() as _, code as libc::c_int) })
    }

    fn setup_absolute(&mut self, code: u16, info: AbsInfo) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        let setup = UinputAbsSetup {
            code,
            absinfo: info,
        };
        // SAFETY: setup is a live repr(C) uinput_abs_setup for the duration of the call.
        Self::check(unsafe { libc::ioctl(fd, UI_ABS_SETUP as _, &setup as *const UinputAbsSetup) })
    }

    fn setup_device(&mut self, identity: &DeviceIdentity) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        let setup = UinputSetup::from_identity(identity);
        // SAFETY: setup is a live repr(C) uinput_setup for the duration of the call.
        Self::check(unsafe { libc::ioctl(fd, UI_DEV_SETUP as _, &setup as *const UinputSetup) })
    }

    fn create(&mut self) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: UI_DEV_CREATE takes no argument.
        Self::check(unsafe { libc::ioctl(fd, UI_DEV_CREATE as _) })
    }

    fn destroy(&mut self) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: UI_DEV_DESTROY takes no argument.
        Self::check(unsafe { libc::ioctl(fd, UI_DEV_DESTROY as _) })
    }

    fn write_records(&mut self, records: &[u8]) -> io::Result<()> {
        let written = self.file.write(records)?;
        if written != records.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", written, records.len()),
            ));
        }
        Ok(())
    }
}
