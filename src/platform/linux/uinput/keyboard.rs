//! Virtual keyboard.

use super::device::{Capabilities, VirtualDevice};
use super::sys::{DeviceControl, UinputControl};
use crate::action::{Action, KeyState};
use crate::config::{DeviceIdentity, Timing, UinputConfig};
use crate::context::LogContext;
use crate::error::Result;
use crate::keycode::{CharMapMode, KeyCode, char_to_key};
use std::thread;
use std::time::Duration;

/// Capabilities of the virtual keyboard: every named keycode.
pub fn capabilities() -> Capabilities {
    Capabilities::new().with_keys(KeyCode::all().map(KeyCode::code))
}

/// A virtual keyboard registered with the kernel.
pub struct VirtualKeyboard<C: DeviceControl = UinputControl> {
    device: VirtualDevice<C>,
    timing: Timing,
    log: LogContext,
}

impl VirtualKeyboard<UinputControl> {
    /// Open the control node and register a keyboard.
    pub fn open(config: &UinputConfig, timing: Timing, log: LogContext) -> Result<Self> {
        let device = VirtualDevice::open(&config.control_path, log.clone())?;
        Self::from_device(device, &config.keyboard, timing, log)
    }
}

impl<C: DeviceControl> VirtualKeyboard<C> {
    /// Register a keyboard on an already opened handle.
    pub fn with_control(
        control: C,
        identity: &DeviceIdentity,
        timing: Timing,
        log: LogContext,
    ) -> Result<Self> {
        let device = VirtualDevice::with_control(control, log.clone());
        Self::from_device(device, identity, timing, log)
    }

    fn from_device(
        mut device: VirtualDevice<C>,
        identity: &DeviceIdentity,
        timing: Timing,
        log: LogContext,
    ) -> Result<Self> {
        device.configure(&capabilities())?;
        device.register(identity)?;
        Ok(Self { device, timing, log })
    }

    /// The underlying device.
    pub fn device(&self) -> &VirtualDevice<C> {
        &self.device
    }

    /// Press a key.
    pub fn key_down(&mut self, code: u16) {
        self.transition(code, KeyState::Down);
    }

    /// Release a key.
    pub fn key_up(&mut self, code: u16) {
        self.transition(code, KeyState::Up);
    }

    /// Press, hold for the configured delay, release.
    pub fn key_press(&mut self, code: u16) {
        self.key_press_with_delay(code, self.timing.key_press());
    }

    /// Press, hold for `delay`, release. Blocks the calling thread.
    pub fn key_press_with_delay(&mut self, code: u16, delay: Duration) {
        self.key_down(code);
        thread::sleep(delay);
        self.key_up(code);
    }

    /// Type one character translated with `mode`. Returns `false` if it
    /// has no mapping.
    pub fn type_char(&mut self, c: char, mode: CharMapMode) -> bool {
        match char_to_key(c, mode) {
            Some(key) => {
                self.key_press_with_delay(key.code(), self.timing.type_char());
                true
            }
            None => {
                log::trace!(target: self.log.target(), "no key for {:?}", c);
                false
            }
        }
    }

    /// Type a string, skipping characters without a mapping.
    ///
    /// Returns the number of characters typed.
    pub fn type_text(&mut self, text: &str, mode: CharMapMode) -> usize {
        text.chars().filter(|&c| self.type_char(c, mode)).count()
    }

    /// Destroy the device. Idempotent.
    pub fn teardown(&mut self) {
        self.device.teardown();
    }

    fn transition(&mut self, code: u16, state: KeyState) {
        self.device
            .submit(&Action::Key { code, state }.to_raw_events());
    }
}
