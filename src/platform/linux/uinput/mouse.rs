//! Virtual mouse.
//!
//! Relative motion, wheel and the three standard buttons are always declared.
//! Absolute positioning is only available when an [`AbsoluteRange`] was given
//! at construction, since the kernel needs the axis range before the device
//! is created.

use super::device::{Capabilities, VirtualDevice};
use super::sys::{AbsInfo, DeviceControl, UinputControl};
use crate::action::{Action, KeyState};
use crate::config::{AbsoluteRange, DeviceIdentity, Timing, UinputConfig};
use crate::context::LogContext;
use crate::error::{Error, Result};
use crate::event::{ABS_X, ABS_Y, REL_HWHEEL, REL_WHEEL, REL_X, REL_Y, RawEvent};
use crate::keycode::MouseButton;
use std::thread;
use std::time::Duration;

/// Capabilities of the virtual mouse.
pub fn capabilities(absolute: Option<AbsoluteRange>) -> Capabilities {
    let caps = Capabilities::new()
        .with_keys(MouseButton::ALL.map(MouseButton::code))
        .with_relative([REL_X, REL_Y, REL_WHEEL, REL_HWHEEL]);

    match absolute {
        Some(range) => {
            let info = AbsInfo::range(range.min, range.max);
            caps.with_absolute(ABS_X, info).with_absolute(ABS_Y, info)
        }
        None => caps,
    }
}

/// A virtual mouse registered with the kernel.
pub struct VirtualMouse<C: DeviceControl = UinputControl> {
    device: VirtualDevice<C>,
    timing: Timing,
}

impl VirtualMouse<UinputControl> {
    /// Open the control node and register a mouse.
    pub fn open(config: &UinputConfig, timing: Timing, log: LogContext) -> Result<Self> {
        let device = VirtualDevice::open(&config.control_path, log)?;
        Self::from_device(device, &config.mouse, config.absolute, timing)
    }
}

impl<C: DeviceControl> VirtualMouse<C> {
    /// Register a mouse on an already opened handle.
    pub fn with_control(
        control: C,
        identity: &DeviceIdentity,
        absolute: Option<AbsoluteRange>,
        timing: Timing,
        log: LogContext,
    ) -> Result<Self> {
        let device = VirtualDevice::with_control(control, log);
        Self::from_device(device, identity, absolute, timing)
    }

    fn from_device(
        mut device: VirtualDevice<C>,
        identity: &DeviceIdentity,
        absolute: Option<AbsoluteRange>,
        timing: Timing,
    ) -> Result<Self> {
        device.configure(&capabilities(absolute))?;
        device.register(identity)?;
        Ok(Self { device, timing })
    }

    /// The underlying device.
    pub fn device(&self) -> &VirtualDevice<C> {
        &self.device
    }

    /// Whether absolute positioning was declared.
    pub fn supports_absolute(&self) -> bool {
        self.device.capabilities().has_absolute(ABS_X)
    }

    /// Move the pointer by `(dx, dy)`.
    pub fn move_relative(&mut self, dx: i32, dy: i32) {
        self.device.submit(&Action::Move { dx, dy }.to_raw_events());
    }

    /// Move the pointer to `(x, y)` in the declared absolute range.
    pub fn move_absolute(&mut self, x: i32, y: i32) -> Result<()> {
        if !self.supports_absolute() {
            return Err(Error::InvalidState(
                "absolute positioning was not declared for this mouse".into(),
            ));
        }
        self.device.submit(&[
            RawEvent::absolute(ABS_X, x),
            RawEvent::absolute(ABS_Y, y),
            RawEvent::syn(),
        ]);
        Ok(())
    }

    /// Turn the wheels: `dy` vertical, `dx` horizontal.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        self.device.submit(&Action::Scroll { dx, dy }.to_raw_events());
    }

    /// Press a button.
    pub fn button_down(&mut self, code: u16) {
        self.transition(code, KeyState::Down);
    }

    /// Release a button.
    pub fn button_up(&mut self, code: u16) {
        self.transition(code, KeyState::Up);
    }

    /// Press, hold for the configured delay, release.
    pub fn click(&mut self, code: u16) {
        self.click_with_delay(code, self.timing.click());
    }

    /// Press, hold for `delay`, release. Blocks the calling thread.
    pub fn click_with_delay(&mut self, code: u16, delay: Duration) {
        self.button_down(code);
        thread::sleep(delay);
        self.button_up(code);
    }

    /// Destroy the device. Idempotent.
    pub fn teardown(&mut self) {
        self.device.teardown();
    }

    fn transition(&mut self, code: u16, state: KeyState) {
        self.device
            .submit(&Action::Button { code, state }.to_raw_events());
    }
}
