//! uinput backend.
//!
//! Creates kernel virtual devices through `/dev/uinput` and writes raw
//! events to them directly. A keyboard and a mouse are always created and
//! destroyed as one [`InputPair`].

mod device;
mod keyboard;
mod mouse;
mod sys;

pub use device::{Capabilities, DeviceState, VirtualDevice};
pub use keyboard::VirtualKeyboard;
pub use mouse::VirtualMouse;
pub use sys::{AbsInfo, BitKind, DeviceControl, UINPUT_MAX_NAME_SIZE, UinputControl};

/// Capability sets of the built-in device kinds.
pub mod capabilities {
    pub use super::keyboard::capabilities as keyboard;
    pub use super::mouse::capabilities as mouse;
}

use crate::config::{Config, Timing, UinputConfig};
use crate::context::LogContext;
use crate::controller::OutputBackend;
use crate::error::{Error, Result};
use std::io;
use std::path::Path;

/// Opens a control handle for a device node path.
pub type ControlOpener<C> = Box<dyn FnMut(&Path) -> io::Result<C>>;

/// A keyboard and a mouse created together and destroyed together.
pub struct InputPair<C: DeviceControl = UinputControl> {
    /// The keyboard half.
    pub keyboard: VirtualKeyboard<C>,
    /// The mouse half.
    pub mouse: VirtualMouse<C>,
}

impl<C: DeviceControl> InputPair<C> {
    /// Create both devices. If the mouse fails, the already registered
    /// keyboard is torn down before the error is returned.
    pub fn create(
        opener: &mut ControlOpener<C>,
        config: &UinputConfig,
        timing: Timing,
        log: &LogContext,
    ) -> Result<Self> {
        let control = open_node(opener, &config.control_path)?;
        let keyboard =
            VirtualKeyboard::with_control(control, &config.keyboard, timing, log.child("keyboard"))?;

        let control = open_node(opener, &config.control_path)?;
        let mouse = VirtualMouse::with_control(
            control,
            &config.mouse,
            config.absolute,
            timing,
            log.child("mouse"),
        )?;

        Ok(Self { keyboard, mouse })
    }

    /// Tear down both devices. Idempotent.
    pub fn teardown(&mut self) {
        self.keyboard.teardown();
        self.mouse.teardown();
    }
}

fn open_node<C>(opener: &mut ControlOpener<C>, path: &Path) -> Result<C> {
    opener(path).map_err(|source| Error::ResourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Output backend writing to kernel virtual devices.
pub struct UinputBackend<C: DeviceControl = UinputControl> {
    config: UinputConfig,
    timing: Timing,
    opener: ControlOpener<C>,
    devices: Option<InputPair<C>>,
    log: LogContext,
}

impl UinputBackend<UinputControl> {
    /// Backend opening the configured uinput node.
    pub fn new(config: &Config, log: LogContext) -> Self {
        Self::with_opener(config, Box::new(|path| UinputControl::open(path)), log)
    }
}

impl<C: DeviceControl> UinputBackend<C> {
    /// Backend using a custom handle opener.
    pub fn with_opener(config: &Config, opener: ControlOpener<C>, log: LogContext) -> Self {
        Self {
            config: config.uinput.clone(),
            timing: config.timing,
            opener,
            devices: None,
            log,
        }
    }

    /// The live devices, if connected.
    pub fn devices(&mut self) -> Option<&mut InputPair<C>> {
        self.devices.as_mut()
    }
}

impl<C: DeviceControl> OutputBackend for UinputBackend<C> {
    fn connect(&mut self) -> Result<()> {
        if self.devices.is_some() {
            return Ok(());
        }
        let pair = InputPair::create(
            &mut self.opener,
            &self.config,
            self.timing,
            &self.log,
        )?;
        log::info!(target: self.log.target(), "virtual keyboard and mouse ready");
        self.devices = Some(pair);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut pair) = self.devices.take() {
            pair.teardown();
            log::info!(target: self.log.target(), "virtual keyboard and mouse removed");
        }
    }

    fn is_connected(&self) -> bool {
        self.devices.is_some()
    }

    fn key_down(&mut self, code: u16) {
        if let Some(pair) = self.devices.as_mut() {
            pair.keyboard.key_down(code);
        }
    }

    fn key_up(&mut self, code: u16) {
        if let Some(pair) = self.devices.as_mut() {
            pair.keyboard.key_up(code);
        }
    }

    fn key_press(&mut self, code: u16) {
        if let Some(pair) = self.devices.as_mut() {
            pair.keyboard.key_press(code);
        }
    }

    fn type_key(&mut self, code: u16) {
        let delay = self.timing.type_char();
        if let Some(pair) = self.devices.as_mut() {
            pair.keyboard.key_press_with_delay(code, delay);
        }
    }

    fn move_relative(&mut self, dx: i32, dy: i32) {
        if let Some(pair) = self.devices.as_mut() {
            pair.mouse.move_relative(dx, dy);
        }
    }

    fn scroll(&mut self, dx: i32, dy: i32) {
        if let Some(pair) = self.devices.as_mut() {
            pair.mouse.scroll(dx, dy);
        }
    }

    fn button_down(&mut self, code: u16) {
        if let Some(pair) = self.devices.as_mut() {
            pair.mouse.button_down(code);
        }
    }

    fn button_up(&mut self, code: u16) {
        if let Some(pair) = self.devices.as_mut() {
            pair.mouse.button_up(code);
        }
    }

    fn click(&mut self, code: u16) {
        if let Some(pair) = self.devices.as_mut() {
            pair.mouse.click(code);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FailAt, FakeControl, Recorder};
    use super::*;
    use crate::event::RawEvent;
    use crate::keycode::{KeyCode, MouseButton};

    fn backend() -> (UinputBackend<FakeControl>, Recorder) {
        let (_, rec) = FakeControl::new();
        let shared = rec.clone();
        let backend = UinputBackend::with_opener(
            &Config::default(),
            Box::new(move |_| Ok(FakeControl::sharing(&shared))),
            LogContext::default(),
        );
        (backend, rec)
    }

    #[test]
    fn test_connect_creates_both_devices() {
        let (mut backend, rec) = backend();
        assert!(!backend.is_connected());
        backend.connect().unwrap();
        backend.connect().unwrap();
        assert!(backend.is_connected());
        assert_eq!(rec.borrow().created, 2);
    }

    #[test]
    fn test_disconnect_destroys_both_devices() {
        let (mut backend, rec) = backend();
        backend.connect().unwrap();
        backend.disconnect();
        backend.disconnect();
        assert!(!backend.is_connected());
        assert_eq!(rec.destroyed(), 2);

        backend.key_press(KeyCode::KEY_A.code());
        backend.click(MouseButton::Left.code());
        assert!(rec.events().is_empty());
    }

    #[test]
    fn test_routes_to_devices() {
        let (mut backend, rec) = backend();
        backend.connect().unwrap();
        backend.key_down(KeyCode::KEY_A.code());
        backend.move_relative(1, 2);
        assert_eq!(
            rec.events(),
            vec![
                RawEvent::key(30, true),
                RawEvent::syn(),
                RawEvent::relative(crate::event::REL_X, 1),
                RawEvent::relative(crate::event::REL_Y, 2),
                RawEvent::syn(),
            ]
        );
    }

    #[test]
    fn test_open_failure_is_resource_unavailable() {
        let mut backend = UinputBackend::<FakeControl>::with_opener(
            &Config::default(),
            Box::new(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied))),
            LogContext::default(),
        );
        let err = backend.connect().unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable { .. }));
        assert!(!backend.is_connected());
    }

    #[test]
    fn test_mouse_failure_rolls_back_keyboard() {
        let (keyboard_control, keyboard_rec) = FakeControl::new();
        let mut controls = vec![FakeControl::failing(FailAt::Create).0, keyboard_control];
        let mut opener: ControlOpener<FakeControl> =
            Box::new(move |_| controls.pop().ok_or_else(|| io::Error::from(io::ErrorKind::NotFound)));

        let result = InputPair::create(
            &mut opener,
            &UinputConfig::default(),
            Timing::default(),
            &LogContext::default(),
        );
        assert!(matches!(
            result,
            Err(Error::DeviceRegistration {
                stage: "device create",
                ..
            })
        ));
        let log = keyboard_rec.borrow();
        assert_eq!(log.created, 1);
        assert_eq!(log.destroyed, 1);
        assert!(log.closed);
    }
}
