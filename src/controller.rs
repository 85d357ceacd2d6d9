//! Host-facing facade.
//!
//! A [`Controller`] wraps one [`OutputBackend`] and gates every action on
//! the connection: while disconnected or after [`dispose`](Controller::dispose)
//! all calls return immediately without emitting anything.
//!
//! # Example
//!
//! ```no_run
//! use inputsynth::{Config, KeyCode, MouseButton, UinputController};
//!
//! let mut controller = UinputController::uinput(&Config::default(), Default::default());
//! controller.connect()?;
//! controller.key_press(KeyCode::KEY_A.code());
//! controller.move_relative(10, -5);
//! controller.click(MouseButton::Left.code());
//! controller.type_text("hello, world\n");
//! controller.dispose();
//! # Ok::<(), inputsynth::Error>(())
//! ```

use crate::config::Config;
use crate::context::LogContext;
use crate::error::{Error, Result};
use crate::keycode::{CharMapMode, KeyCode, MouseButton, char_to_key};
use crate::platform::linux::uinput::UinputBackend;
use crate::platform::linux::ydotool::DaemonClient;
use std::collections::BTreeMap;

/// Something that can deliver input actions.
pub trait OutputBackend {
    /// Acquire the output resource. Calling it while connected is a no-op.
    fn connect(&mut self) -> Result<()>;

    /// Release the output resource.
    fn disconnect(&mut self);

    /// Whether actions are currently delivered.
    fn is_connected(&self) -> bool;

    /// Press a key.
    fn key_down(&mut self, code: u16);

    /// Release a key.
    fn key_up(&mut self, code: u16);

    /// Press and release a key.
    fn key_press(&mut self, code: u16);

    /// Press and release a key as part of typed text.
    fn type_key(&mut self, code: u16) {
        self.key_press(code);
    }

    /// Move the pointer.
    fn move_relative(&mut self, dx: i32, dy: i32);

    /// Turn the wheels.
    fn scroll(&mut self, dx: i32, dy: i32);

    /// Press a pointer button.
    fn button_down(&mut self, code: u16);

    /// Release a pointer button.
    fn button_up(&mut self, code: u16);

    /// Press and release a pointer button.
    fn click(&mut self, code: u16);

    /// Transmit buffered actions. Returns how many were transmitted.
    fn flush(&mut self) -> usize {
        0
    }

    /// Release everything the backend holds.
    fn dispose(&mut self) {
        self.disconnect();
    }
}

/// Facade over an output backend.
pub struct Controller<B: OutputBackend> {
    backend: B,
    char_map: CharMapMode,
    disposed: bool,
    log: LogContext,
}

/// Controller creating its own virtual devices.
pub type UinputController = Controller<UinputBackend>;

/// Controller relaying through `ydotoold`.
pub type DaemonController = Controller<DaemonClient>;

impl Controller<UinputBackend> {
    /// Controller backed by uinput devices.
    pub fn uinput(config: &Config, log: LogContext) -> Self {
        let backend = UinputBackend::new(config, log.child("uinput"));
        Self::new(backend, config.char_map, log)
    }
}

impl Controller<DaemonClient> {
    /// Controller backed by the relay daemon.
    pub fn daemon(config: &Config, log: LogContext) -> Self {
        let backend = DaemonClient::new(config.daemon.clone(), log.child("ydotool"));
        Self::new(backend, config.char_map, log)
    }
}

impl<B: OutputBackend> Controller<B> {
    /// Wrap a backend.
    pub fn new(backend: B, char_map: CharMapMode, log: LogContext) -> Self {
        Self {
            backend,
            char_map,
            disposed: false,
            log,
        }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The wrapped backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Connect the backend.
    pub fn connect(&mut self) -> Result<()> {
        if self.disposed {
            return Err(Error::InvalidState("controller has been disposed".into()));
        }
        if self.backend.is_connected() {
            return Ok(());
        }
        self.backend.connect()
    }

    /// Disconnect the backend. Later actions are ignored until reconnected.
    pub fn disconnect(&mut self) {
        self.backend.disconnect();
    }

    /// Whether actions are currently delivered.
    pub fn is_connected(&self) -> bool {
        !self.disposed && self.backend.is_connected()
    }

    /// Press a key. Ignored while disconnected.
    pub fn key_down(&mut self, code: u16) {
        if self.is_connected() {
            self.backend.key_down(code);
        }
    }

    /// Release a key.
    pub fn key_up(&mut self, code: u16) {
        if self.is_connected() {
            self.backend.key_up(code);
        }
    }

    /// Press and release a key.
    pub fn key_press(&mut self, code: u16) {
        if self.is_connected() {
            self.backend.key_press(code);
        }
    }

    /// Type a string. Characters without a key are skipped.
    ///
    /// Returns the number of characters typed.
    pub fn type_text(&mut self, text: &str) -> usize {
        if !self.is_connected() {
            return 0;
        }
        let mut typed = 0;
        for c in text.chars() {
            match char_to_key(c, self.char_map) {
                Some(key) => {
                    self.backend.type_key(key.code());
                    typed += 1;
                }
                None => log::trace!(target: self.log.target(), "skipping {:?}", c),
            }
        }
        typed
    }

    /// Move the pointer by `dx`, `dy`.
    pub fn move_relative(&mut self, dx: i32, dy: i32) {
        if self.is_connected() {
            self.backend.move_relative(dx, dy);
        }
    }

    /// Turn the horizontal and vertical wheels.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        if self.is_connected() {
            self.backend.scroll(dx, dy);
        }
    }

    /// Press a pointer button.
    pub fn button_down(&mut self, code: u16) {
        if self.is_connected() {
            self.backend.button_down(code);
        }
    }

    /// Release a pointer button.
    pub fn button_up(&mut self, code: u16) {
        if self.is_connected() {
            self.backend.button_up(code);
        }
    }

    /// Press and release a pointer button.
    pub fn click(&mut self, code: u16) {
        if self.is_connected() {
            self.backend.click(code);
        }
    }

    /// Transmit buffered actions. Returns how many were transmitted.
    pub fn flush(&mut self) -> usize {
        if self.is_connected() {
            self.backend.flush()
        } else {
            0
        }
    }

    /// Name→code table of every supported key.
    pub fn list_key_codes(&self) -> BTreeMap<&'static str, u16> {
        KeyCode::table()
    }

    /// Name→code table of every supported pointer button.
    pub fn list_button_codes(&self) -> BTreeMap<&'static str, u16> {
        MouseButton::table()
    }

    /// Release the backend for good. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.backend.dispose();
        log::debug!(target: self.log.target(), "controller disposed");
    }
}

impl<B: OutputBackend> Drop for Controller<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;
    use crate::platform::linux::uinput::testing::FakeControl;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        log: Vec<String>,
        connects: usize,
        disposes: usize,
    }

    struct RecordingBackend {
        connected: bool,
        fail_connect: bool,
        calls: Rc<RefCell<Calls>>,
    }

    impl RecordingBackend {
        fn new() -> (Self, Rc<RefCell<Calls>>) {
            let calls = Rc::new(RefCell::new(Calls::default()));
            let backend = Self {
                connected: false,
                fail_connect: false,
                calls: calls.clone(),
            };
            (backend, calls)
        }

        fn record(&self, call: String) {
            self.calls.borrow_mut().log.push(call);
        }
    }

    impl OutputBackend for RecordingBackend {
        fn connect(&mut self) -> Result<()> {
            self.calls.borrow_mut().connects += 1;
            if self.fail_connect {
                return Err(crate::error::ConnectionError::AlreadyFailed.into());
            }
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn key_down(&mut self, code: u16) {
            self.record(format!("down {code}"));
        }

        fn key_up(&mut self, code: u16) {
            self.record(format!("up {code}"));
        }

        fn key_press(&mut self, code: u16) {
            self.record(format!("press {code}"));
        }

        fn move_relative(&mut self, dx: i32, dy: i32) {
            self.record(format!("move {dx} {dy}"));
        }

        fn scroll(&mut self, dx: i32, dy: i32) {
            self.record(format!("scroll {dx} {dy}"));
        }

        fn button_down(&mut self, code: u16) {
            self.record(format!("bdown {code}"));
        }

        fn button_up(&mut self, code: u16) {
            self.record(format!("bup {code}"));
        }

        fn click(&mut self, code: u16) {
            self.record(format!("click {code}"));
        }

        fn flush(&mut self) -> usize {
            self.record("flush".into());
            1
        }

        fn dispose(&mut self) {
            self.calls.borrow_mut().disposes += 1;
            self.disconnect();
        }
    }

    fn controller() -> (Controller<RecordingBackend>, Rc<RefCell<Calls>>) {
        let (backend, calls) = RecordingBackend::new();
        (
            Controller::new(backend, CharMapMode::Standard, LogContext::default()),
            calls,
        )
    }

    fn exercise<B: OutputBackend>(c: &mut Controller<B>) {
        c.key_down(30);
        c.key_up(30);
        c.key_press(31);
        c.move_relative(3, -2);
        c.scroll(0, 1);
        c.button_down(0x110);
        c.button_up(0x110);
        c.click(0x111);
        c.type_text("ab");
        c.flush();
    }

    #[test]
    fn test_actions_reach_backend_when_connected() {
        let (mut c, calls) = controller();
        c.connect().unwrap();
        exercise(&mut c);
        assert_eq!(
            calls.borrow().log,
            vec![
                "down 30", "up 30", "press 31", "move 3 -2", "scroll 0 1", "bdown 272", "bup 272",
                "click 273", "press 30", "press 48", "flush",
            ]
        );
    }

    #[test]
    fn test_actions_ignored_before_connect() {
        let (mut c, calls) = controller();
        exercise(&mut c);
        assert_eq!(c.flush(), 0);
        assert!(calls.borrow().log.is_empty());
    }

    #[test]
    fn test_actions_ignored_after_disconnect() {
        let (mut c, calls) = controller();
        c.connect().unwrap();
        c.disconnect();
        exercise(&mut c);
        assert!(calls.borrow().log.is_empty());
    }

    #[test]
    fn test_connect_when_connected_is_noop() {
        let (mut c, calls) = controller();
        c.connect().unwrap();
        c.connect().unwrap();
        assert_eq!(calls.borrow().connects, 1);
    }

    #[test]
    fn test_connect_failure_propagates() {
        let (mut backend, _) = RecordingBackend::new();
        backend.fail_connect = true;
        let mut c = Controller::new(backend, CharMapMode::Standard, LogContext::default());
        assert!(matches!(c.connect(), Err(Error::Connection(_))));
        assert!(!c.is_connected());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut c, calls) = controller();
        c.connect().unwrap();
        c.dispose();
        c.dispose();
        exercise(&mut c);
        assert!(matches!(c.connect(), Err(Error::InvalidState(_))));
        drop(c);

        let calls = calls.borrow();
        assert_eq!(calls.disposes, 1);
        assert!(calls.log.is_empty());
    }

    #[test]
    fn test_drop_disposes() {
        let (c, calls) = controller();
        drop(c);
        assert_eq!(calls.borrow().disposes, 1);
    }

    #[test]
    fn test_type_text_skips_unmapped() {
        let (mut c, calls) = controller();
        c.connect().unwrap();
        assert_eq!(c.type_text("A!a"), 2);
        assert_eq!(calls.borrow().log, vec!["press 30", "press 30"]);
    }

    #[test]
    fn test_code_tables() {
        let (c, _) = controller();
        let keys = c.list_key_codes();
        assert_eq!(keys.get("KEY_A"), Some(&30));
        assert_eq!(keys.len(), KeyCode::all().count());
        let buttons = c.list_button_codes();
        assert_eq!(buttons.len(), 3);
        assert_eq!(buttons.get("LEFT"), Some(&0x110));
    }

    #[test]
    fn test_uinput_controller_end_to_end() {
        let (_, rec) = FakeControl::new();
        let shared = rec.clone();
        let config = Config {
            timing: crate::config::Timing {
                key_press_ms: 0,
                click_ms: 0,
                type_char_ms: 0,
            },
            ..Config::default()
        };
        let backend = UinputBackend::with_opener(
            &config,
            Box::new(move |_| Ok(FakeControl::sharing(&shared))),
            LogContext::default(),
        );
        let mut c = Controller::new(backend, config.char_map, LogContext::default());
        c.connect().unwrap();
        c.type_text("a");
        assert_eq!(
            rec.events(),
            vec![
                RawEvent::key(30, true),
                RawEvent::syn(),
                RawEvent::key(30, false),
                RawEvent::syn(),
            ]
        );

        rec.clear();
        c.disconnect();
        exercise(&mut c);
        assert!(rec.events().is_empty());
        assert_eq!(rec.destroyed(), 2);

        c.dispose();
        c.dispose();
        assert_eq!(rec.destroyed(), 2);
    }

    #[test]
    fn test_uinput_controller_uses_configured_char_map() {
        let (_, rec) = FakeControl::new();
        let shared = rec.clone();
        let config = Config {
            timing: crate::config::Timing {
                key_press_ms: 0,
                click_ms: 0,
                type_char_ms: 0,
            },
            char_map: CharMapMode::Legacy,
            ..Config::default()
        };
        let backend = UinputBackend::with_opener(
            &config,
            Box::new(move |_| Ok(FakeControl::sharing(&shared))),
            LogContext::default(),
        );
        let mut c = Controller::new(backend, config.char_map, LogContext::default());
        c.connect().unwrap();
        assert_eq!(c.type_text("0"), 1);
        assert_eq!(rec.events()[0], RawEvent::key(2, true));
    }
}
