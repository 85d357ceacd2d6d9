//! Generic virtual device lifecycle.
//!
//! A [`VirtualDevice`] owns exactly one control handle and walks it through
//! `Opened → Configured → Registered → Destroyed`. Device kinds differ only in
//! the [`Capabilities`] they declare and in how they translate semantic
//! actions into raw events; the lifecycle itself lives here.

use super::sys::{AbsInfo, BitKind, DeviceControl, UinputControl};
use crate::config::DeviceIdentity;
use crate::context::LogContext;
use crate::error::{Error, Result};
use crate::event::{EventKind, RawEvent, encode_batch};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Event types and codes a device is allowed to emit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    keys: BTreeSet<u16>,
    relative: BTreeSet<u16>,
    absolute: BTreeMap<u16, AbsInfo>,
}

impl Capabilities {
    /// Empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add key or button codes.
    pub fn with_keys(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.keys.extend(codes);
        self
    }

    /// Add relative axes.
    pub fn with_relative(mut self, axes: impl IntoIterator<Item = u16>) -> Self {
        self.relative.extend(axes);
        self
    }

    /// Add an absolute axis and its range.
    pub fn with_absolute(mut self, axis: u16, info: AbsInfo) -> Self {
        self.absolute.insert(axis, info);
        self
    }

    /// Event types implied by the declared codes. `EV_SYN` is always present.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        let mut kinds = vec![EventKind::Syn];
        if !self.keys.is_empty() {
            kinds.push(EventKind::Key);
        }
        if !self.relative.is_empty() {
            kinds.push(EventKind::Rel);
        }
        if !self.absolute.is_empty() {
            kinds.push(EventKind::Abs);
        }
        kinds
    }

    /// Whether `event` may be emitted by a device with these capabilities.
    pub fn allows(&self, event: &RawEvent) -> bool {
        match event.kind {
            EventKind::Syn => true,
            EventKind::Key => self.keys.contains(&event.code),
            EventKind::Rel => self.relative.contains(&event.code),
            EventKind::Abs => self.absolute.contains_key(&event.code),
        }
    }

    /// Whether an absolute axis is declared.
    pub fn has_absolute(&self, axis: u16) -> bool {
        self.absolute.contains_key(&axis)
    }

    /// Number of declared key codes.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

/// Lifecycle state of a [`VirtualDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// Handle open, nothing declared yet.
    Opened,
    /// Capabilities declared, not yet registered.
    Configured,
    /// Device node exists; events may be emitted.
    Registered,
    /// Handle released; every further call is ignored.
    Destroyed,
}

/// A kernel virtual input device.
pub struct VirtualDevice<C: DeviceControl = UinputControl> {
    control: Option<C>,
    state: DeviceState,
    declared: Capabilities,
    event_bits: Vec<EventKind>,
    name: String,
    log: LogContext,
}

impl VirtualDevice<UinputControl> {
    /// Open the uinput control node at `path`.
    ///
    /// Fails with [`Error::ResourceUnavailable`] if the node is missing or not writable.
    pub fn open(path: impl AsRef<Path>, log: LogContext) -> Result<Self> {
        let path = path.as_ref();
        let control = UinputControl::open(path).map_err(|source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(target: log.target(), "opened {}", path.display());
        Ok(Self::with_control(control, log))
    }
}

impl<C: DeviceControl> VirtualDevice<C> {
    /// Wrap an already opened control handle.
    pub fn with_control(control: C, log: LogContext) -> Self {
        Self {
            control: Some(control),
            state: DeviceState::Opened,
            declared: Capabilities::default(),
            event_bits: Vec::new(),
            name: String::new(),
            log,
        }
    }

    /// Configure and register in one step.
    ///
    /// On failure the handle has already been released.
    pub fn create(
        control: C,
        capabilities: &Capabilities,
        identity: &DeviceIdentity,
        log: LogContext,
    ) -> Result<Self> {
        let mut device = Self::with_control(control, log);
        device.configure(capabilities)?;
        device.register(identity)?;
        Ok(device)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Whether events can currently be emitted.
    pub fn is_registered(&self) -> bool {
        self.state == DeviceState::Registered
    }

    /// Everything declared so far.
    pub fn capabilities(&self) -> &Capabilities {
        &self.declared
    }

    /// Declare event types and code bits.
    ///
    /// May be called repeatedly before [`register`](Self::register); codes
    /// accumulate. After registration the kernel ignores new bits, so the
    /// call is rejected with [`Error::InvalidState`]. A failing ioctl tears the
    /// device down and returns [`Error::DeviceRegistration`].
    pub fn configure(&mut self, capabilities: &Capabilities) -> Result<()> {
        match self.state {
            DeviceState::Opened | DeviceState::Configured => {}
            DeviceState::Registered => {
                return Err(Error::InvalidState(
                    "capabilities cannot be declared after registration".into(),
                ));
            }
            DeviceState::Destroyed => {
                return Err(Error::InvalidState("device has been destroyed".into()));
            }
        }

        if let Err(source) = self.declare(capabilities) {
            self.teardown();
            return Err(Error::DeviceRegistration {
                stage: "capability declaration",
                source,
            });
        }

        self.state = DeviceState::Configured;
        Ok(())
    }

    fn declare(&mut self, capabilities: &Capabilities) -> std::io::Result<()> {
        let Some(control) = self.control.as_mut() else {
            return Ok(());
        };

        for kind in capabilities.event_kinds() {
            if !self.event_bits.contains(&kind) {
                control.set_bit(BitKind::Event, kind.raw())?;
                self.event_bits.push(kind);
            }
        }
        for &code in &capabilities.keys {
            if !self.declared.keys.contains(&code) {
                control.set_bit(BitKind::Key, code)?;
                self.declared.keys.insert(code);
            }
        }
        for &axis in &capabilities.relative {
            if !self.declared.relative.contains(&axis) {
                control.set_bit(BitKind::Relative, axis)?;
                self.declared.relative.insert(axis);
            }
        }
        for (&axis, &info) in &capabilities.absolute {
            if !self.declared.absolute.contains_key(&axis) {
                control.set_bit(BitKind::Absolute, axis)?;
                control.setup_absolute(axis, info)?;
                self.declared.absolute.insert(axis, info);
            }
        }
        Ok(())
    }

    /// Two-phase registration: identity setup, then device creation.
    ///
    /// If either phase fails the handle is released before the error is
    /// returned, so no half-registered device survives.
    pub fn register(&mut self, identity: &DeviceIdentity) -> Result<()> {
        if self.state != DeviceState::Configured {
            return Err(Error::InvalidState(format!(
                "cannot register a device in state {:?}",
                self.state
            )));
        }
        let Some(control) = self.control.as_mut() else {
            return Err(Error::InvalidState("device handle is closed".into()));
        };

        let result = control
            .setup_device(identity)
            .map_err(|source| Error::DeviceRegistration {
                stage: "device setup",
                source,
            })
            .and_then(|()| {
                control.create().map_err(|source| Error::DeviceRegistration {
                    stage: "device create",
                    source,
                })
            });

        if let Err(e) = result {
            log::error!(target: self.log.target(), "failed to register '{}': {}", identity.name, e);
            self.teardown();
            return Err(e);
        }

        self.name = identity.name.clone();
        self.state = DeviceState::Registered;
        log::info!(
            target: self.log.target(),
            "created virtual device '{}' ({} keys)",
            self.name,
            self.declared.key_count()
        );
        Ok(())
    }

    /// Emit a single event, stamped with the current time.
    pub fn emit(&mut self, kind: EventKind, code: u16, value: i32) -> Result<()> {
        self.emit_batch(&[RawEvent::new(kind, code, value)])
    }

    /// Emit a `SYN_REPORT` barrier.
    pub fn syn(&mut self) -> Result<()> {
        self.emit_batch(&[RawEvent::syn()])
    }

    /// Emit a batch of events with one write.
    ///
    /// The whole batch is rejected if any event was not declared.
    pub fn emit_batch(&mut self, events: &[RawEvent]) -> Result<()> {
        if self.state != DeviceState::Registered {
            return Err(Error::InvalidState(format!(
                "cannot emit on a device in state {:?}",
                self.state
            )));
        }
        if let Some(event) = events.iter().find(|e| !self.declared.allows(e)) {
            return Err(Error::InvalidState(format!(
                "{} was not declared by '{}'",
                event, self.name
            )));
        }
        let Some(control) = self.control.as_mut() else {
            return Err(Error::InvalidState("device handle is closed".into()));
        };

        let stamped: Vec<RawEvent> = events.iter().map(|e| e.stamped()).collect();
        control
            .write_records(&encode_batch(&stamped))
            .map_err(Error::Emit)
    }

    /// Emit a batch, logging instead of returning failures.
    ///
    /// Used by the semantic layer: a failed write never stops later calls.
    pub fn submit(&mut self, events: &[RawEvent]) {
        match self.emit_batch(events) {
            Ok(()) => {}
            Err(Error::Emit(e)) => {
                log::error!(target: self.log.target(), "write to '{}' failed: {}", self.name, e);
            }
            Err(e) if self.state != DeviceState::Registered => {
                log::debug!(target: self.log.target(), "dropping events: {}", e);
            }
            Err(e) => {
                log::warn!(target: self.log.target(), "rejected events: {}", e);
            }
        }
    }

    /// Destroy the device node and close the handle.
    ///
    /// Safe to call in any state and any number of times; the destroy
    /// request is issued at most once, and only for a registered device.
    pub fn teardown(&mut self) {
        let Some(mut control) = self.control.take() else {
            self.state = DeviceState::Destroyed;
            return;
        };

        if self.state == DeviceState::Registered {
            match control.destroy() {
                Ok(()) => {
                    log::info!(target: self.log.target(), "destroyed virtual device '{}'", self.name)
                }
                Err(e) => {
                    log::warn!(target: self.log.target(), "failed to destroy '{}': {}", self.name, e)
                }
            }
        }
        drop(control);
        self.state = DeviceState::Destroyed;
    }
}

impl<C: DeviceControl> Drop for VirtualDevice<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EV_KEY, EV_REL, EV_SYN, REL_X};
    use crate::platform::linux::uinput::testing::{FailAt, FakeControl};

    fn caps() -> Capabilities {
        Capabilities::new().with_keys([30, 31]).with_relative([REL_X])
    }

    #[test]
    fn test_capabilities_allow_only_declared() {
        let caps = caps();
        assert!(caps.allows(&RawEvent::key(30, true)));
        assert!(!caps.allows(&RawEvent::key(32, true)));
        assert!(caps.allows(&RawEvent::relative(REL_X, 1)));
        assert!(!caps.allows(&RawEvent::absolute(0, 1)));
        assert!(caps.allows(&RawEvent::syn()));
        assert_eq!(
            caps.event_kinds(),
            vec![EventKind::Syn, EventKind::Key, EventKind::Rel]
        );
    }

    #[test]
    fn test_lifecycle() {
        let (control, log) = FakeControl::new();
        let mut device = VirtualDevice::with_control(control, LogContext::default());
        assert_eq!(device.state(), DeviceState::Opened);

        device.configure(&caps()).unwrap();
        assert_eq!(device.state(), DeviceState::Configured);

        device.register(&DeviceIdentity::new("test")).unwrap();
        assert_eq!(device.state(), DeviceState::Registered);

        let log = log.borrow();
        assert!(log.bits.contains(&(BitKind::Event, EV_SYN)));
        assert!(log.bits.contains(&(BitKind::Event, EV_KEY)));
        assert!(log.bits.contains(&(BitKind::Event, EV_REL)));
        assert!(log.bits.contains(&(BitKind::Key, 30)));
        assert!(log.bits.contains(&(BitKind::Relative, REL_X)));
        assert_eq!(log.identity.as_ref().unwrap().name, "test");
        assert_eq!(log.created, 1);
    }

    #[test]
    fn test_configure_accumulates_without_redeclaring() {
        let (control, log) = FakeControl::new();
        let mut device = VirtualDevice::with_control(control, LogContext::default());
        device.configure(&caps()).unwrap();
        device
            .configure(&Capabilities::new().with_keys([31, 32]))
            .unwrap();

        let log = log.borrow();
        let key_bits: Vec<u16> = log
            .bits
            .iter()
            .filter(|(kind, _)| *kind == BitKind::Key)
            .map(|&(_, code)| code)
            .collect();
        assert_eq!(key_bits, vec![30, 31, 32]);
        let ev_key = log
            .bits
            .iter()
            .filter(|&&b| b == (BitKind::Event, EV_KEY))
            .count();
        assert_eq!(ev_key, 1);
    }

    #[test]
    fn test_configure_after_register_rejected() {
        let (control, log) = FakeControl::new();
        let mut device = VirtualDevice::create(
            control,
            &caps(),
            &DeviceIdentity::default(),
            LogContext::default(),
        )
        .unwrap();
        let bits_before = log.borrow().bits.len();

        let err = device
            .configure(&Capabilities::new().with_keys([40]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(log.borrow().bits.len(), bits_before);
        assert!(device.is_registered());
    }

    #[test]
    fn test_register_requires_configuration() {
        let (control, _log) = FakeControl::new();
        let mut device = VirtualDevice::with_control(control, LogContext::default());
        let err = device.register(&DeviceIdentity::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_setup_failure_rolls_back() {
        let (control, log) = FakeControl::failing(FailAt::Setup);
        let err = VirtualDevice::create(
            control,
            &caps(),
            &DeviceIdentity::default(),
            LogContext::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            Error::DeviceRegistration {
                stage: "device setup",
                ..
            }
        ));
        let log = log.borrow();
        assert!(log.closed);
        assert_eq!(log.created, 0);
        assert_eq!(log.destroyed, 0);
    }

    #[test]
    fn test_create_failure_rolls_back() {
        let (control, log) = FakeControl::failing(FailAt::Create);
        let mut device = VirtualDevice::with_control(control, LogContext::default());
        device.configure(&caps()).unwrap();
        let err = device.register(&DeviceIdentity::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceRegistration {
                stage: "device create",
                ..
            }
        ));
        assert_eq!(device.state(), DeviceState::Destroyed);
        assert!(log.borrow().closed);

        device.submit(&[RawEvent::key(30, true), RawEvent::syn()]);
        assert!(log.borrow().events().is_empty());
    }

    #[test]
    fn test_set_bit_failure_rolls_back() {
        let (control, log) = FakeControl::failing(FailAt::SetBit);
        let mut device = VirtualDevice::with_control(control, LogContext::default());
        let err = device.configure(&caps()).unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceRegistration {
                stage: "capability declaration",
                ..
            }
        ));
        assert_eq!(device.state(), DeviceState::Destroyed);
        assert!(log.borrow().closed);
    }

    #[test]
    fn test_teardown_destroys_at_most_once() {
        let (control, log) = FakeControl::new();
        let mut device = VirtualDevice::create(
            control,
            &caps(),
            &DeviceIdentity::default(),
            LogContext::default(),
        )
        .unwrap();

        device.teardown();
        device.teardown();
        device.teardown();
        drop(device);

        let log = log.borrow();
        assert_eq!(log.destroyed, 1);
        assert!(log.closed);
    }

    #[test]
    fn test_drop_tears_down() {
        let (control, log) = FakeControl::new();
        let device = VirtualDevice::create(
            control,
            &caps(),
            &DeviceIdentity::default(),
            LogContext::default(),
        )
        .unwrap();
        drop(device);
        assert_eq!(log.borrow().destroyed, 1);
    }

    #[test]
    fn test_emit_rejects_undeclared_codes() {
        let (control, log) = FakeControl::new();
        let mut device = VirtualDevice::create(
            control,
            &caps(),
            &DeviceIdentity::default(),
            LogContext::default(),
        )
        .unwrap();

        let err = device.emit(EventKind::Key, 99, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        let err = device
            .emit_batch(&[RawEvent::key(30, true), RawEvent::key(99, true)])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(log.borrow().events().is_empty());

        device.emit(EventKind::Key, 30, 1).unwrap();
        device.syn().unwrap();
        assert_eq!(
            log.borrow().events(),
            vec![RawEvent::key(30, true), RawEvent::syn()]
        );
    }

    #[test]
    fn test_emitted_records_are_stamped() {
        let (control, log) = FakeControl::new();
        let mut device = VirtualDevice::create(
            control,
            &caps(),
            &DeviceIdentity::default(),
            LogContext::default(),
        )
        .unwrap();
        device.syn().unwrap();
        assert!(log.borrow().records[0].1.time.is_some());
    }

    #[test]
    fn test_write_failure_is_recoverable() {
        let (control, log) = FakeControl::failing(FailAt::Write);
        let mut device = VirtualDevice::create(
            control,
            &caps(),
            &DeviceIdentity::default(),
            LogContext::default(),
        )
        .unwrap();

        let err = device.emit(EventKind::Key, 30, 1).unwrap_err();
        assert!(matches!(err, Error::Emit(_)));

        device.submit(&[RawEvent::key(30, true), RawEvent::syn()]);
        assert!(device.is_registered());

        log.borrow_mut().fail = None;
        device.submit(&[RawEvent::key(30, false), RawEvent::syn()]);
        assert_eq!(
            log.borrow().events(),
            vec![RawEvent::key(30, false), RawEvent::syn()]
        );
    }

    #[test]
    fn test_open_missing_node() {
        let err = VirtualDevice::open("/nonexistent/uinput", LogContext::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::ResourceUnavailable { .. }));
    }
}
