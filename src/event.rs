//! Raw kernel input events.
//!
//! A [`RawEvent`] is the `(type, code, value, timestamp)` unit of the kernel
//! input stream. It is encoded into the fixed 24-byte `struct input_event`
//! layout used on 64-bit Linux: 16 bytes of `timeval` (seconds, then
//! microseconds, both 64-bit), then a 16-bit type, a 16-bit code and a 32-bit
//! value, all in native byte order.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size in bytes of one encoded event record.
pub const EVENT_SIZE: usize = 24;

/// Synchronization events.
pub const EV_SYN: u16 = 0x00;
/// Key and button events.
pub const EV_KEY: u16 = 0x01;
/// Relative axis events.
pub const EV_REL: u16 = 0x02;
/// Absolute axis events.
pub const EV_ABS: u16 = 0x03;

/// Marks the end of one input report.
pub const SYN_REPORT: u16 = 0x00;

/// Relative X axis.
pub const REL_X: u16 = 0x00;
/// Relative Y axis.
pub const REL_Y: u16 = 0x01;
/// Horizontal wheel.
pub const REL_HWHEEL: u16 = 0x06;
/// Vertical wheel.
pub const REL_WHEEL: u16 = 0x08;

/// Absolute X axis.
pub const ABS_X: u16 = 0x00;
/// Absolute Y axis.
pub const ABS_Y: u16 = 0x01;

/// Event type of a [`RawEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventKind {
    /// `EV_SYN`
    Syn = EV_SYN,
    /// `EV_KEY`
    Key = EV_KEY,
    /// `EV_REL`
    Rel = EV_REL,
    /// `EV_ABS`
    Abs = EV_ABS,
}

impl EventKind {
    /// Raw `type` field value.
    #[inline]
    pub const fn raw(self) -> u16 {
        self as u16
    }

    /// Parse a raw `type` field.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            EV_SYN => Some(EventKind::Syn),
            EV_KEY => Some(EventKind::Key),
            EV_REL => Some(EventKind::Rel),
            EV_ABS => Some(EventKind::Abs),
            _ => None,
        }
    }
}

/// One event in the kernel input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Event type.
    pub kind: EventKind,
    /// Type-specific code (keycode, axis, ...).
    pub code: u16,
    /// Event value (1/0 for key state, delta for relative axes).
    pub value: i32,
    /// Time since the Unix epoch; encoded as zero when `None`.
    pub time: Option<Duration>,
}

impl RawEvent {
    /// Create an event without a timestamp.
    pub const fn new(kind: EventKind, code: u16, value: i32) -> Self {
        Self {
            kind,
            code,
            value,
            time: None,
        }
    }

    /// A key or button transition.
    pub const fn key(code: u16, pressed: bool) -> Self {
        Self::new(EventKind::Key, code, pressed as i32)
    }

    /// A relative axis delta.
    pub const fn relative(axis: u16, delta: i32) -> Self {
        Self::new(EventKind::Rel, axis, delta)
    }

    /// An absolute axis position.
    pub const fn absolute(axis: u16, value: i32) -> Self {
        Self::new(EventKind::Abs, axis, value)
    }

    /// The `SYN_REPORT` barrier.
    pub const fn syn() -> Self {
        Self::new(EventKind::Syn, SYN_REPORT, 0)
    }

    /// Whether this is a `SYN_REPORT` barrier.
    #[inline]
    pub fn is_syn(&self) -> bool {
        self.kind == EventKind::Syn && self.code == SYN_REPORT
    }

    /// Stamp the event with the current wall-clock time.
    pub fn stamped(mut self) -> Self {
        self.time = SystemTime::now().duration_since(UNIX_EPOCH).ok();
        self
    }

    /// Encode into the kernel `input_event` layout.
    pub fn encode(&self) -> [u8; EVENT_SIZE] {
        let (sec, usec) = match self.time {
            Some(t) => (t.as_secs() as i64, t.subsec_micros() as i64),
            None => (0, 0),
        };

        let mut buf = [0u8; EVENT_SIZE];
        buf[0..8].copy_from_slice(&sec.to_ne_bytes());
        buf[8..16].copy_from_slice(&usec.to_ne_bytes());
        buf[16..18].copy_from_slice(&self.kind.raw().to_ne_bytes());
        buf[18..20].copy_from_slice(&self.code.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.value.to_ne_bytes());
        buf
    }

    /// Decode a record produced by [`RawEvent::encode`].
    ///
    /// Returns `None` for unknown event types.
    pub fn decode(buf: &[u8; EVENT_SIZE]) -> Option<Self> {
        let sec = i64::from_ne_bytes(buf[0..8].try_into().ok()?);
        let usec = i64::from_ne_bytes(buf[8..16].try_into().ok()?);
        let kind = EventKind::from_raw(u16::from_ne_bytes([buf[16], buf[17]]))?;
        let code = u16::from_ne_bytes([buf[18], buf[19]]);
        let value = i32::from_ne_bytes([buf[20], buf[21], buf[22], buf[23]]);

        let time = if sec == 0 && usec == 0 {
            None
        } else {
            Some(Duration::from_secs(sec as u64) + Duration::from_micros(usec as u64))
        };

        Some(Self {
            kind,
            code,
            value,
            time,
        })
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:#x}, {})", self.kind, self.code, self.value)
    }
}

#[cfg(target_os = "linux")]
impl From<EventKind> for evdev::EventType {
    fn from(kind: EventKind) -> Self {
        evdev::EventType(kind.raw())
    }
}

#[cfg(target_os = "linux")]
impl From<RawEvent> for evdev::InputEvent {
    fn from(event: RawEvent) -> Self {
        evdev::InputEvent::new(event.kind.into(), event.code, event.value)
    }
}

#[cfg(target_os = "linux")]
impl RawEvent {
    /// Convert an evdev event. Returns `None` for event types not synthesized here.
    pub fn from_evdev(event: &evdev::InputEvent) -> Option<Self> {
        let kind = EventKind::from_raw(event.event_type().0)?;
        Some(Self::new(kind, event.code(), event.value()))
    }
}

/// Encode a batch of events back to back.
pub fn encode_batch(events: &[RawEvent]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(events.len() * EVENT_SIZE);
    for event in events {
        buf.extend_from_slice(&event.encode());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_libc() {
        assert_eq!(EVENT_SIZE, std::mem::size_of::<libc::input_event>());
    }

    #[test]
    fn test_constants_match_evdev() {
        use evdev::{AbsoluteAxisType, EventType, RelativeAxisType};
        assert_eq!(EV_SYN, EventType::SYNCHRONIZATION.0);
        assert_eq!(EV_KEY, EventType::KEY.0);
        assert_eq!(EV_REL, EventType::RELATIVE.0);
        assert_eq!(EV_ABS, EventType::ABSOLUTE.0);
        assert_eq!(REL_X, RelativeAxisType::REL_X.0);
        assert_eq!(REL_Y, RelativeAxisType::REL_Y.0);
        assert_eq!(REL_WHEEL, RelativeAxisType::REL_WHEEL.0);
        assert_eq!(REL_HWHEEL, RelativeAxisType::REL_HWHEEL.0);
        assert_eq!(ABS_X, AbsoluteAxisType::ABS_X.0);
        assert_eq!(ABS_Y, AbsoluteAxisType::ABS_Y.0);
    }

    #[test]
    fn test_unstamped_record_has_zero_timestamp() {
        let buf = RawEvent::key(30, true).encode();
        assert!(buf[..16].iter().all(|&b| b == 0));
        assert_eq!(u16::from_ne_bytes([buf[16], buf[17]]), EV_KEY);
        assert_eq!(u16::from_ne_bytes([buf[18], buf[19]]), 30);
        assert_eq!(i32::from_ne_bytes([buf[20], buf[21], buf[22], buf[23]]), 1);
    }

    #[test]
    fn test_negative_value_encoding() {
        let buf = RawEvent::relative(REL_Y, -2).encode();
        assert_eq!(i32::from_ne_bytes([buf[20], buf[21], buf[22], buf[23]]), -2);
    }

    #[test]
    fn test_stamped_timestamp_fields() {
        let event = RawEvent {
            time: Some(Duration::new(1_700_000_000, 123_456_000)),
            ..RawEvent::syn()
        };
        let buf = event.encode();
        assert_eq!(i64::from_ne_bytes(buf[0..8].try_into().unwrap()), 1_700_000_000);
        assert_eq!(i64::from_ne_bytes(buf[8..16].try_into().unwrap()), 123_456);
        assert_eq!(RawEvent::decode(&buf), Some(event));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let mut buf = RawEvent::syn().encode();
        buf[16] = 0x15;
        assert_eq!(RawEvent::decode(&buf), None);
    }

    #[test]
    fn test_evdev_conversion() {
        let event: evdev::InputEvent = RawEvent::relative(REL_WHEEL, -2).into();
        assert_eq!(event.event_type(), evdev::EventType::RELATIVE);
        assert_eq!(event.code(), REL_WHEEL);
        assert_eq!(event.value(), -2);
        assert_eq!(
            RawEvent::from_evdev(&event),
            Some(RawEvent::relative(REL_WHEEL, -2))
        );

        let led = evdev::InputEvent::new(evdev::EventType::LED, 0, 1);
        assert_eq!(RawEvent::from_evdev(&led), None);
    }

    #[test]
    fn test_batch_encoding() {
        let bytes = encode_batch(&[RawEvent::key(1, true), RawEvent::syn()]);
        assert_eq!(bytes.len(), 2 * EVENT_SIZE);
        assert_eq!(&bytes[EVENT_SIZE..], &RawEvent::syn().encode());
    }
}
