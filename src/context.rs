//! Logging context handed to each component.
//!
//! Components never reach for a global logger object. They receive a
//! [`LogContext`] at construction and tag every record with its target, so a
//! host can route or filter device and daemon output independently through
//! whatever `log` implementation it installed.

use std::borrow::Cow;

/// Default target used when the host does not choose one.
pub const DEFAULT_TARGET: &str = "inputsynth";

/// Cheaply clonable logging handle carrying a `log` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    target: Cow<'static, str>,
}

impl LogContext {
    /// Create a context that logs under `target`.
    pub fn new(target: impl Into<Cow<'static, str>>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Derive a child context, e.g. `inputsynth` -> `inputsynth::uinput`.
    pub fn child(&self, name: &str) -> Self {
        Self::new(format!("{}::{}", self.target, name))
    }

    /// The `log` target string.
    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target() {
        assert_eq!(LogContext::default().target(), "inputsynth");
    }

    #[test]
    fn test_child_target() {
        let ctx = LogContext::new("host").child("uinput").child("mouse");
        assert_eq!(ctx.target(), "host::uinput::mouse");
    }
}
