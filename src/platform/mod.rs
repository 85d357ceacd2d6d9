//! Platform-specific implementations.

#[cfg(target_os = "linux")]
pub(crate) mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;

// Both backends are built on Linux-only kernel interfaces
#[cfg(not(target_os = "linux"))]
compile_error!("inputsynth only supports Linux");
