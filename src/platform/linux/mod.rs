//! Linux output backends.
//!
//! - **uinput**: creates virtual devices through `/dev/uinput` (needs write access to it)
//! - **ydotool**: relays through a privileged `ydotoold` over a Unix socket
//!
//! ## Permissions for uinput
//!
//! ```bash
//! sudo usermod -aG input $USER
//! echo 'KERNEL=="uinput", GROUP="input", MODE="0660"' | sudo tee /etc/udev/rules.d/99-uinput.rules
//! # Then log out and back in
//! ```

pub mod uinput;
pub mod ydotool;
