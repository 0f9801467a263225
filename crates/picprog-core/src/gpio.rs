//! The GPIO capability consumed by the ICSP engine
//!
//! The engine drives the programming dialog through this narrow contract;
//! the backend decides how pins are actually actuated (Linux GPIO
//! character device, an in-memory mock, ...). The capability carries no
//! ordering guarantees beyond per-call completion: the engine sequences
//! writes and delays itself to realize the wire timing.

use std::time::Duration;

use crate::error::Result;

/// GPIO pin identifier (line offset on the backend's chip)
pub type Pin = u32;

/// Direction of a GPIO pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Pin is read by the host
    Input,
    /// Pin is driven by the host
    Output,
}

/// Minimal GPIO capability
///
/// All methods observe the backend's asynchronous termination flag: the
/// first call after the flag is raised fails with [`Error::Interrupted`]
/// and clears the flag, so that the session release can still drive the
/// exit sequence.
///
/// [`Error::Interrupted`]: crate::error::Error::Interrupted
pub trait Gpio {
    /// Configure a pin direction, optionally presetting the output level.
    ///
    /// Fails with `Unsupported` if the backend cannot satisfy the mode.
    fn set_mode(&mut self, pin: Pin, mode: PinMode, initial: Option<bool>) -> Result<()>;

    /// Drive an output pin. The pin must be in [`PinMode::Output`].
    fn write(&mut self, pin: Pin, value: bool) -> Result<()>;

    /// Sample an input pin. The pin must be in [`PinMode::Input`].
    fn read(&mut self, pin: Pin) -> Result<bool>;

    /// Wait for at least `duration`. The actual delay may exceed it.
    fn delay(&mut self, duration: Duration);
}
