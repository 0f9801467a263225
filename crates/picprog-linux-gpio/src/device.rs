//! Linux GPIO character device backend
//!
//! Implements the ICSP engine's GPIO capability over gpiocdev. Each pin
//! gets its own line request, created on the first mode configuration
//! and reconfigured in place on direction turnarounds (the data line
//! flips between output and input on every read transaction).
//!
//! The backend carries the process's termination flag: the first
//! capability call after the flag is raised fails `Interrupted` and
//! clears it, so the session's exit sequence can still drive the pins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gpiocdev::line::Value;
use gpiocdev::request::{Config, Request};

use picprog_core::error::{Error, Result as CoreResult};
use picprog_core::gpio::{Gpio, Pin, PinMode};

use crate::error::{LinuxGpioError, Result};

/// GPIO capability over the Linux character device interface
pub struct LinuxGpio {
    device: String,
    requests: HashMap<Pin, Request>,
    interrupted: Arc<AtomicBool>,
}

impl LinuxGpio {
    /// Open a GPIO chip (e.g. `/dev/gpiochip0`)
    ///
    /// `interrupted` is the process termination flag, typically set from
    /// a SIGINT/SIGTERM handler.
    pub fn open(device: impl Into<String>, interrupted: Arc<AtomicBool>) -> Result<Self> {
        let device = device.into();
        if device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        log::debug!("linux_gpio: using chip {}", device);
        Ok(Self {
            device,
            requests: HashMap::new(),
            interrupted,
        })
    }

    fn check_interrupted(&self) -> CoreResult<()> {
        // One-shot: observing the flag clears it so that the session
        // release can run the exit sequence.
        if self.interrupted.swap(false, Ordering::SeqCst) {
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    fn line_config(pin: Pin, mode: PinMode, initial: Option<bool>) -> Config {
        let mut config = Config::default();
        match mode {
            PinMode::Input => {
                config.with_line(pin).as_input();
            }
            PinMode::Output => {
                let value = if initial.unwrap_or(false) {
                    Value::Active
                } else {
                    Value::Inactive
                };
                config.with_line(pin).as_output(value);
            }
        }
        config
    }

    fn configure(&mut self, pin: Pin, mode: PinMode, initial: Option<bool>) -> Result<()> {
        let config = Self::line_config(pin, mode, initial);
        if let Some(request) = self.requests.get_mut(&pin) {
            request
                .reconfigure(&config)
                .map_err(|source| LinuxGpioError::ReconfigureFailed { line: pin, source })?;
        } else {
            let request = Request::from_config(config)
                .on_chip(&self.device)
                .with_consumer("picprog")
                .request()
                .map_err(|source| LinuxGpioError::LineRequestFailed { line: pin, source })?;
            self.requests.insert(pin, request);
        }
        Ok(())
    }
}

impl Gpio for LinuxGpio {
    fn set_mode(&mut self, pin: Pin, mode: PinMode, initial: Option<bool>) -> CoreResult<()> {
        self.check_interrupted()?;
        self.configure(pin, mode, initial)
            .map_err(|e| Error::Gpio(e.to_string()))
    }

    fn write(&mut self, pin: Pin, value: bool) -> CoreResult<()> {
        self.check_interrupted()?;
        let request = self
            .requests
            .get(&pin)
            .ok_or(Error::Unsupported("write to unconfigured pin"))?;
        let value = if value { Value::Active } else { Value::Inactive };
        request
            .set_value(pin, value)
            .map_err(|e| Error::Gpio(e.to_string()))?;
        Ok(())
    }

    fn read(&mut self, pin: Pin) -> CoreResult<bool> {
        self.check_interrupted()?;
        let request = self
            .requests
            .get(&pin)
            .ok_or(Error::Unsupported("read from unconfigured pin"))?;
        match request.value(pin) {
            Ok(Value::Active) => Ok(true),
            Ok(Value::Inactive) => Ok(false),
            Err(e) => Err(Error::Gpio(e.to_string())),
        }
    }

    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
