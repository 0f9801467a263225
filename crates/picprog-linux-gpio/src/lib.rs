//! picprog-linux-gpio - Linux GPIO character device backend
//!
//! Provides [`LinuxGpio`], an implementation of the ICSP engine's GPIO
//! capability over the Linux GPIO character device (gpiocdev).

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod device;
mod error;

pub use device::LinuxGpio;
pub use error::{LinuxGpioError, Result};
