//! Error types for the Linux GPIO backend

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// No GPIO chip device was specified
    #[error("no GPIO chip specified, expected a path like /dev/gpiochip0")]
    NoDevice,

    /// Failed to request a GPIO line
    #[error("failed to request GPIO line {line}: {source}")]
    LineRequestFailed {
        /// Line offset on the chip
        line: u32,
        /// Underlying gpiocdev error
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to reconfigure a GPIO line
    #[error("failed to reconfigure GPIO line {line}: {source}")]
    ReconfigureFailed {
        /// Line offset on the chip
        line: u32,
        /// Underlying gpiocdev error
        #[source]
        source: gpiocdev::Error,
    },
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
