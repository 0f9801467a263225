//! ICSP timing constants
//!
//! Minimum delays from the PIC18F-Q20 programming specification. All are
//! lower bounds; the GPIO capability may sleep longer.

use std::time::Duration;

/// MCLR hold time before and after the LVP key
pub const T_ENTH: Duration = Duration::from_micros(1100);
/// Serial clock half period
pub const T_CLK: Duration = Duration::from_micros(2);
/// Data setup time before a falling clock edge
pub const T_DS: Duration = Duration::from_micros(1);
/// Delay between a command byte and its payload or effect
pub const T_DLY: Duration = Duration::from_micros(4);
/// Clock-high to data-out valid time
pub const T_CO: Duration = Duration::from_micros(1);
/// Delay until the target drives the data line after a read command
pub const T_LZD: Duration = Duration::from_micros(1);
/// Bulk erase completion time
pub const T_ERAB: Duration = Duration::from_millis(11);
