//! picprog-core - Core library for PIC18F-Q20 ICSP programming
//!
//! This crate provides the protocol engine and data model for
//! programming PIC18F-Q20 microcontrollers over their In-Circuit Serial
//! Programming interface, bit-banged through a pluggable GPIO
//! capability:
//!
//! - [`region`] - the device's 22-bit address space partitioned into
//!   named regions
//! - [`firmware`] - the in-memory firmware image
//! - [`hex`] - Intel HEX parsing and emission
//! - [`icsp`] - the two-wire programming dialog (LVP entry, command set,
//!   read/write/erase) with a scoped session
//! - [`programmer`] - device identification and program-verify workflows
//! - [`dump`] - renderers for captured region contents
//!
//! # Example
//!
//! ```ignore
//! use picprog_core::icsp::{Icsp, IcspPins, NoProgress};
//! use picprog_core::programmer::PicProgrammer;
//! use picprog_core::region::PIC18FQ20;
//!
//! fn identify<G: picprog_core::gpio::Gpio>(gpio: G) -> picprog_core::Result<()> {
//!     let mut icsp = Icsp::new(gpio, IcspPins::default())?;
//!     let session = icsp.enter_programming()?;
//!     let mut programmer = PicProgrammer::new(session, PIC18FQ20);
//!     let id = programmer.read_device_id()?;
//!     println!("{} rev {}", id.model(), id.revision());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod dump;
pub mod error;
pub mod firmware;
pub mod gpio;
pub mod hex;
pub mod icsp;
pub mod programmer;
pub mod region;

pub use error::{Error, Result};
