//! Error types for picprog-core
//!
//! A single error enum covers the GPIO capability, the ICSP protocol
//! engine, the Intel HEX codec and the programmer. Everything surfaces to
//! the caller; nothing is retried or logged at this level.

use core::fmt;

use crate::region::RegionName;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Asynchronous termination observed by the GPIO backend. The current
    /// operation is aborted; the session release still runs.
    Interrupted,
    /// The GPIO backend cannot satisfy the request
    Unsupported(&'static str),
    /// GPIO backend failure
    Gpio(String),
    /// Input stream failure while parsing
    Io(String),

    // Addressing errors
    /// Address is not a multiple of the region word size
    Unaligned {
        /// Offending address
        addr: u32,
        /// Word size of the containing region
        word_size: u32,
    },
    /// Address outside the 22-bit device address space
    OutOfRange(u32),
    /// Address does not fall into any known region
    OutOfBounds(u32),

    // Intel HEX parse errors
    /// Line does not match the Intel HEX record grammar
    InvalidLine(String),
    /// Record checksum did not sum to zero
    BadChecksum {
        /// The offending line
        line: String,
        /// The non-zero residue of the checksum sum
        residue: u8,
    },
    /// Record type outside {DATA, EOF, EXT_LINEAR_ADDR}
    UnknownRecordType(u8),
    /// Stream ended without an end-of-file record
    TruncatedFile,
    /// Data record would overwrite already-parsed bytes
    Overlapping {
        /// 16-bit offset field of the offending record
        line_addr: u16,
        /// Absolute address the record resolves to
        linear_addr: u32,
    },

    // Programming errors
    /// Read-back after programming differed from the written word
    VerifyMismatch {
        /// Address of the word
        addr: u32,
        /// Region being programmed
        region: RegionName,
        /// Word that was written
        expected: u16,
        /// Word that was read back
        actual: u16,
    },
    /// Attempt to program a region that is not writable
    NotWritable(RegionName),
    /// Region name string did not match any known region
    UnknownRegion(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "GPIO interrupted"),
            Self::Unsupported(what) => write!(f, "unsupported GPIO request: {}", what),
            Self::Gpio(msg) => write!(f, "GPIO backend error: {}", msg),
            Self::Io(msg) => write!(f, "input stream failure: {}", msg),
            Self::Unaligned { addr, word_size } => write!(
                f,
                "address 0x{:06x} not aligned to word size {}",
                addr, word_size
            ),
            Self::OutOfRange(addr) => write!(f, "address 0x{:08x} out of range", addr),
            Self::OutOfBounds(addr) => {
                write!(f, "address 0x{:08x} does not map to any region", addr)
            }
            Self::InvalidLine(line) => write!(f, "invalid line in hex file: {}", line),
            Self::BadChecksum { line, residue } => {
                write!(f, "invalid checksum (0x{:02x}) on line {}", residue, line)
            }
            Self::UnknownRecordType(t) => write!(f, "unhandled record type 0x{:02x}", t),
            Self::TruncatedFile => write!(f, "end-of-file record missing from hex file"),
            Self::Overlapping {
                line_addr,
                linear_addr,
            } => write!(
                f,
                "overlapping layout on line with addr:0x{:04x}, linear addr: 0x{:08x}",
                line_addr, linear_addr
            ),
            Self::VerifyMismatch {
                addr,
                region,
                expected,
                actual,
            } => write!(
                f,
                "programming error at address 0x{:06x} (region {}): wrote 0x{:04x} but read back 0x{:04x}",
                addr, region, expected, actual
            ),
            Self::NotWritable(region) => write!(f, "region {} is not writable", region),
            Self::UnknownRegion(name) => write!(f, "unknown region name: {}", name),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
