//! Region dumpers
//!
//! A dumper renders captured region contents to an output stream. Two
//! renderers exist: the textual hexdump below and the Intel HEX emitter
//! in [`crate::hex::HexDumper`].

use std::io::{self, Write};

use crate::region::Region;

/// Sink for captured regions
pub trait Dumper {
    /// Called once before the first region
    fn dump_start(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Render one region's contents. `data` covers the region from its
    /// start address.
    fn dump_region(&mut self, region: &Region, data: &[u8]) -> io::Result<()>;

    /// Called once after the last region
    fn dump_end(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Human-readable hexdump renderer
///
/// Per region: a banner line, then rows of 16 bytes with an ASCII gutter:
///
/// ```text
/// Region name:EEPROM address:[380000h,380100h)  word size: 1
/// 0x380000 | de ad be ef ff ff ff ff ff ff ff ff ff ff ff ff | ................ |
/// ```
pub struct TextDumper<W: Write> {
    out: W,
    bytes_per_line: usize,
}

impl<W: Write> TextDumper<W> {
    /// New dumper writing 16-byte rows to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            bytes_per_line: 16,
        }
    }

    /// Render a byte run starting at an arbitrary address
    pub fn dump_memory(&mut self, mut addr: u32, data: &[u8]) -> io::Result<()> {
        for line in data.chunks(self.bytes_per_line) {
            self.dump_line(addr, line)?;
            addr += self.bytes_per_line as u32;
        }
        Ok(())
    }

    fn dump_line(&mut self, addr: u32, data: &[u8]) -> io::Result<()> {
        write!(self.out, "0x{:06x} | ", addr)?;
        for byte in data {
            write!(self.out, "{:02x} ", byte)?;
        }
        for _ in data.len()..self.bytes_per_line {
            write!(self.out, "   ")?;
        }
        write!(self.out, "| ")?;
        for &byte in data {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            };
            write!(self.out, "{}", c)?;
        }
        for _ in data.len()..self.bytes_per_line {
            write!(self.out, " ")?;
        }
        writeln!(self.out, " |")
    }
}

impl<W: Write> Dumper for TextDumper<W> {
    fn dump_region(&mut self, region: &Region, data: &[u8]) -> io::Result<()> {
        writeln!(self.out, "{}", region)?;
        self.dump_memory(region.start, data)
    }
}
