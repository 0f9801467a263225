//! Intel HEX emitter
//!
//! Renders region contents as uppercase HEX records with LF line
//! terminators: an extended linear address record when the base address
//! exceeds 16 bits, then data records of up to 16 bytes, and a final EOF
//! record.

use std::io::{self, Write};

use crate::dump::Dumper;
use crate::region::Region;

/// Intel HEX record emitter
pub struct HexDumper<W: Write> {
    out: W,
}

impl<W: Write> HexDumper<W> {
    /// New emitter writing records to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Checksum of an extended linear address record
    pub fn extended_linear_addr_chk(addr_hi: u16) -> u8 {
        let base = 2u32 + 4 + (addr_hi as u32 & 0xFF) + (addr_hi as u32 >> 8);
        (base as u8).wrapping_neg()
    }

    /// Checksum of a data record
    pub fn data_chk(addr_lo: u16, data: &[u8]) -> u8 {
        let sum = data.iter().fold(
            data.len() as u32 + (addr_lo as u32 & 0xFF) + (addr_lo as u32 >> 8),
            |acc, b| acc + *b as u32,
        );
        (sum as u8).wrapping_neg()
    }

    /// Emit one data record
    pub fn dump_data_line(&mut self, addr_lo: u16, data: &[u8]) -> io::Result<()> {
        write!(self.out, ":{:02X}{:04X}{:02X}", data.len(), addr_lo, 0)?;
        for byte in data {
            write!(self.out, "{:02X}", byte)?;
        }
        writeln!(self.out, "{:02X}", Self::data_chk(addr_lo, data))
    }

    /// Emit a byte run at an absolute address, 16 bytes per record
    pub fn dump_data_memory(&mut self, base_addr: u32, data: &[u8]) -> io::Result<()> {
        let addr_hi = (base_addr >> 16) as u16;
        if base_addr > 0xFFFF {
            writeln!(
                self.out,
                ":{:02X}{:04X}{:02X}{:04X}{:02X}",
                2,
                0,
                4,
                addr_hi,
                Self::extended_linear_addr_chk(addr_hi)
            )?;
        }
        let mut addr_lo = (base_addr & 0xFFFF) as u16;
        for line in data.chunks(16) {
            self.dump_data_line(addr_lo, line)?;
            addr_lo = addr_lo.wrapping_add(line.len() as u16);
        }
        Ok(())
    }
}

impl<W: Write> Dumper for HexDumper<W> {
    fn dump_region(&mut self, region: &Region, data: &[u8]) -> io::Result<()> {
        self.dump_data_memory(region.start, data)
    }

    fn dump_end(&mut self) -> io::Result<()> {
        writeln!(self.out, ":00000001FF")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::Firmware;
    use crate::hex::parse_hex;
    use crate::region::{RegionName, PIC18FQ20};
    use std::io::Cursor;

    fn dump_to_string<F>(f: F) -> String
    where
        F: FnOnce(&mut HexDumper<&mut Vec<u8>>) -> io::Result<()>,
    {
        let mut out = Vec::new();
        let mut dumper = HexDumper::new(&mut out);
        f(&mut dumper).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn extended_linear_addr_checksum() {
        assert_eq!(HexDumper::<Vec<u8>>::extended_linear_addr_chk(0x30), 0xCA);
    }

    #[test]
    fn data_checksum() {
        let data = [
            0x01, 0x01, 0xE6, 0x9D, 0x12, 0x00, 0x01, 0x01, 0xE6, 0x8B, 0x12, 0x00, 0x05, 0x01,
            0xD2, 0x51,
        ];
        assert_eq!(HexDumper::<Vec<u8>>::data_chk(0x2FB8, &data), 0xC4);
    }

    #[test]
    fn dump_short_line_at_zero() {
        let text = dump_to_string(|d| d.dump_data_line(0, &[0xEF, 0x55, 0xF0, 0x00]));
        assert_eq!(text, ":04000000EF55F000C8\n");
    }

    #[test]
    fn dump_full_line() {
        let data = [
            0x05, 0x8F, 0x12, 0x00, 0x01, 0x01, 0x05, 0x9F, 0x12, 0x00, 0x00, 0x0E, 0x12, 0x00,
            0x01, 0x38,
        ];
        let text = dump_to_string(|d| d.dump_data_line(0x2FD8, &data));
        assert_eq!(text, ":102FD800058F12000101059F1200000E1200013832\n");
    }

    #[test]
    fn dump_config_region_emits_extended_addr() {
        let data = [
            0xEC, 0xFF, 0xFF, 0xFF, 0x9F, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF, 0xFF,
        ];
        let text = dump_to_string(|d| d.dump_data_memory(0x30_0000, &data));
        assert_eq!(
            text,
            ":020000040030CA\n:0B000000ECFFFFFF9FFFFF7FFFFFFFF3\n"
        );
    }

    #[test]
    fn dump_low_memory_skips_extended_addr() {
        let data = [
            0xFC, 0x0B, 0x3E, 0x0B, 0x44, 0x0B, 0x4A, 0x0B, 0xFC, 0x0B, 0xFC, 0x0B, 0xFC, 0x0B,
            0xFC, 0x0B, 0xFC, 0x0B, 0xFC, 0x0B, 0xFC, 0x0B, 0xFC, 0x0B, 0xFC, 0x0B, 0xFC, 0x0B,
            0xFC, 0x0B, 0xFC, 0x0B,
        ];
        let text = dump_to_string(|d| d.dump_data_memory(8, &data));
        assert_eq!(
            text,
            ":10000800FC0B3E0B440B4A0BFC0BFC0BFC0BFC0BD8\n:10001800FC0BFC0BFC0BFC0BFC0BFC0BFC0BFC0BA0\n"
        );
    }

    #[test]
    fn dump_splits_trailing_partial_line() {
        let data = [
            0x08, 0x6F, 0x33, 0xEC, 0x16, 0xF0, 0xEC, 0x0E, 0x06, 0x01, 0x07, 0x6F, 0x2F, 0x0E,
            0x08, 0x6F, 0x24, 0xEC, 0x16, 0xF0, 0x12, 0x00,
        ];
        let text = dump_to_string(|d| d.dump_data_memory(0x2290, &data));
        assert_eq!(
            text,
            ":10229000086F33EC16F0EC0E0601076F2F0E086F77\n:0622A00024EC16F0120010\n"
        );
    }

    #[test]
    fn emit_parse_round_trip() {
        let eeprom = PIC18FQ20.find_by_name(RegionName::EEPROM).unwrap();
        let mut data = vec![0xFFu8; eeprom.size() as usize];
        data[..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut out = Vec::new();
        let mut dumper = HexDumper::new(&mut out);
        dumper.dump_region(eeprom, &data).unwrap();
        dumper.dump_end().unwrap();

        let fw: Firmware = parse_hex(&PIC18FQ20, Cursor::new(out), true).unwrap();
        assert_eq!(fw.len(), 1);
        assert_eq!(fw[0].region.name, RegionName::EEPROM);
        assert_eq!(fw[0].elems.len(), 1);
        assert_eq!(fw[0].elems[0].base_addr, eeprom.start);
        assert_eq!(fw[0].elems[0].data, data);
    }
}
