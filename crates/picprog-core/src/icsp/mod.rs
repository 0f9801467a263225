//! ICSP protocol engine
//!
//! A half-duplex two-wire master driving the PIC18F-Q20 programming
//! dialog over bit-banged GPIO: Low-Voltage Programming entry, command
//! issuance, memory read/write with word-level verification, and bulk
//! erase.
//!
//! Programming mode is a scoped resource: [`Icsp::enter_programming`]
//! returns a [`Session`] whose drop runs the exit sequence on every path,
//! releasing MCLR and disabling PROG_EN so the target resumes normal
//! operation.

pub mod opcodes;
pub mod timings;

use std::time::Duration;

use crate::error::{Error, Result};
use crate::gpio::{Gpio, Pin, PinMode};
use crate::region::{Region, RegionMap, RegionName};

use timings::{T_CLK, T_DLY, T_ENTH, T_ERAB};

/// LVP entry key, shifted out MSB-first after MCLR goes low ("MCHP")
const LVP_KEY: [u8; 4] = [0x4D, 0x43, 0x48, 0x50];

/// Largest address LOAD_PC accepts (22-bit space)
const MAX_PC: u32 = 0x3F_FFFF;

// T_CLK dominates T_DS, T_CO and T_LZD, so a single constant covers the
// half cycle on both directions and the turnaround before a read.
const CLK_WAIT: Duration = T_CLK;

/// Listener for byte-level progress of read/write operations
pub trait Progress {
    /// Called after each word transfer with the number of bytes moved
    fn on_progress(&mut self, byte_count: usize);
}

/// A no-op progress listener
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_progress(&mut self, _byte_count: usize) {}
}

/// GPIO pin assignment of the ICSP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcspPins {
    /// Serial clock (ICSPCLK)
    pub clk: Pin,
    /// Bidirectional data (ICSPDAT)
    pub data: Pin,
    /// Master clear / reset
    pub mclr: Pin,
    /// Programming buffer enable; not present on all boards
    pub prog_en: Option<Pin>,
}

impl Default for IcspPins {
    fn default() -> Self {
        Self {
            clk: 11,
            data: 10,
            mclr: 24,
            prog_en: Some(6),
        }
    }
}

/// The ICSP master
///
/// Owns the GPIO capability for its lifetime; pins are put into the idle
/// state (MCLR high, CLK/DATA low, PROG_EN low) on construction.
pub struct Icsp<G: Gpio> {
    gpio: G,
    pins: IcspPins,
    in_program_mode: bool,
}

impl<G: Gpio> Icsp<G> {
    /// Take ownership of the GPIO capability and drive all pins idle
    pub fn new(gpio: G, pins: IcspPins) -> Result<Self> {
        let mut icsp = Self {
            gpio,
            pins,
            in_program_mode: false,
        };
        icsp.idle_gpio()?;
        Ok(icsp)
    }

    /// Release the GPIO capability
    pub fn into_gpio(self) -> G {
        self.gpio
    }

    /// Whether a programming session is active
    pub fn programming(&self) -> bool {
        self.in_program_mode
    }

    /// Enter Low-Voltage Programming mode
    ///
    /// Runs the entry sequence (PROG_EN assert, MCLR low, LVP key) and
    /// returns the scoped session. Idempotent: if the engine is already
    /// in programming mode the sequence is skipped.
    pub fn enter_programming(&mut self) -> Result<Session<'_, G>> {
        if !self.in_program_mode {
            self.idle_gpio()?;
            if let Some(pin) = self.pins.prog_en {
                self.gpio.write(pin, true)?;
            }
            self.gpio.delay(Duration::from_millis(1));
            self.gpio.write(self.pins.mclr, false)?;
            self.gpio.delay(2 * T_ENTH);
            self.write_data_sequence(&LVP_KEY)?;
            self.gpio.delay(2 * T_ENTH);
            self.in_program_mode = true;
        }
        Ok(Session { icsp: self })
    }

    /// Leave programming mode: release MCLR, deassert PROG_EN
    ///
    /// Idempotent; runs on every session exit path.
    pub fn exit_programming(&mut self) -> Result<()> {
        if self.in_program_mode {
            self.in_program_mode = false;
            self.gpio.delay(T_ENTH + T_CLK);
            self.gpio.write(self.pins.mclr, true)?;
            if let Some(pin) = self.pins.prog_en {
                self.gpio.write(pin, false)?;
            }
        }
        Ok(())
    }

    /// Configure all pins to the out-of-session idle state
    fn idle_gpio(&mut self) -> Result<()> {
        self.gpio
            .set_mode(self.pins.mclr, PinMode::Output, Some(true))?;
        self.gpio
            .set_mode(self.pins.clk, PinMode::Output, Some(false))?;
        self.gpio
            .set_mode(self.pins.data, PinMode::Output, Some(false))?;
        if let Some(pin) = self.pins.prog_en {
            self.gpio.set_mode(pin, PinMode::Output, Some(false))?;
        }
        Ok(())
    }

    /// Shift bytes out on the data line, MSB-first, one bit per clock
    /// cycle: the rising edge presents the bit, the falling edge ends it.
    fn write_data_sequence(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            for bit in (0..8).rev() {
                self.gpio.write(self.pins.clk, true)?;
                self.gpio.write(self.pins.data, (byte >> bit) & 1 != 0)?;
                self.gpio.delay(CLK_WAIT);
                self.gpio.write(self.pins.clk, false)?;
                self.gpio.delay(CLK_WAIT);
            }
        }
        Ok(())
    }

    /// Issue a write command with its 24-bit payload
    fn write_transaction(&mut self, data: u16, increment_pc: bool) -> Result<()> {
        let cmd = if increment_pc {
            opcodes::WRITE_NVM_INC
        } else {
            opcodes::WRITE_NVM
        };
        self.write_data_sequence(&[cmd])?;
        self.gpio.delay(T_DLY);
        self.write_data_sequence(&payload_bytes(data as u32))
    }

    /// Issue a read command and clock in the 24-bit response
    ///
    /// The data line is turned around to an input for the transfer and
    /// restored to a driven-low output afterwards, on success and error
    /// alike. Bytes are returned low-to-high: `[0]` holds the last eight
    /// bits received.
    fn read_transaction(&mut self, increment_pc: bool) -> Result<[u8; 3]> {
        let cmd = if increment_pc {
            opcodes::READ_NVM_INC
        } else {
            opcodes::READ_NVM
        };
        self.write_data_sequence(&[cmd])?;
        self.gpio.set_mode(self.pins.data, PinMode::Input, None)?;

        let result = self.read_data_bits();

        let restored = self
            .gpio
            .set_mode(self.pins.data, PinMode::Output, Some(false))
            .and_then(|_| self.gpio.write(self.pins.clk, false));
        let raw = result?;
        restored?;
        Ok(raw)
    }

    fn read_data_bits(&mut self) -> Result<[u8; 3]> {
        // T_DLY >= T_LZD: the target drives the line well before this
        // returns.
        self.gpio.delay(T_DLY);
        let mut res = [0u8; 3];
        for byte_cnt in (0..3).rev() {
            let mut buffer = 0u8;
            for bit_idx in (0..8).rev() {
                self.gpio.write(self.pins.clk, true)?;
                self.gpio.delay(T_CLK);
                if self.gpio.read(self.pins.data)? {
                    buffer |= 1 << bit_idx;
                }
                self.gpio.write(self.pins.clk, false)?;
                self.gpio.delay(T_CLK);
            }
            res[byte_cnt] = buffer;
        }
        Ok(res)
    }

    fn wait(&mut self, d: Duration) {
        self.gpio.delay(d);
    }
}

/// Convert a value to transmission format: 24 bits MSB-first with a
/// trailing stop bit of zero.
fn payload_bytes(value: u32) -> [u8; 3] {
    let v = value << 1;
    [(v >> 16) as u8, (v >> 8) as u8, v as u8]
}

/// Extract the data word from a raw 24-bit read: clear the leading
/// padding (17 significant bits for a 2-byte word, 9 for a single byte),
/// then shift off the stop bit.
fn word_from_raw(raw: [u8; 3], word_size: u32) -> u16 {
    let mut tmp = raw[0] as u32 | (raw[1] as u32) << 8 | (raw[2] as u32) << 16;
    tmp &= if word_size == 2 { 0x1_FFFF } else { 0x1FF };
    (tmp >> 1) as u16
}

/// Pack up to `word_size` bytes into a programming word, little-endian,
/// right-padding a short trailing chunk with 0xFF.
fn word_from_chunk(chunk: &[u8], word_size: u32) -> Result<u16> {
    match word_size {
        1 if chunk.len() == 1 => Ok(chunk[0] as u16),
        2 if chunk.len() == 1 || chunk.len() == 2 => {
            let lo = chunk[0] as u16;
            let hi = chunk.get(1).copied().unwrap_or(0xFF) as u16;
            Ok(hi << 8 | lo)
        }
        _ => Err(Error::Unsupported("word size for low level write")),
    }
}

/// An active programming session
///
/// Created by [`Icsp::enter_programming`]; dropping it runs the exit
/// sequence. All addressed operations take the region map to resolve
/// word size, programming delay and auto-increment behavior.
pub struct Session<'a, G: Gpio> {
    icsp: &'a mut Icsp<G>,
}

impl<G: Gpio> Session<'_, G> {
    /// Set the target PC. Rejects addresses above the 22-bit space.
    pub fn load_pc(&mut self, addr: u32) -> Result<()> {
        if addr > MAX_PC {
            return Err(Error::OutOfRange(addr));
        }
        self.icsp.write_data_sequence(&[opcodes::LOAD_PC])?;
        self.icsp.wait(T_DLY);
        self.icsp.write_data_sequence(&payload_bytes(addr))?;
        self.icsp.wait(T_DLY);
        Ok(())
    }

    /// Advance the target PC by one word
    pub fn increment_pc(&mut self) -> Result<()> {
        self.icsp.write_data_sequence(&[opcodes::INC_PC])?;
        self.icsp.wait(T_DLY);
        Ok(())
    }

    /// Bulk erase the selected regions in one command
    ///
    /// Only EEPROM, PROGRAM, USER and CONFIG participate; other names in
    /// the set are ignored. An empty selection is a no-op.
    pub fn bulk_erase(&mut self, regions: RegionName) -> Result<()> {
        let mut bitmap = 0u8;
        if regions.contains(RegionName::EEPROM) {
            bitmap |= 1 << opcodes::ERASE_EEPROM_BIT;
        }
        if regions.contains(RegionName::PROGRAM) {
            bitmap |= 1 << opcodes::ERASE_PROGRAM_BIT;
        }
        if regions.contains(RegionName::USER) {
            bitmap |= 1 << opcodes::ERASE_USER_BIT;
        }
        if regions.contains(RegionName::CONFIG) {
            bitmap |= 1 << opcodes::ERASE_CONFIG_BIT;
        }
        if bitmap == 0 {
            return Ok(());
        }
        log::debug!("bulk erase bitmap 0x{:02x}", bitmap);
        self.icsp.write_data_sequence(&[opcodes::BULK_ERASE])?;
        self.icsp.wait(T_DLY);
        self.icsp.write_data_sequence(&payload_bytes(bitmap as u32))?;
        self.icsp.wait(T_ERAB);
        Ok(())
    }

    /// Read one word at PC, optionally auto-incrementing
    pub fn read_word(&mut self, region: &Region, autoinc: bool) -> Result<u16> {
        let raw = self.icsp.read_transaction(autoinc)?;
        self.icsp.wait(T_DLY);
        Ok(word_from_raw(raw, region.word_size))
    }

    /// Read `n` bytes starting at `addr`
    ///
    /// The address must be word-aligned within its region; bytes are
    /// emitted little-endian per word. Progress is reported after each
    /// word.
    pub fn read_n(
        &mut self,
        map: &RegionMap,
        addr: u32,
        n: usize,
        progress: &mut dyn Progress,
    ) -> Result<Vec<u8>> {
        let region = *self.region_metadata(map, addr)?;
        self.read_n_impl(&region, addr, n, progress)
    }

    /// Read an entire region
    pub fn read_region(&mut self, region: &Region, progress: &mut dyn Progress) -> Result<Vec<u8>> {
        self.read_n_impl(region, region.start, region.size() as usize, progress)
    }

    fn read_n_impl(
        &mut self,
        region: &Region,
        addr: u32,
        n: usize,
        progress: &mut dyn Progress,
    ) -> Result<Vec<u8>> {
        self.load_pc(addr)?;
        let word_size = region.word_size as usize;
        let mut out = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            let word = self.read_word(region, region.autoincrement_addr)?;
            out.extend_from_slice(&word.to_le_bytes()[..word_size]);
            if !region.autoincrement_addr {
                self.increment_pc()?;
            }
            progress.on_progress(word_size);
            i += word_size;
        }
        Ok(out)
    }

    /// Program `data` starting at `addr`, one word at a time
    ///
    /// A trailing chunk shorter than the word size is padded with 0xFF
    /// in the high bytes. Waits the region's programming delay after each
    /// word; fails `Unaligned` if `addr` is not word-aligned and
    /// `NotWritable` for read-only regions.
    pub fn write(
        &mut self,
        map: &RegionMap,
        addr: u32,
        data: &[u8],
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let region = *self.region_metadata(map, addr)?;
        self.load_pc(addr)?;
        for chunk in data.chunks(region.word_size as usize) {
            self.write_word_chunk(&region, chunk, region.autoincrement_addr)?;
            if !region.autoincrement_addr {
                self.increment_pc()?;
            }
            progress.on_progress(region.word_size as usize);
        }
        Ok(())
    }

    /// As [`write`](Self::write), but read back and compare each word
    ///
    /// Each word is programmed without auto-increment, read back with a
    /// non-incrementing read and compared; the PC is then advanced with
    /// an explicit INC_PC. A mismatch fails with `VerifyMismatch`
    /// carrying the address and both words.
    pub fn write_verify(
        &mut self,
        map: &RegionMap,
        addr: u32,
        data: &[u8],
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let region = *self.region_metadata(map, addr)?;
        self.load_pc(addr)?;
        let mut addr = addr;
        for chunk in data.chunks(region.word_size as usize) {
            let expected = self.write_word_chunk(&region, chunk, false)?;
            let actual = self.read_word(&region, false)?;
            if actual != expected {
                return Err(Error::VerifyMismatch {
                    addr,
                    region: region.name,
                    expected,
                    actual,
                });
            }
            self.increment_pc()?;
            addr += region.word_size;
            progress.on_progress(region.word_size as usize);
        }
        Ok(())
    }

    /// Program one word and wait the region's programming delay.
    /// Returns the word as sent, including any 0xFF padding.
    fn write_word_chunk(&mut self, region: &Region, chunk: &[u8], autoinc: bool) -> Result<u16> {
        let delay = region.prog_delay().ok_or(Error::NotWritable(region.name))?;
        let word = word_from_chunk(chunk, region.word_size)?;
        self.icsp.write_transaction(word, autoinc)?;
        self.icsp.wait(delay);
        Ok(word)
    }

    /// Resolve the region containing `addr`, enforcing word alignment
    fn region_metadata<'m>(&self, map: &'m RegionMap, addr: u32) -> Result<&'m Region> {
        let region = map.find_by_addr(addr)?;
        if addr % region.word_size != 0 {
            return Err(Error::Unaligned {
                addr,
                word_size: region.word_size,
            });
        }
        Ok(region)
    }
}

impl<G: Gpio> Drop for Session<'_, G> {
    fn drop(&mut self) {
        // The backend's termination flag is one-shot, so the exit
        // sequence runs even right after an Interrupted abort.
        if let Err(e) = self.icsp.exit_programming() {
            log::warn!("failed to leave programming mode: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_adds_stop_bit() {
        assert_eq!(payload_bytes(0x3F_FFFF), [0x7F, 0xFF, 0xFE]);
        assert_eq!(payload_bytes(0x01), [0x00, 0x00, 0x02]);
        assert_eq!(payload_bytes(0x00), [0x00, 0x00, 0x00]);
    }

    #[test]
    fn word_extraction_strips_padding_and_stop_bit() {
        // 0xBEEF on the wire: (0xBEEF << 1) in the low 17 bits
        let v = 0xBEEFu32 << 1;
        let raw = [v as u8, (v >> 8) as u8, (v >> 16) as u8];
        assert_eq!(word_from_raw(raw, 2), 0xBEEF);
        // Single-byte word keeps 9 significant bits
        let v = 0xA5u32 << 1;
        let raw = [v as u8, (v >> 8) as u8, 0xFF];
        assert_eq!(word_from_raw(raw, 1), 0xA5);
    }

    #[test]
    fn short_chunks_pad_with_ff() {
        assert_eq!(word_from_chunk(&[0x50], 2).unwrap(), 0xFF50);
        assert_eq!(word_from_chunk(&[0x0B, 0xF0], 2).unwrap(), 0xF00B);
        assert_eq!(word_from_chunk(&[0xEC], 1).unwrap(), 0x00EC);
        assert!(word_from_chunk(&[1, 2, 3], 2).is_err());
    }
}
