//! Device address-space model
//!
//! The 22-bit address space of the PIC18F-Q20 is partitioned into named
//! regions, each with its own word size, programming delay and
//! auto-increment behavior. The map is consulted by the ICSP engine for
//! every addressed operation and by the HEX codec to validate firmware
//! layout.

use core::fmt;
use std::str::FromStr;
use std::time::Duration;

use bitflags::bitflags;

use crate::error::{Error, Result};

bitflags! {
    /// Region names as a bit-flag set
    ///
    /// Unions select multiple regions at once, e.g. for bulk erase:
    /// `RegionName::PROGRAM | RegionName::CONFIG`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RegionName: u8 {
        /// Program flash memory
        const PROGRAM = 1;
        /// User ID words
        const USER    = 1 << 1;
        /// Device Information Area (factory calibration data)
        const DIA     = 1 << 2;
        /// Configuration bytes
        const CONFIG  = 1 << 3;
        /// Data EEPROM
        const EEPROM  = 1 << 4;
        /// Device Configuration Information (factory geometry constants)
        const DCI     = 1 << 5;
        /// Device and revision ID words
        const ID      = 1 << 6;
    }
}

impl RegionName {
    /// Name string of a single-flag value; unions stringify as "UNKNOWN"
    pub fn name(&self) -> &'static str {
        match *self {
            RegionName::PROGRAM => "PROGRAM",
            RegionName::USER => "USER",
            RegionName::DIA => "DIA",
            RegionName::CONFIG => "CONFIG",
            RegionName::EEPROM => "EEPROM",
            RegionName::DCI => "DCI",
            RegionName::ID => "ID",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PROGRAM" => Ok(RegionName::PROGRAM),
            "USER" => Ok(RegionName::USER),
            "DIA" => Ok(RegionName::DIA),
            "CONFIG" => Ok(RegionName::CONFIG),
            "EEPROM" => Ok(RegionName::EEPROM),
            "DCI" => Ok(RegionName::DCI),
            "ID" => Ok(RegionName::ID),
            _ => Err(Error::UnknownRegion(s.to_string())),
        }
    }
}

/// Immutable descriptor of one address-space region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Region name
    pub name: RegionName,
    /// Start address (inclusive)
    pub start: u32,
    /// End address (exclusive)
    pub end: u32,
    /// Programming word size in bytes (1 or 2)
    pub word_size: u32,
    /// Minimum wait after a word write, in microseconds (meaningful only
    /// when `writable`)
    pub t_prog_us: u32,
    /// Whether the region can be programmed
    pub writable: bool,
    /// Whether the device PC increments implicitly after each word access
    pub autoincrement_addr: bool,
}

impl Region {
    /// Size of the region in bytes
    pub fn size(&self) -> u32 {
        self.end - self.start
    }

    /// Number of programming words in the region
    pub fn word_cnt(&self) -> u32 {
        self.size() / self.word_size
    }

    /// Check whether an absolute address falls into this region
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Offset of `addr` relative to the region start
    pub fn rel_addr(&self, addr: u32) -> Result<u32> {
        if self.contains(addr) {
            Ok(addr - self.start)
        } else {
            Err(Error::OutOfRange(addr))
        }
    }

    /// Wait time after programming a word, `None` for read-only regions
    pub fn prog_delay(&self) -> Option<Duration> {
        self.writable
            .then(|| Duration::from_micros(self.t_prog_us as u64))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region name:{} address:[{:06x}h,{:06x}h)  word size: {}",
            self.name, self.start, self.end, self.word_size
        )
    }
}

/// An ordered, non-overlapping collection of regions
#[derive(Debug, Clone, Copy)]
pub struct RegionMap {
    regions: &'static [Region],
}

impl RegionMap {
    /// Create a map over a region table ordered by increasing start address
    pub const fn new(regions: &'static [Region]) -> Self {
        Self { regions }
    }

    /// All regions, in address order
    pub fn regions(&self) -> &'static [Region] {
        self.regions
    }

    /// Find the unique region containing an absolute address
    pub fn find_by_addr(&self, addr: u32) -> Result<&'static Region> {
        let idx = self.regions.partition_point(|r| r.end <= addr);
        match self.regions.get(idx) {
            Some(region) if region.contains(addr) => Ok(region),
            _ => Err(Error::OutOfBounds(addr)),
        }
    }

    /// Find the first region with exactly this name
    pub fn find_by_name(&self, name: RegionName) -> Result<&'static Region> {
        self.regions
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::UnknownRegion(name.name().to_string()))
    }
}

/// Region map of the PIC18F-Q20 family
pub const PIC18FQ20: RegionMap = RegionMap::new(&[
    Region {
        name: RegionName::PROGRAM,
        start: 0x00_0000,
        end: 0x01_0000,
        word_size: 2,
        t_prog_us: 75,
        writable: true,
        autoincrement_addr: true,
    },
    Region {
        name: RegionName::USER,
        start: 0x20_0000,
        end: 0x20_0040,
        word_size: 2,
        t_prog_us: 75,
        writable: true,
        autoincrement_addr: true,
    },
    Region {
        name: RegionName::DIA,
        start: 0x2C_0000,
        end: 0x2C_0100,
        word_size: 2,
        t_prog_us: 0,
        writable: false,
        autoincrement_addr: true,
    },
    Region {
        name: RegionName::CONFIG,
        start: 0x30_0000,
        end: 0x30_0020,
        word_size: 1,
        t_prog_us: 11_000,
        writable: true,
        autoincrement_addr: false,
    },
    Region {
        name: RegionName::EEPROM,
        start: 0x38_0000,
        end: 0x38_0100,
        word_size: 1,
        t_prog_us: 11_000,
        writable: true,
        autoincrement_addr: true,
    },
    Region {
        name: RegionName::DCI,
        start: 0x3C_0000,
        end: 0x3C_000A,
        word_size: 2,
        t_prog_us: 0,
        writable: false,
        autoincrement_addr: true,
    },
    Region {
        name: RegionName::ID,
        start: 0x3F_FFFC,
        end: 0x40_0000,
        word_size: 2,
        t_prog_us: 0,
        writable: false,
        autoincrement_addr: true,
    },
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pic18fq20_map_invariants() {
        let mut seen = RegionName::empty();
        for pair in PIC18FQ20.regions().windows(2) {
            assert!(pair[0].end <= pair[1].start, "regions must not overlap");
        }
        for r in PIC18FQ20.regions() {
            assert!(r.start < r.end);
            assert_eq!(r.start % r.word_size, 0);
            assert_eq!(r.size() % r.word_size, 0);
            assert!(!seen.intersects(r.name), "duplicate region name");
            seen |= r.name;
        }
    }

    #[test]
    fn find_by_addr_hits_each_region() {
        for region in PIC18FQ20.regions() {
            assert_eq!(PIC18FQ20.find_by_addr(region.start).unwrap(), region);
            assert_eq!(PIC18FQ20.find_by_addr(region.end - 1).unwrap(), region);
        }
    }

    #[test]
    fn find_by_addr_rejects_gaps() {
        // Between PROGRAM and USER
        assert!(matches!(
            PIC18FQ20.find_by_addr(0x01_0000),
            Err(Error::OutOfBounds(0x01_0000))
        ));
        assert!(matches!(
            PIC18FQ20.find_by_addr(0x1F_FFFF),
            Err(Error::OutOfBounds(_))
        ));
        // Past the end of the 22-bit space
        assert!(PIC18FQ20.find_by_addr(0x40_0000).is_err());
    }

    #[test]
    fn find_by_name_returns_exact_match() {
        let config = PIC18FQ20.find_by_name(RegionName::CONFIG).unwrap();
        assert_eq!(config.start, 0x30_0000);
        assert_eq!(config.word_size, 1);
        assert!(!config.autoincrement_addr);
        assert!(PIC18FQ20
            .find_by_name(RegionName::PROGRAM | RegionName::CONFIG)
            .is_err());
    }

    #[test]
    fn prog_delay_only_for_writable_regions() {
        let program = PIC18FQ20.find_by_name(RegionName::PROGRAM).unwrap();
        assert_eq!(program.prog_delay(), Some(Duration::from_micros(75)));
        let dia = PIC18FQ20.find_by_name(RegionName::DIA).unwrap();
        assert_eq!(dia.prog_delay(), None);
    }

    #[test]
    fn word_counts() {
        let id = PIC18FQ20.find_by_name(RegionName::ID).unwrap();
        assert_eq!(id.size(), 4);
        assert_eq!(id.word_cnt(), 2);
        let config = PIC18FQ20.find_by_name(RegionName::CONFIG).unwrap();
        assert_eq!(config.word_cnt(), 0x20);
    }

    #[test]
    fn region_name_round_trips_through_strings() {
        for name in [
            RegionName::PROGRAM,
            RegionName::USER,
            RegionName::DIA,
            RegionName::CONFIG,
            RegionName::EEPROM,
            RegionName::DCI,
            RegionName::ID,
        ] {
            assert_eq!(name.name().parse::<RegionName>().unwrap(), name);
        }
        assert!("BOOT".parse::<RegionName>().is_err());
    }

    #[test]
    fn region_display_banner() {
        let config = PIC18FQ20.find_by_name(RegionName::CONFIG).unwrap();
        assert_eq!(
            config.to_string(),
            "Region name:CONFIG address:[300000h,300020h)  word size: 1"
        );
    }
}
