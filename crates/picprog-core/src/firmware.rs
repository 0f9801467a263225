//! In-memory firmware representation
//!
//! A firmware image is a sequence of regions, each holding one or more
//! contiguous byte runs (elements). Elements within a region are strictly
//! increasing and non-overlapping; multi-byte words are stored
//! little-endian regardless of the source file's declared endianness.

use crate::region::{Region, RegionName};

/// A contiguous run of bytes at an absolute address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareElement {
    /// Absolute address of the first byte
    pub base_addr: u32,
    /// The bytes, little-endian within each word
    pub data: Vec<u8>,
}

impl FirmwareElement {
    /// New empty element starting at `base_addr`
    pub fn new(base_addr: u32) -> Self {
        Self {
            base_addr,
            data: Vec::new(),
        }
    }

    /// Address one past the last byte
    pub fn end_addr(&self) -> u32 {
        self.base_addr + self.data.len() as u32
    }
}

/// The portion of a firmware image that falls into one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareRegion {
    /// Descriptor of the containing region
    pub region: Region,
    /// Extended linear base address in effect when the region was opened
    pub base_addr: u32,
    /// Byte runs, in strictly increasing address order
    pub elems: Vec<FirmwareElement>,
}

impl FirmwareRegion {
    /// New region entry with no elements yet
    pub fn new(region: Region, base_addr: u32) -> Self {
        Self {
            region,
            base_addr,
            elems: Vec::new(),
        }
    }

    /// Total number of payload bytes across all elements
    pub fn total_bytes(&self) -> usize {
        self.elems.iter().map(|e| e.data.len()).sum()
    }
}

/// A complete firmware image, partitioned by region
pub type Firmware = Vec<FirmwareRegion>;

/// Union of the region names present in a firmware image
pub fn region_names(fw: &Firmware) -> RegionName {
    fw.iter()
        .fold(RegionName::empty(), |acc, r| acc | r.region.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PIC18FQ20;

    #[test]
    fn element_end_addr() {
        let mut elem = FirmwareElement::new(0x2FE8);
        elem.data.extend_from_slice(&[0x18, 0xD0]);
        assert_eq!(elem.end_addr(), 0x2FEA);
    }

    #[test]
    fn region_name_union() {
        let program = *PIC18FQ20.find_by_name(RegionName::PROGRAM).unwrap();
        let config = *PIC18FQ20.find_by_name(RegionName::CONFIG).unwrap();
        let fw: Firmware = vec![
            FirmwareRegion::new(program, 0),
            FirmwareRegion::new(config, 0x30_0000),
        ];
        assert_eq!(region_names(&fw), RegionName::PROGRAM | RegionName::CONFIG);
        assert_eq!(region_names(&Vec::new()), RegionName::empty());
    }
}
