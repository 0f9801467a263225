//! Region-aware programming workflows
//!
//! Composes the ICSP engine with the region map: device identification,
//! factory data decoding (DCI, DIA) and the program-and-verify loop.

use crate::error::{Error, Result};
use crate::firmware::{self, Firmware};
use crate::gpio::Gpio;
use crate::icsp::{NoProgress, Progress, Session};
use crate::region::{RegionMap, RegionName};

/// Device and revision identification words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    /// Device ID word
    pub device_id: u16,
    /// Silicon revision word
    pub revision_id: u16,
}

impl DeviceId {
    /// Model name for known device IDs, "Unknown" otherwise
    pub fn model(&self) -> &'static str {
        match self.device_id {
            0x7AE0 => "PIC18F04Q20",
            0x7AA0 => "PIC18F05Q20",
            0x7A60 => "PIC18F06Q20",
            0x7AC0 => "PIC18F14Q20",
            0x7A80 => "PIC18F15Q20",
            0x7A40 => "PIC18F16Q20",
            _ => "Unknown",
        }
    }

    /// Revision string: major as a letter from 'A', minor as a decimal
    pub fn revision(&self) -> String {
        let major = (self.revision_id & 0xFC0) >> 6;
        let minor = self.revision_id & 0x3F;
        format!("{}{}", (b'A' + major as u8) as char, minor)
    }
}

/// Device Configuration Information: factory-programmed geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dci {
    /// Erase page size in words
    pub erase_page_size: u16,
    /// Number of erasable pages
    pub num_erasable_pages: u16,
    /// Data EEPROM size in bytes
    pub eeprom_size: u16,
    /// Package pin count
    pub pin_count: u16,
}

/// Temperature indicator calibration parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TempCoeffs {
    /// Gain word
    pub gain: u16,
    /// ADC reading at 90 degrees Celsius
    pub adc_90: u16,
    /// Offset word
    pub offset: u16,
}

impl TempCoeffs {
    /// Gain in degrees Celsius per step
    pub fn gain_val(&self) -> f32 {
        256.0 * 0.1 / self.gain as f32
    }
}

/// Device Information Area: factory calibration and identity data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dia {
    /// Microchip unique identifier words
    pub mchp_uid: [u16; 9],
    /// Optional external unique identifier words
    pub ext_uid: [u16; 8],
    /// Temperature sensor parameters, low range
    pub low_temp_coeffs: TempCoeffs,
    /// Temperature sensor parameters, high range
    pub high_temp_coeffs: TempCoeffs,
    /// ADC FVR1 output voltages (1x, 2x, 4x) in millivolts
    pub fixed_voltage_ref: [u16; 3],
    /// Comparator FVR2 output voltages (1x, 2x, 4x) in millivolts
    pub fixed_voltage_comp: [u16; 3],
}

fn word_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

impl Dia {
    /// Decode the DIA layout from the raw region bytes
    ///
    /// Offsets per the data sheet: UID at 0, external UID at 20,
    /// temperature coefficients at 36, FVR data at 48.
    pub fn parse(data: &[u8]) -> Self {
        let mut dia = Dia::default();
        for (i, w) in dia.mchp_uid.iter_mut().enumerate() {
            *w = word_at(data, i * 2);
        }
        for (i, w) in dia.ext_uid.iter_mut().enumerate() {
            *w = word_at(data, 20 + i * 2);
        }
        dia.low_temp_coeffs = TempCoeffs {
            gain: word_at(data, 36),
            adc_90: word_at(data, 38),
            offset: word_at(data, 40),
        };
        dia.high_temp_coeffs = TempCoeffs {
            gain: word_at(data, 42),
            adc_90: word_at(data, 44),
            offset: word_at(data, 46),
        };
        for (i, w) in dia.fixed_voltage_ref.iter_mut().enumerate() {
            *w = word_at(data, 48 + i * 2);
        }
        for (i, w) in dia.fixed_voltage_comp.iter_mut().enumerate() {
            *w = word_at(data, 54 + i * 2);
        }
        dia
    }
}

/// Fixed programming order: PROGRAM first, CONFIG last
const PROGRAM_ORDER: [RegionName; 4] = [
    RegionName::PROGRAM,
    RegionName::EEPROM,
    RegionName::USER,
    RegionName::CONFIG,
];

/// High-level programmer over an active ICSP session
pub struct PicProgrammer<'a, G: Gpio> {
    session: Session<'a, G>,
    map: RegionMap,
}

impl<'a, G: Gpio> PicProgrammer<'a, G> {
    /// Wrap an active session together with the device's region map
    pub fn new(session: Session<'a, G>, map: RegionMap) -> Self {
        Self { session, map }
    }

    /// Access the underlying session, e.g. for raw region reads
    pub fn session(&mut self) -> &mut Session<'a, G> {
        &mut self.session
    }

    /// Read the device and revision ID words
    pub fn read_device_id(&mut self) -> Result<DeviceId> {
        let region = self.map.find_by_name(RegionName::ID)?;
        let data = self.session.read_region(region, &mut NoProgress)?;
        Ok(DeviceId {
            revision_id: word_at(&data, 0),
            device_id: word_at(&data, 2),
        })
    }

    /// Read and decode the Device Configuration Information
    pub fn read_dci(&mut self) -> Result<Dci> {
        let region = self.map.find_by_name(RegionName::DCI)?;
        let data = self.session.read_region(region, &mut NoProgress)?;
        Ok(Dci {
            erase_page_size: word_at(&data, 0),
            num_erasable_pages: word_at(&data, 4),
            eeprom_size: word_at(&data, 6),
            pin_count: word_at(&data, 8),
        })
    }

    /// Read and decode the Device Information Area
    pub fn read_dia(&mut self) -> Result<Dia> {
        let region = self.map.find_by_name(RegionName::DIA)?;
        let data = self.session.read_region(region, &mut NoProgress)?;
        Ok(Dia::parse(&data))
    }

    /// Read an entire region by name
    pub fn read_region(&mut self, name: RegionName, progress: &mut dyn Progress) -> Result<Vec<u8>> {
        let region = self.map.find_by_name(name)?;
        self.session.read_region(region, progress)
    }

    /// Program and verify a firmware image
    ///
    /// Bulk-erases the union of the regions present in the image and
    /// `extra_erase` in a single command, then write-verifies the image
    /// region by region in the fixed order PROGRAM, EEPROM, USER,
    /// CONFIG. Fails `NotWritable` before touching the device if the
    /// image names a read-only region.
    pub fn program_verify(
        &mut self,
        fw: &Firmware,
        extra_erase: RegionName,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        if let Some(r) = fw.iter().find(|r| !r.region.writable) {
            return Err(Error::NotWritable(r.region.name));
        }
        let to_erase = firmware::region_names(fw) | extra_erase;
        self.session.bulk_erase(to_erase)?;
        for name in PROGRAM_ORDER {
            for region in fw.iter().filter(|r| r.region.name == name) {
                for elem in &region.elems {
                    self.session
                        .write_verify(&self.map, elem.base_addr, &elem.data, progress)?;
                }
            }
        }
        Ok(())
    }
}
