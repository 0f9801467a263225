//! Info command: device identification or firmware file summary

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use picprog_core::firmware::Firmware;
use picprog_core::hex;
use picprog_core::icsp::Icsp;
use picprog_core::programmer::{Dci, DeviceId, Dia, PicProgrammer, TempCoeffs};
use picprog_core::region::PIC18FQ20;

use crate::backends;
use crate::cli::Cli;

/// Run the info command
pub fn run(cli: &Cli, file: Option<&Path>, headers: bool) -> Result<(), Box<dyn std::error::Error>> {
    if headers {
        println!("Section information for PIC18F-Q20:");
        for region in PIC18FQ20.regions() {
            println!("{}", region);
        }
        return Ok(());
    }

    match file {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            let fw = hex::parse_hex(&PIC18FQ20, reader, true)?;
            print_firmware_info(path, &fw);
        }
        None => {
            let gpio = backends::open_gpio(cli)?;
            let mut icsp = Icsp::new(gpio, backends::icsp_pins(cli))?;
            let session = icsp.enter_programming()?;
            let mut programmer = PicProgrammer::new(session, PIC18FQ20);
            let id = programmer.read_device_id()?;
            let dci = programmer.read_dci()?;
            let dia = programmer.read_dia()?;
            print_device_info(&id, &dci, &dia);
        }
    }
    Ok(())
}

fn print_firmware_info(path: &Path, fw: &Firmware) {
    println!("Info from firmware file : {}", path.display());
    println!("  Number of regions: {}", fw.len());
    for region in fw {
        println!(
            "  Region: {} [{:06x}-{:06x})",
            region.region.name, region.region.start, region.region.end
        );
        println!("    Contiguous sections:{}", region.elems.len());
        println!("    Total size in bytes:{}", region.total_bytes());
    }
}

fn format_uid(words: &[u16]) -> String {
    words
        .iter()
        .map(|w| format!("{:04x}", w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_temp_coeffs(key: &str, coeffs: &TempCoeffs) {
    println!("  Temperature Sensor Parameters({}):", key);
    println!("    Gain: 0x{:04x} ({:.6} C_deg)", coeffs.gain, coeffs.gain_val());
    println!("    ADC 90 deg. reading: 0x{:04x}", coeffs.adc_90);
    println!("    Offset: 0x{:04x}", coeffs.offset);
}

fn print_device_info(id: &DeviceId, dci: &Dci, dia: &Dia) {
    println!("Device Id: 0x{:04x} ({})", id.device_id, id.model());
    println!("Revision Id: 0x{:04x} ({})", id.revision_id, id.revision());

    println!("Device Configuration Information:");
    println!("  Erase page size: {} words", dci.erase_page_size);
    println!("  No. of erasable pages: {} pages", dci.num_erasable_pages);
    println!("  EEPROM size: {} bytes", dci.eeprom_size);
    println!("  Pin count: {} pins", dci.pin_count);

    println!("Device Information Area:");
    println!("  Microchip UID: {}", format_uid(&dia.mchp_uid));
    println!("  Optional Ext. UID: {}", format_uid(&dia.ext_uid));
    print_temp_coeffs("low range", &dia.low_temp_coeffs);
    print_temp_coeffs("high range", &dia.high_temp_coeffs);

    println!("Fixed Voltage Reference Data:");
    for (i, label) in ["1X", "2X", "4X"].iter().enumerate() {
        println!(
            "  ADC FVR1 Output Voltage {}: 0x{:04x} ({} mV)",
            label, dia.fixed_voltage_ref[i], dia.fixed_voltage_ref[i]
        );
    }
    for (i, label) in ["1X", "2X", "4X"].iter().enumerate() {
        println!(
            "  Comparator FVR2 Output Voltage {}: 0x{:04x} ({} mV)",
            label, dia.fixed_voltage_comp[i], dia.fixed_voltage_comp[i]
        );
    }
}
