//! Programmer workflows exercised against the mock target

use picprog_core::error::Error;
use picprog_core::firmware::{Firmware, FirmwareElement, FirmwareRegion};
use picprog_core::icsp::{Icsp, IcspPins, NoProgress};
use picprog_core::programmer::PicProgrammer;
use picprog_core::region::{RegionName, PIC18FQ20};
use picprog_mock::{MockHandle, MockPic};

fn setup() -> (Icsp<MockPic>, MockHandle) {
    let mock = MockPic::new(IcspPins::default());
    let handle = mock.handle();
    let icsp = Icsp::new(mock, IcspPins::default()).unwrap();
    (icsp, handle)
}

fn firmware_region(name: RegionName, elems: &[(u32, &[u8])]) -> FirmwareRegion {
    let region = *PIC18FQ20.find_by_name(name).unwrap();
    let mut fr = FirmwareRegion::new(region, region.start & 0xFFFF_0000);
    for (addr, data) in elems {
        fr.elems.push(FirmwareElement {
            base_addr: *addr,
            data: data.to_vec(),
        });
    }
    fr
}

#[test]
fn device_id_words_are_little_endian() {
    let (mut icsp, handle) = setup();
    handle.set_mem(0x3F_FFFC, 0xDE);
    handle.set_mem(0x3F_FFFD, 0xAD);
    handle.set_mem(0x3F_FFFE, 0xBE);
    handle.set_mem(0x3F_FFFF, 0xEF);
    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    let id = programmer.read_device_id().unwrap();
    assert_eq!(id.device_id, 0xEFBE);
    assert_eq!(id.revision_id, 0xADDE);
}

#[test]
fn known_device_id_resolves_model_and_revision() {
    let (mut icsp, handle) = setup();
    handle.set_mem(0x3F_FFFC, 0x42);
    handle.set_mem(0x3F_FFFD, 0xA0);
    handle.set_mem(0x3F_FFFE, 0x40);
    handle.set_mem(0x3F_FFFF, 0x7A);
    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    let id = programmer.read_device_id().unwrap();
    assert_eq!(id.device_id, 0x7A40);
    assert_eq!(id.revision_id, 0xA042);
    assert_eq!(id.model(), "PIC18F16Q20");
}

#[test]
fn dci_fields_decode() {
    let (mut icsp, handle) = setup();
    handle.set_mem(0x3C_0000, 0x80);
    handle.set_mem(0x3C_0001, 0x00);
    handle.set_mem(0x3C_0004, 0x00);
    handle.set_mem(0x3C_0005, 0x01);
    handle.set_mem(0x3C_0006, 0x00);
    handle.set_mem(0x3C_0007, 0x01);
    handle.set_mem(0x3C_0008, 0x14);
    handle.set_mem(0x3C_0009, 0x00);
    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    let dci = programmer.read_dci().unwrap();
    assert_eq!(dci.erase_page_size, 128);
    assert_eq!(dci.num_erasable_pages, 256);
    assert_eq!(dci.eeprom_size, 256);
    assert_eq!(dci.pin_count, 20);
}

#[test]
fn dia_fields_decode() {
    let (mut icsp, handle) = setup();
    handle.set_mem(0x2C_0000, 0x42);
    handle.set_mem(0x2C_0001, 0xA0);
    handle.set_mem(0x2C_0002, 0x40);
    handle.set_mem(0x2C_0003, 0x7A);
    handle.set_mem(0x2C_0024, 0x02);
    handle.set_mem(0x2C_0025, 0x01);
    handle.set_mem(0x2C_002C, 0x44);
    handle.set_mem(0x2C_002D, 0x33);
    handle.set_mem(0x2C_0032, 0xBB);
    handle.set_mem(0x2C_0033, 0xAA);
    handle.set_mem(0x2C_0036, 0x22);
    handle.set_mem(0x2C_0037, 0x11);
    handle.set_mem(0x2C_0038, 0x44);
    handle.set_mem(0x2C_0039, 0x33);
    handle.set_mem(0x2C_003A, 0xDD);
    handle.set_mem(0x2C_003B, 0xCC);
    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    let dia = programmer.read_dia().unwrap();
    assert_eq!(dia.mchp_uid[0], 0xA042);
    assert_eq!(dia.mchp_uid[1], 0x7A40);
    assert_eq!(dia.low_temp_coeffs.gain, 0x0102);
    assert_eq!(dia.high_temp_coeffs.adc_90, 0x3344);
    assert_eq!(dia.fixed_voltage_ref[1], 0xAABB);
    assert_eq!(dia.fixed_voltage_comp[0], 0x1122);
    assert_eq!(dia.fixed_voltage_comp[1], 0x3344);
    assert_eq!(dia.fixed_voltage_comp[2], 0xCCDD);
}

#[test]
fn program_verify_writes_sparse_image_and_leaves_gaps_erased() {
    let (mut icsp, handle) = setup();
    let fw: Firmware = vec![
        firmware_region(
            RegionName::PROGRAM,
            &[(0, &[0xDE, 0xAD, 0xBE, 0xEF]), (0x2120, &[0xAA, 0xBB, 0xCC, 0xDD])],
        ),
        firmware_region(
            RegionName::CONFIG,
            &[
                (
                    0x30_0000,
                    &[0xEC, 0x01, 0x02, 0x03, 0x9F, 0x40, 0x50, 0x7F, 0x66, 0x77, 0x88],
                ),
                (0x30_0018, &[0xDE, 0xAD]),
            ],
        ),
    ];

    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    programmer
        .program_verify(&fw, RegionName::empty(), &mut NoProgress)
        .unwrap();

    assert_eq!(
        (0..4).map(|i| handle.mem(i)).collect::<Vec<_>>(),
        [0xDE, 0xAD, 0xBE, 0xEF]
    );
    assert_eq!(
        (0..4).map(|i| handle.mem(0x2120 + i)).collect::<Vec<_>>(),
        [0xAA, 0xBB, 0xCC, 0xDD]
    );
    let config = handle.region(RegionName::CONFIG);
    assert_eq!(
        &config[..0x0B],
        [0xEC, 0x01, 0x02, 0x03, 0x9F, 0x40, 0x50, 0x7F, 0x66, 0x77, 0x88]
    );
    // Untouched after the single bulk erase
    assert_eq!(&config[0x0B..0x18], [0xFF; 13]);
    assert_eq!(&config[0x18..0x1A], [0xDE, 0xAD]);
}

#[test]
fn program_verify_erases_programmed_regions_and_extra_mask() {
    let (mut icsp, handle) = setup();
    // Stale contents everywhere
    handle.set_mem(0x0100, 0x55);
    handle.set_mem(0x38_0000, 0x66);
    handle.set_mem(0x20_0000, 0x77);
    let fw: Firmware = vec![firmware_region(RegionName::PROGRAM, &[(0, &[0x12, 0x34])])];

    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    programmer
        .program_verify(&fw, RegionName::EEPROM, &mut NoProgress)
        .unwrap();

    // PROGRAM was erased (it is being programmed), EEPROM by the extra
    // mask, USER kept its seed
    assert_eq!(handle.mem(0x0100), 0xFF);
    assert_eq!(handle.mem(0x38_0000), 0xFF);
    assert_eq!(handle.mem(0x20_0000), 0x77);
    assert_eq!(handle.mem(0), 0x12);
    assert_eq!(handle.mem(1), 0x34);
}

#[test]
fn program_verify_rejects_readonly_regions_before_touching_the_device() {
    let (mut icsp, handle) = setup();
    handle.set_mem(0x0000, 0x55);
    let fw: Firmware = vec![
        firmware_region(RegionName::PROGRAM, &[(0, &[0x12, 0x34])]),
        firmware_region(RegionName::DIA, &[(0x2C_0000, &[0x01, 0x02])]),
    ];

    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    let err = programmer
        .program_verify(&fw, RegionName::empty(), &mut NoProgress)
        .unwrap_err();
    assert_eq!(err, Error::NotWritable(RegionName::DIA));
    // No erase, no write happened
    assert_eq!(handle.mem(0x0000), 0x55);
}

#[test]
fn preloaded_firmware_reads_back_through_the_engine() {
    let (mut icsp, handle) = setup();
    let fw: Firmware = vec![firmware_region(
        RegionName::EEPROM,
        &[(0x38_0010, &[0xCA, 0xFE])],
    )];
    handle.load_firmware(&fw);
    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    let data = programmer
        .read_region(RegionName::EEPROM, &mut NoProgress)
        .unwrap();
    assert_eq!(&data[0x10..0x12], [0xCA, 0xFE]);
    assert_eq!(data[0x0F], 0xFF);
    assert_eq!(data[0x12], 0xFF);
}

#[test]
fn programmed_image_reads_back_identically() {
    let (mut icsp, handle) = setup();
    let payload = [0x08, 0x6F, 0x33, 0xEC, 0x16, 0xF0, 0xEC, 0x0E];
    let fw: Firmware = vec![firmware_region(RegionName::USER, &[(0x20_0000, &payload)])];

    let session = icsp.enter_programming().unwrap();
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);
    programmer
        .program_verify(&fw, RegionName::empty(), &mut NoProgress)
        .unwrap();
    let readback = programmer
        .read_region(RegionName::USER, &mut NoProgress)
        .unwrap();
    assert_eq!(&readback[..8], payload);
    assert_eq!(&readback[8..], vec![0xFF; 0x38]);
    drop(programmer);
    assert_eq!(handle.pin_level(IcspPins::default().mclr), Some(true));
}
