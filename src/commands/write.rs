//! Write command: program and verify a firmware file

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use picprog_core::firmware::Firmware;
use picprog_core::hex;
use picprog_core::icsp::{Icsp, Progress};
use picprog_core::programmer::PicProgrammer;
use picprog_core::region::PIC18FQ20;

use crate::backends;
use crate::cli::Cli;
use crate::commands::parse_regions;

/// Progress reporter using an indicatif progress bar
struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    fn new(total_bytes: u64) -> Self {
        let bar = ProgressBar::new(total_bytes);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Programming",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Progress for IndicatifProgress {
    fn on_progress(&mut self, byte_count: usize) {
        self.bar.inc(byte_count as u64);
    }
}

/// Run the write command
pub fn run(cli: &Cli, input: &Path, extra_erase: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(input)?);
    let fw: Firmware = hex::parse_hex(&PIC18FQ20, reader, true)?;
    let total_bytes: usize = fw.iter().map(|r| r.total_bytes()).sum();
    log::info!(
        "parsed {} regions ({} bytes) from {}",
        fw.len(),
        total_bytes,
        input.display()
    );

    let extra = parse_regions(extra_erase)?;

    let gpio = backends::open_gpio(cli)?;
    let mut icsp = Icsp::new(gpio, backends::icsp_pins(cli))?;
    let session = icsp.enter_programming()?;
    let mut programmer = PicProgrammer::new(session, PIC18FQ20);

    let mut progress = IndicatifProgress::new(total_bytes as u64);
    programmer.program_verify(&fw, extra, &mut progress)?;
    progress.bar.finish_with_message("done");

    println!("Programmed and verified {} bytes", total_bytes);
    Ok(())
}
