//! Dump command: read regions and render them

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use indicatif::{ProgressBar, ProgressStyle};

use picprog_core::dump::{Dumper, TextDumper};
use picprog_core::gpio::Gpio;
use picprog_core::hex::HexDumper;
use picprog_core::icsp::{Icsp, Progress, Session};
use picprog_core::region::{Region, RegionName, PIC18FQ20};

use crate::backends;
use crate::cli::Cli;

struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(total: u64, label: String) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(label);
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn on_progress(&mut self, byte_count: usize) {
        self.bar.inc(byte_count as u64);
    }
}

/// Run the dump command
pub fn run(
    cli: &Cli,
    hex: bool,
    sections: &[String],
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let regions = selected_regions(sections)?;

    let gpio = backends::open_gpio(cli)?;
    let mut icsp = Icsp::new(gpio, backends::icsp_pins(cli))?;
    let session = icsp.enter_programming()?;

    match output {
        Some(path) => {
            let out = BufWriter::new(File::create(path)?);
            dump_regions(session, &regions, hex, out)?;
        }
        None => {
            dump_regions(session, &regions, hex, io::stdout().lock())?;
        }
    }
    Ok(())
}

fn selected_regions(sections: &[String]) -> Result<Vec<&'static Region>, Box<dyn std::error::Error>> {
    if sections.is_empty() {
        return Ok(PIC18FQ20.regions().iter().collect());
    }
    let mut regions = Vec::with_capacity(sections.len());
    for name in sections {
        let name = RegionName::from_str(name)?;
        regions.push(PIC18FQ20.find_by_name(name)?);
    }
    Ok(regions)
}

fn dump_regions<G: Gpio, W: Write + 'static>(
    mut session: Session<'_, G>,
    regions: &[&Region],
    hex: bool,
    out: W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut dumper: Box<dyn Dumper> = if hex {
        Box::new(HexDumper::new(out))
    } else {
        Box::new(TextDumper::new(out))
    };

    dumper.dump_start()?;
    for region in regions {
        let mut progress = BarProgress::new(
            region.size() as u64,
            format!("Reading {}", region.name),
        );
        let data = session.read_region(region, &mut progress)?;
        progress.bar.finish_and_clear();
        dumper.dump_region(region, &data)?;
    }
    dumper.dump_end()?;
    Ok(())
}
