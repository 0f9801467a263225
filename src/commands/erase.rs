//! Erase command: bulk erase selected regions

use picprog_core::icsp::Icsp;
use picprog_core::region::PIC18FQ20;

use crate::backends;
use crate::cli::Cli;
use crate::commands::parse_regions;

/// Run the erase command
pub fn run(cli: &Cli, sections: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let regions = parse_regions(sections)?;
    for region in PIC18FQ20.regions() {
        if regions.contains(region.name) && !region.writable {
            return Err(picprog_core::Error::NotWritable(region.name).into());
        }
    }

    let gpio = backends::open_gpio(cli)?;
    let mut icsp = Icsp::new(gpio, backends::icsp_pins(cli))?;
    let mut session = icsp.enter_programming()?;
    session.bulk_erase(regions)?;

    let names: Vec<&str> = regions.iter_names().map(|(name, _)| name).collect();
    println!("Erased: {}", names.join(", "));
    Ok(())
}
