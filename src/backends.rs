//! GPIO backend construction
//!
//! Wires the CLI's pin assignment and GPIO chip selection to the Linux
//! backend, and registers the termination handler whose flag the
//! capability observes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use picprog_core::icsp::IcspPins;
use picprog_linux_gpio::LinuxGpio;

use crate::cli::Cli;

/// Open the GPIO chip named on the command line
///
/// SIGINT/SIGTERM set the termination flag; the next GPIO call fails
/// with `Interrupted` while the session teardown still runs.
pub fn open_gpio(cli: &Cli) -> Result<LinuxGpio, Box<dyn std::error::Error>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
    Ok(LinuxGpio::open(cli.gpiochip.clone(), interrupted)?)
}

/// Pin assignment from the command line options
pub fn icsp_pins(cli: &Cli) -> IcspPins {
    IcspPins {
        clk: cli.gpio_clk,
        data: cli.gpio_data,
        mclr: cli.gpio_mclr,
        prog_en: (!cli.no_prog_en).then_some(cli.gpio_prog_en),
    }
}
