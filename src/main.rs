//! picprog - PIC18F-Q20 ICSP programmer
//!
//! Programs PIC18F-Q20 microcontrollers over their In-Circuit Serial
//! Programming interface using bit-banged GPIO on a host SBC. The
//! protocol engine and data model live in `picprog-core`; this binary
//! wires them to the Linux GPIO character device and a small command
//! surface:
//!
//! - `info`  - device id, revision, DCI and DIA (or firmware file info)
//! - `dump`  - read regions and render them as a hexdump or Intel HEX
//! - `write` - program and verify an Intel HEX firmware file
//! - `erase` - bulk erase selected regions

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use picprog_core::Error;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match &cli.command {
        Commands::Info { file, headers } => commands::info::run(&cli, file.as_deref(), *headers),
        Commands::Dump {
            hex,
            section,
            output,
        } => commands::dump::run(&cli, *hex, section, output.as_deref()),
        Commands::Write { file, erase } => commands::write::run(&cli, file, erase),
        Commands::Erase { section } => commands::erase::run(&cli, section),
    };

    if let Err(e) = result {
        // A termination request is an orderly exit: the session teardown
        // already put the target back into normal operation.
        if matches!(e.downcast_ref::<Error>(), Some(Error::Interrupted)) {
            eprintln!("{}", e);
            return;
        }
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
