//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "picprog")]
#[command(author, version, about = "PIC18F-Q20 ICSP programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// GPIO character device backing the ICSP header
    #[arg(long, default_value = "/dev/gpiochip0", global = true)]
    pub gpiochip: String,

    /// GPIO line for the ICSP CLK signal
    #[arg(long, default_value_t = 11, global = true)]
    pub gpio_clk: u32,

    /// GPIO line for the ICSP DATA signal
    #[arg(long, default_value_t = 10, global = true)]
    pub gpio_data: u32,

    /// GPIO line for the MCLR signal
    #[arg(long, default_value_t = 24, global = true)]
    pub gpio_mclr: u32,

    /// GPIO line for the PROG EN signal (external buffer enable)
    #[arg(long, default_value_t = 6, global = true)]
    pub gpio_prog_en: u32,

    /// Don't drive a PROG EN signal
    #[arg(long, global = true)]
    pub no_prog_en: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show device information, or firmware file information with --file
    Info {
        /// Describe this firmware file instead of querying the device
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the static region table and exit
        #[arg(long)]
        headers: bool,
    },

    /// Read regions from the device and render them
    Dump {
        /// Emit Intel HEX records instead of a hexdump
        #[arg(long)]
        hex: bool,

        /// Region names to dump (default: all)
        #[arg(short, long)]
        section: Vec<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Program a firmware file into the device, verifying each word
    Write {
        /// Input firmware file in Intel HEX format
        #[arg(short, long)]
        file: PathBuf,

        /// Additional region names to bulk erase on top of the
        /// programmed regions
        #[arg(short, long)]
        erase: Vec<String>,
    },

    /// Bulk erase regions without programming
    Erase {
        /// Region names to erase (EEPROM, PROGRAM, USER, CONFIG)
        #[arg(short, long, required = true)]
        section: Vec<String>,
    },
}
