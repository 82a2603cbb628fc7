//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ardpicprog")]
#[command(author, version, about = "PIC programmer client for ProgramPIC firmware", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Programmer port: a serial device, dev=<device>, ip=<host:port> or dummy
    #[arg(
        short,
        long,
        global = true,
        env = "PIC_PORT",
        default_value = "/dev/ttyACM0"
    )]
    pub port: String,

    /// Device type, or "auto" to detect the device in the socket
    #[arg(short, long, global = true, env = "PIC_DEVICE", default_value = "auto")]
    pub device: String,

    /// Serial port baud rate
    #[arg(long, global = true, default_value_t = 9600)]
    pub speed: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Hex file format options shared across commands
#[derive(clap::Args, Debug, Clone, Copy, Default)]
#[group(multiple = false)]
pub struct FormatArgs {
    /// Write 8-bit merged hex (no extended address records)
    #[arg(long)]
    pub ihx8m: bool,

    /// Write 16-bit hex with segment address records
    #[arg(long)]
    pub ihx16: bool,

    /// Write 32-bit hex with linear address records
    #[arg(long)]
    pub ihx32: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read device memory into a hex file
    Read {
        /// Output hex file path
        #[arg(short, long)]
        output: PathBuf,

        /// Leave out locations that read as all-ones
        #[arg(long)]
        skip_ones: bool,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Burn a hex file into the device
    Write {
        /// Input hex file path
        #[arg(short, long)]
        input: PathBuf,

        /// Erase the device before burning
        #[arg(long)]
        erase: bool,

        /// Overwrite the calibration words with the ones from the input
        #[arg(long)]
        force_calibration: bool,

        /// Also save a copy of the input, as parsed, to this file
        #[arg(long, value_name = "FILE")]
        cc: Option<PathBuf>,

        /// Leave all-ones locations out of the --cc copy
        #[arg(long)]
        skip_ones: bool,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Bulk erase the device and remove code protection
    Erase {
        /// Erase the calibration words too (needs --input with calibration data)
        #[arg(long, requires = "input")]
        force_calibration: bool,

        /// Hex file holding the calibration data
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Check whether the device is blank
    BlankCheck,

    /// Show the device in the socket
    Info,

    /// List devices supported by the programmer
    ListDevices,

    /// Re-save a hex file without a programmer attached
    Copy {
        /// Input hex file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output hex file path
        #[arg(short, long)]
        output: PathBuf,

        /// Leave out locations that are all-ones
        #[arg(long)]
        skip_ones: bool,

        #[command(flatten)]
        format: FormatArgs,
    },
}
