//! ardpicprog - PIC programmer client
//!
//! Drives a programmer running the ProgramPIC 1.x firmware to read, burn,
//! erase and blank check PIC microcontrollers using Intel HEX files.
//!
//! # Exit codes
//!
//! Failures map to sysexits-style codes so scripts can tell them apart:
//! usage 64, bad hex file or device description 65, file I/O 66,
//! programmer or protocol failure 74, wrong or missing device 76.

mod cli;
mod commands;
mod programmers;

use std::path::PathBuf;
use std::process::ExitCode;

use ardpicprog_core::{FormatError, HexFormat};
use ardpicprog_serial::ErrorKind;
use clap::Parser;
use cli::{Cli, Commands, FormatArgs};
use thiserror::Error;

const EXIT_USAGE: u8 = 64;
const EXIT_DATAERR: u8 = 65;
const EXIT_NOINPUT: u8 = 66;
const EXIT_SOFTWARE: u8 = 70;
const EXIT_IOERR: u8 = 74;
const EXIT_DEVICE: u8 = 76;

/// Everything a command can fail with
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad combination of arguments or malformed port string
    #[error("{0}")]
    Usage(String),

    /// Programmer, protocol or device failure
    #[error(transparent)]
    Programmer(#[from] ardpicprog_serial::Error),

    /// Malformed hex file
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Input or output file could not be accessed
    #[error("Could not access {}: {source}", .path.display())]
    File {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Progress display setup failed
    #[error(transparent)]
    Progress(#[from] indicatif::style::TemplateError),
}

impl CliError {
    /// Process exit code for this failure
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) => EXIT_USAGE,
            CliError::Format(_) => EXIT_DATAERR,
            CliError::File { .. } => EXIT_NOINPUT,
            CliError::Progress(_) => EXIT_SOFTWARE,
            CliError::Programmer(e) => match e.kind() {
                ErrorKind::Format => EXIT_DATAERR,
                ErrorKind::Device => EXIT_DEVICE,
                ErrorKind::Io => EXIT_NOINPUT,
                // All programmer-side failures share one code; scripts tell them
                // apart by the message, as with the classic ardpicprog tool
                ErrorKind::Protocol | ErrorKind::Setup | ErrorKind::Precondition => EXIT_IOERR,
            },
        }
    }
}

impl From<FormatArgs> for HexFormat {
    fn from(args: FormatArgs) -> Self {
        if args.ihx8m {
            HexFormat::Ihx8m
        } else if args.ihx16 {
            HexFormat::Ihx16
        } else if args.ihx32 {
            HexFormat::Ihx32
        } else {
            HexFormat::Auto
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            // Nothing sensible to do if stdout/stderr are gone
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Set log level based on verbosity
    match (cli.quiet, cli.verbose) {
        (true, _) => log::set_max_level(log::LevelFilter::Warn),
        (false, 0) => {} // default (info)
        (false, 1) => log::set_max_level(log::LevelFilter::Debug),
        (false, _) => log::set_max_level(log::LevelFilter::Trace),
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("ardpicprog: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    // The only command that works without a programmer
    if let Commands::Copy {
        input,
        output,
        skip_ones,
        format,
    } = &cli.command
    {
        return commands::run_copy(input, output, HexFormat::from(*format), *skip_ones);
    }

    let mut session = programmers::open_programmer(&cli.port, cli.speed)?;
    let device = cli.device.as_str();

    let result = match &cli.command {
        Commands::Read {
            output,
            skip_ones,
            format,
        } => commands::run_read(
            &mut session,
            device,
            output,
            HexFormat::from(*format),
            *skip_ones,
        ),
        Commands::Write {
            input,
            erase,
            force_calibration,
            cc,
            skip_ones,
            format,
        } => commands::run_write(
            &mut session,
            device,
            &commands::WriteOptions {
                input,
                erase: *erase,
                force_calibration: *force_calibration,
                cc: cc.as_deref(),
                skip_ones: *skip_ones,
                format: HexFormat::from(*format),
            },
        ),
        Commands::Erase {
            force_calibration,
            input,
        } => commands::run_erase(&mut session, device, input.as_deref(), *force_calibration),
        Commands::BlankCheck => commands::run_blank_check(&mut session, device),
        Commands::Info => commands::run_info(&mut session, device),
        Commands::ListDevices => commands::run_list_devices(&mut session),
        Commands::Copy { .. } => Ok(()),
    };

    programmers::close_programmer(session);
    log::info!("Done");
    result
}
