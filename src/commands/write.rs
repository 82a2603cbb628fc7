//! Write command implementation

use std::path::Path;

use ardpicprog_core::HexFormat;
use ardpicprog_serial::operations;

use super::{load_image, save_text, spinner};
use crate::programmers::Session;
use crate::CliError;

/// Options for the write command
pub struct WriteOptions<'a> {
    /// Input hex file
    pub input: &'a Path,
    /// Bulk erase before burning
    pub erase: bool,
    /// Overwrite the calibration words
    pub force_calibration: bool,
    /// Where to save a copy of the parsed input
    pub cc: Option<&'a Path>,
    /// Leave all-ones words out of the copy
    pub skip_ones: bool,
    /// Output format for the copy
    pub format: HexFormat,
}

/// Run the write command
pub fn run_write(
    session: &mut Session,
    device: &str,
    opts: &WriteOptions<'_>,
) -> Result<(), CliError> {
    let profile = operations::resolve_device(session, device)?;
    log::info!("{}", profile.describe());

    let image = load_image(opts.input, profile, opts.format)?;

    if let Some(cc) = opts.cc {
        save_text(cc, &image.save_cc(opts.skip_ones))?;
        log::info!("Saved copy of input to {}", cc.display());
    }

    if opts.erase {
        let pb = spinner("Erasing device...")?;
        let result = operations::erase(session, Some(&image), opts.force_calibration);
        pb.finish_and_clear();
        result?;
    }

    let pb = spinner("Burning device...")?;
    let result = operations::write_image(session, &image, opts.force_calibration);
    pb.finish_and_clear();
    let count = result?;

    println!("Burned {} word(s) from {}", count, opts.input.display());
    Ok(())
}
