//! Read and copy command implementations

use std::path::Path;
use std::sync::Arc;

use ardpicprog_core::{DeviceProfile, HexFormat, HexImage};
use ardpicprog_serial::operations;

use super::{load_image, save_text, spinner};
use crate::programmers::Session;
use crate::CliError;

/// Run the read command
pub fn run_read(
    session: &mut Session,
    device: &str,
    output: &Path,
    format: HexFormat,
    skip_ones: bool,
) -> Result<(), CliError> {
    let profile = operations::resolve_device(session, device)?;
    log::info!("{}", profile.describe());

    let mut image = HexImage::new(profile, format);
    let pb = spinner("Reading device memory...")?;
    let result = operations::read_image(session, &mut image);
    pb.finish_and_clear();
    result?;

    save_text(output, &image.save(skip_ones))?;
    println!(
        "Wrote {} word(s) to {}",
        image.words().word_count(),
        output.display()
    );
    Ok(())
}

/// Run the copy command
///
/// Without a device there are no memory areas to fill in, so only the
/// words present in the input are written back out.
pub fn run_copy(
    input: &Path,
    output: &Path,
    format: HexFormat,
    skip_ones: bool,
) -> Result<(), CliError> {
    let image = load_image(input, Arc::new(DeviceProfile::default()), format)?;
    save_text(output, &image.save_cc(skip_ones))?;
    println!(
        "Copied {} word(s) from {} to {}",
        image.words().word_count(),
        input.display(),
        output.display()
    );
    Ok(())
}
