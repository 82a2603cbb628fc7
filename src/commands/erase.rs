//! Erase and blank check command implementations

use std::path::Path;

use ardpicprog_core::{HexFormat, HexImage};
use ardpicprog_serial::operations;

use super::{load_image, spinner};
use crate::programmers::Session;
use crate::CliError;

/// Run the erase command
///
/// `input` only supplies calibration data; it is required when
/// `force_calibration` is set.
pub fn run_erase(
    session: &mut Session,
    device: &str,
    input: Option<&Path>,
    force_calibration: bool,
) -> Result<(), CliError> {
    let profile = operations::resolve_device(session, device)?;
    log::info!("{}", profile.describe());

    let image: Option<HexImage> = match input {
        Some(path) => Some(load_image(path, profile, HexFormat::Auto)?),
        None => None,
    };

    let pb = spinner("Erasing device (this may take a while)...")?;
    let result = operations::erase(session, image.as_ref(), force_calibration);
    pb.finish_and_clear();
    result?;

    println!("Erase complete");
    Ok(())
}

/// Run the blank-check command
pub fn run_blank_check(session: &mut Session, device: &str) -> Result<(), CliError> {
    let profile = operations::resolve_device(session, device)?;
    log::info!("Checking whether device is blank");

    let pb = spinner("Blank checking...")?;
    let result = operations::blank_check(session, &profile);
    pb.finish_and_clear();

    if result? {
        println!("Device appears to be blank");
    } else {
        println!("Device appears to be NOT blank");
    }
    Ok(())
}
