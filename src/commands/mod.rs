//! CLI command implementations
//!
//! Each command opens the programmer (except `copy`), resolves the device
//! in the socket and then drives the whole-device operations from
//! `ardpicprog_serial::operations`.

mod erase;
mod list;
mod probe;
mod read;
mod write;

pub use erase::{run_blank_check, run_erase};
pub use list::run_list_devices;
pub use probe::run_info;
pub use read::{run_copy, run_read};
pub use write::{run_write, WriteOptions};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ardpicprog_core::{DeviceProfile, HexFormat, HexImage};
use indicatif::{ProgressBar, ProgressStyle};

use crate::CliError;

/// Read and parse a hex file for `profile`
fn load_image(
    path: &Path,
    profile: Arc<DeviceProfile>,
    format: HexFormat,
) -> Result<HexImage, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let image = HexImage::load(profile, format, &text)?;
    log::debug!(
        "Loaded {} word(s) from {}",
        image.words().word_count(),
        path.display()
    );
    Ok(image)
}

/// Write hex text to `path`
fn save_text(path: &Path, text: &str) -> Result<(), CliError> {
    fs::write(path, text).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })
}

/// Spinner for operations that report no incremental progress
fn spinner(message: &str) -> Result<ProgressBar, CliError> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
