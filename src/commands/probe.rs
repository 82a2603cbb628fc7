//! Info command implementation

use ardpicprog_serial::operations;

use crate::programmers::Session;
use crate::CliError;

/// Run the info command
pub fn run_info(session: &mut Session, device: &str) -> Result<(), CliError> {
    let profile = operations::resolve_device(session, device)?;

    println!("{}", profile.describe());
    println!();
    for area in profile.areas() {
        let range = area.range;
        if range.is_empty() {
            println!("  {:<20} none", area.kind.description());
        } else {
            println!(
                "  {:<20} {} ({} words)",
                area.kind.description(),
                range,
                range.size()
            );
        }
    }
    let reserved = profile.reserved_range();
    if !reserved.is_empty() {
        println!("  {:<20} {}", "calibration", reserved);
    }
    println!(
        "  {:<20} program {}, data {}",
        "word bits",
        profile.program_bits(),
        profile.data_bits()
    );
    Ok(())
}
