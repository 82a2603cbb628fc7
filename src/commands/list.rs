//! List command implementation

use crate::programmers::Session;
use crate::CliError;

/// List the devices the programmer supports
pub fn run_list_devices(session: &mut Session) -> Result<(), CliError> {
    let devices = session.devices()?;
    println!("Supported devices:");
    print!("{}", devices);
    println!("* = autodetected");
    Ok(())
}
