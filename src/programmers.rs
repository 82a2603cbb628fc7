//! Programmer connection and dispatch
//!
//! The `--port` value picks the transport: `dummy` opens the in-memory
//! emulator (when built with the `dummy` feature), anything else is handed
//! to [`Connection::parse`] as a serial device or TCP address.

use ardpicprog_serial::{Connection, ProgrammerSession, Transport};

use crate::CliError;

#[cfg(feature = "dummy")]
/// Port name that selects the in-memory emulator
pub const DUMMY_PORT: &str = "dummy";

/// Session over any of the supported transports
pub type Session = ProgrammerSession<Box<dyn Transport>>;

/// Open the programmer on `port` and complete the version handshake
pub fn open_programmer(port: &str, speed: u32) -> Result<Session, CliError> {
    log::info!("Initializing programmer ...");

    #[cfg(feature = "dummy")]
    if port == DUMMY_PORT {
        log::debug!("Using emulated programmer");
        let transport: Box<dyn Transport> =
            Box::new(ardpicprog_dummy::DummyProgrammer::new_default());
        return Ok(ProgrammerSession::connect(transport)?);
    }

    let conn = Connection::parse(port).map_err(CliError::Usage)?;
    match &conn {
        Connection::Serial { device } => log::debug!("Opening {} at {} baud", device, speed),
        Connection::Tcp { host, port } => log::debug!("Connecting to {}:{}", host, port),
    }
    Ok(ardpicprog_serial::open(&conn, speed)?)
}

/// Power down and release the programmer
///
/// Close problems are reported but never override the command's own result.
pub fn close_programmer(mut session: Session) {
    log::info!("Closing programmer...");
    if let Err(e) = session.close() {
        log::warn!("Problem while closing programmer port: {}", e);
    }
}
