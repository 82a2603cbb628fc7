//! Error types for programmer sessions

use ardpicprog_core::FormatError;
use thiserror::Error;

/// Failures of the line/packet protocol
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A command was answered with something other than `OK`
    #[error("Response to command '{command}' not OK: '{response}'")]
    Command {
        /// The command line as sent, without the newline
        command: String,
        /// The first non-`PENDING` line received
        response: String,
    },

    /// A binary packet was not acknowledged with `OK`
    #[error("Packet response was '{0}'; expected 'OK'")]
    Packet(String),

    /// The transport ran dry (timeout or closed stream)
    #[error("Unexpected end of stream from programmer")]
    Eof,

    /// READBIN ended before the requested range was covered
    #[error("Could not fill entire buffer: got {got} of {wanted} word(s)")]
    ShortRead {
        /// Words received
        got: usize,
        /// Words requested
        wanted: usize,
    },
}

/// Failures resolving the device in the programmer socket
#[derive(Debug, Error)]
pub enum DeviceError {
    /// `DEVICE` failed: empty socket or no programming voltage
    #[error("No device in programmer or programming voltage not available: {0}")]
    NotFound(String),

    /// The programmer identified a different device than requested
    #[error("Expecting {expected} but found {found} in the programmer")]
    Mismatch {
        /// Requested device name
        expected: String,
        /// Reported device ID, or a description if there is none
        found: String,
    },

    /// The device reports an ID the programmer has no parameters for
    #[error("Unsupported device in programmer, ID = {0}")]
    Unsupported(String),

    /// `SETDEVICE` rejected the requested name
    #[error("Device {name} is not supported by the programmer.{catalog}")]
    NotSupported {
        /// Requested device name
        name: String,
        /// Supported device list, already formatted for display
        catalog: String,
    },

    /// Auto-detection requested but the device has no identifier
    #[error("Cannot autodetect: device in programmer does not have an identifier.")]
    AutodetectFailed,
}

/// Errors from talking to a ProgramPIC programmer
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed hex file or device description
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Protocol failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Device resolution failure
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Connection could not be established
    #[error("Programmer setup failed: {0}")]
    Setup(String),

    /// Operation refused before anything was sent
    #[error("{0}")]
    Precondition(String),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Flat classification of [`Error`] for mapping to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad hex file or device parameters
    Format,
    /// Programmer answered wrongly or not at all
    Protocol,
    /// Wrong, missing or unsupported device
    Device,
    /// Programmer could not be reached or is incompatible
    Setup,
    /// Operation refused before any wire traffic
    Precondition,
    /// Transport-level I/O
    Io,
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format(_) => ErrorKind::Format,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Device(_) => ErrorKind::Device,
            Error::Setup(_) | Error::Serial(_) => ErrorKind::Setup,
            Error::Precondition(_) => ErrorKind::Precondition,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type for programmer operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::from(ProtocolError::Eof).kind(), ErrorKind::Protocol);
        assert_eq!(
            Error::from(DeviceError::AutodetectFailed).kind(),
            ErrorKind::Device
        );
        assert_eq!(
            Error::from(FormatError::hex(Some(3), "bad")).kind(),
            ErrorKind::Format
        );
        assert_eq!(Error::Setup("x".into()).kind(), ErrorKind::Setup);
    }

    #[test]
    fn test_messages() {
        let err = Error::from(ProtocolError::Command {
            command: "ERASE".into(),
            response: "ERROR".into(),
        });
        assert_eq!(err.to_string(), "Response to command 'ERASE' not OK: 'ERROR'");

        let err = Error::from(DeviceError::Mismatch {
            expected: "pic16f84".into(),
            found: "0FC0".into(),
        });
        assert_eq!(
            err.to_string(),
            "Expecting pic16f84 but found 0FC0 in the programmer"
        );
    }
}
