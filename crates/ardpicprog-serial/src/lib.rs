//! ardpicprog-serial - ProgramPIC protocol support
//!
//! This crate talks to PIC programmers running the ProgramPIC 1.x firmware
//! over a serial port or a TCP bridge.
//!
//! # Protocol Overview
//!
//! Commands are ASCII lines. The programmer answers with `OK`, `ERROR` or a
//! run of `PENDING` lines while it is busy; device descriptions and catalogs
//! are `key: value` lines ended by a lone `.`. Bulk reads and writes use
//! length-prefixed binary packets ended by a zero-length packet.
//!
//! # Supported Transports
//!
//! - Serial port: `/dev/ttyACM0`, `/dev/ttyUSB0`, `COM3`, etc.
//! - TCP socket: `ip=host:port`
//!
//! # Example
//!
//! ```no_run
//! use ardpicprog_serial::{open, operations, Connection};
//!
//! let conn = Connection::parse("/dev/ttyACM0")?;
//! let mut session = open(&conn, 9600)?;
//! let profile = operations::resolve_device(&mut session, "auto")?;
//! println!("{}", profile.describe());
//! let blank = operations::blank_check(&mut session, &profile)?;
//! println!("blank: {}", blank);
//! session.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod operations;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports
pub use error::{DeviceError, Error, ErrorKind, ProtocolError, Result};
pub use session::{DeviceWords, ProgrammerSession, SessionState};
pub use transport::serial::SerialTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;

/// Where the programmer is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyACM0" or "COM3")
        device: String,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl Connection {
    /// Parse a port string
    ///
    /// Formats:
    /// - `ip=host:port` - TCP connection
    /// - `dev=/dev/ttyACM0` or just `/dev/ttyACM0` - serial port
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port_str) = ip
                .rsplit_once(':')
                .ok_or_else(|| "Missing port in ip= parameter".to_string())?;
            let port = port_str
                .parse()
                .map_err(|_| format!("Invalid port: {}", port_str))?;
            if host.is_empty() {
                return Err("Missing host in ip= parameter".to_string());
            }
            return Ok(Connection::Tcp {
                host: host.to_string(),
                port,
            });
        }

        let device = s.strip_prefix("dev=").unwrap_or(s);
        if device.is_empty() {
            return Err("Empty serial port name".to_string());
        }
        Ok(Connection::Serial {
            device: device.to_string(),
        })
    }
}

/// Open a session and return it behind a type-erased transport
pub fn open(conn: &Connection, baud: u32) -> Result<ProgrammerSession<Box<dyn Transport>>> {
    let transport: Box<dyn Transport> = match conn {
        Connection::Serial { device } => Box::new(SerialTransport::open(device, baud)?),
        Connection::Tcp { host, port } => Box::new(TcpTransport::connect(host, *port)?),
    };
    ProgrammerSession::connect(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection() {
        assert_eq!(
            Connection::parse("/dev/ttyACM0").unwrap(),
            Connection::Serial {
                device: "/dev/ttyACM0".into()
            }
        );
        assert_eq!(
            Connection::parse("dev=COM3").unwrap(),
            Connection::Serial {
                device: "COM3".into()
            }
        );
        assert_eq!(
            Connection::parse("ip=192.168.1.20:2217").unwrap(),
            Connection::Tcp {
                host: "192.168.1.20".into(),
                port: 2217
            }
        );
        assert!(Connection::parse("ip=localhost").is_err());
        assert!(Connection::parse("ip=localhost:http").is_err());
        assert!(Connection::parse("").is_err());
    }
}
