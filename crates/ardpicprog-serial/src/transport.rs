//! Transport layer abstraction for programmer communication
//!
//! This module provides a unified byte-stream interface over serial ports,
//! TCP sockets and in-process emulators.

use std::time::Duration;

use crate::error::Result;

/// Ordered byte stream to a programmer
pub trait Transport {
    /// Write all of `data`
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes
    ///
    /// Waits at most the current receive timeout. Returns the number of
    /// bytes read, or 0 if nothing arrived in time or the stream ended.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Set the receive timeout used by [`Transport::read`]
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Whether the transport has not been closed yet
    fn is_open(&self) -> bool;

    /// Close the transport; further reads and writes fail
    fn close(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_timeout(timeout)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

fn not_connected() -> crate::error::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "transport is closed").into()
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use crate::error::Error;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};

    /// Serial port transport
    pub struct SerialTransport {
        port: Option<Box<dyn SerialPort>>,
    }

    impl SerialTransport {
        /// Open a serial port at `baud`, 8N1 without flow control
        pub fn open(device: &str, baud: u32) -> Result<Self> {
            let port = serialport::new(device, baud)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(Duration::from_secs(1))
                .open()
                .map_err(|e| Error::Setup(format!("Could not open {}: {}", device, e)))?;

            log::info!("Opened serial port {} at {} baud", device, baud);

            Ok(Self { port: Some(port) })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            let port = self.port.as_mut().ok_or_else(not_connected)?;
            port.write_all(data)?;
            port.flush()?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let port = self.port.as_mut().ok_or_else(not_connected)?;
            match port.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(e.into()),
            }
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            let port = self.port.as_mut().ok_or_else(not_connected)?;
            port.set_timeout(timeout)?;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.port.is_some()
        }

        fn close(&mut self) -> Result<()> {
            if self.port.take().is_some() {
                log::debug!("Closed serial port");
            }
            Ok(())
        }
    }
}

pub mod tcp {
    //! TCP socket transport implementation

    use super::*;
    use crate::error::Error;
    use std::io::{Read, Write};
    use std::net::{Shutdown, TcpStream};

    /// TCP socket transport
    ///
    /// Useful with a serial-to-network bridge in front of the programmer.
    pub struct TcpTransport {
        stream: Option<TcpStream>,
    }

    impl TcpTransport {
        /// Connect to a programmer bridge at `host:port`
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to programmer at {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| Error::Setup(format!("Could not connect to {}: {}", addr, e)))?;

            stream
                .set_nodelay(true)
                .map_err(|e| Error::Setup(format!("Failed to set TCP_NODELAY: {}", e)))?;
            stream
                .set_read_timeout(Some(Duration::from_secs(1)))
                .map_err(|e| Error::Setup(format!("Failed to set read timeout: {}", e)))?;

            log::info!("Connected to programmer at {}", addr);

            Ok(Self {
                stream: Some(stream),
            })
        }
    }

    impl Transport for TcpTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            let stream = self.stream.as_mut().ok_or_else(not_connected)?;
            stream.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let stream = self.stream.as_mut().ok_or_else(not_connected)?;
            match stream.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(e.into()),
            }
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            let stream = self.stream.as_mut().ok_or_else(not_connected)?;
            stream.set_read_timeout(Some(timeout))?;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.stream.is_some()
        }

        fn close(&mut self) -> Result<()> {
            if let Some(stream) = self.stream.take() {
                // The peer may already be gone
                let _ = stream.shutdown(Shutdown::Both);
                log::debug!("Closed TCP connection");
            }
            Ok(())
        }
    }
}
