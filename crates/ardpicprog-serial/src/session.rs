//! ProgramPIC session
//!
//! [`ProgrammerSession`] owns a [`Transport`] and speaks the line-oriented
//! ProgramPIC 1.x protocol over it: version handshake, command exchange,
//! device selection and the binary READBIN/WRITEBIN sub-protocol.

use ardpicprog_core::device::{KEY_DEVICE_ID, KEY_DEVICE_NAME};
use ardpicprog_core::{AddressRange, DeviceDetails, WordSink, WordSource};

use crate::error::{DeviceError, Error, ProtocolError, Result};
use crate::protocol::*;
use crate::transport::Transport;

/// Connection state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport attached, nothing sent yet
    Disconnected,
    /// Polling for the firmware version
    Handshaking,
    /// Handshake done, commands may be issued
    Ready,
    /// Powered off and transport closed
    Closed,
}

/// A connection to a ProgramPIC programmer
///
/// Every operation is a blocking request/response exchange. The session is
/// not safe for concurrent use: share it between threads only behind an
/// external `Mutex`.
pub struct ProgrammerSession<T: Transport> {
    transport: T,
    state: SessionState,
    buffer: Vec<u8>,
    pos: usize,
}

impl<T: Transport> ProgrammerSession<T> {
    /// Attach to `transport` and perform the version handshake
    ///
    /// Polls with `PROGRAM_PIC_VERSION` up to 5 times at a 1 second timeout.
    /// A `ProgramPIC 1.x` reply completes the handshake; any other
    /// `ProgramPIC` version fails immediately.
    pub fn connect(transport: T) -> Result<Self> {
        let mut session = Self {
            transport,
            state: SessionState::Disconnected,
            buffer: Vec::with_capacity(READ_CHUNK),
            pos: 0,
        };
        session.handshake()?;
        Ok(session)
    }

    /// Current connection state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn handshake(&mut self) -> Result<()> {
        self.state = SessionState::Handshaking;
        self.transport.set_timeout(HANDSHAKE_TIMEOUT)?;

        for attempt in 1..=VERSION_POLLS {
            log::debug!("session: Requesting programmer version (attempt {})", attempt);
            self.write_line(CMD_VERSION)?;

            match self.read_line_raw()? {
                Some(response) if response.starts_with(VERSION_COMPATIBLE) => {
                    log::debug!("session: Found programmer version '{}'", response);
                    self.transport.set_timeout(COMMAND_TIMEOUT)?;
                    self.state = SessionState::Ready;
                    return Ok(());
                }
                Some(response) if response.starts_with(VERSION_ANY) => {
                    self.state = SessionState::Disconnected;
                    return Err(Error::Setup(format!(
                        "Programmer reported incompatible version '{}'",
                        response
                    )));
                }
                Some(response) if !response.is_empty() => {
                    log::warn!("session: Unexpected version response '{}'", response);
                }
                _ => log::warn!("session: Programmer did not respond with version"),
            }
        }

        self.state = SessionState::Disconnected;
        Err(Error::Setup(
            "Programmer did not respond with a compatible version string".into(),
        ))
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            state => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                format!("programmer session is not ready ({:?})", state),
            )
            .into()),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.transport.write(&data)
    }

    /// Next byte from the receive buffer, refilling from the transport
    ///
    /// Returns `None` when the transport has nothing more to give.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.pos >= self.buffer.len() {
            self.buffer.resize(READ_CHUNK, 0);
            let n = self.transport.read(&mut self.buffer)?;
            self.buffer.truncate(n);
            self.pos = 0;
            if n == 0 {
                return Ok(None);
            }
        }
        let byte = self.buffer[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?.ok_or(ProtocolError::Eof)?;
        }
        Ok(())
    }

    /// Read one line, dropping CR and NUL bytes
    ///
    /// Returns `None` if the stream ended before any byte arrived. A line cut
    /// short by the end of the stream is returned as-is.
    fn read_line_raw(&mut self) -> Result<Option<String>> {
        let mut line = Vec::new();
        let mut got_any = false;
        while let Some(byte) = self.read_byte()? {
            got_any = true;
            match byte {
                b'\n' => return Ok(Some(String::from_utf8_lossy(&line).into_owned())),
                b'\r' | 0x00 => {}
                b => line.push(b),
            }
        }
        if got_any {
            Ok(Some(String::from_utf8_lossy(&line).into_owned()))
        } else {
            Ok(None)
        }
    }

    fn read_line(&mut self) -> Result<String> {
        Ok(self.read_line_raw()?.ok_or(ProtocolError::Eof)?)
    }

    /// Send a command and wait for `OK`
    ///
    /// `PENDING` lines are skipped for as long as the firmware sends them.
    pub fn command(&mut self, args: &[&str]) -> Result<()> {
        self.ensure_ready()?;
        let command = args.join(" ");
        log::debug!("session: Command {}: issuing", command);
        self.write_line(&command)?;

        let response = loop {
            let line = self.read_line()?;
            if line != RESPONSE_PENDING {
                break line;
            }
            log::trace!("session: Command {}: pending", command);
        };

        if response != RESPONSE_OK {
            return Err(ProtocolError::Command { command, response }.into());
        }
        log::trace!("session: Command {}: OK", command);
        Ok(())
    }

    /// Read `key: value` lines up to the `.` terminator
    fn read_details(&mut self) -> Result<DeviceDetails> {
        let mut details = DeviceDetails::new();
        loop {
            let line = self.read_line()?;
            if line == RESPONSE_END {
                return Ok(details);
            }
            match line.split_once(':') {
                Some((key, value)) => {
                    let key = key.trim_matches(is_blank);
                    let value = value.trim_matches(is_blank);
                    log::trace!("session: Device detail {} -> {}", key, value);
                    details.insert(key.to_string(), value.to_string());
                }
                None => log::trace!("session: Ignoring device detail line '{}'", line),
            }
        }
    }

    /// Read lines up to the `.` terminator, each kept with its newline
    fn read_multiline(&mut self) -> Result<String> {
        let mut response = String::new();
        loop {
            let line = self.read_line()?;
            if line == RESPONSE_END {
                return Ok(response);
            }
            response.push_str(&line);
            response.push('\n');
        }
    }

    /// Resolve the device in the socket
    ///
    /// `requested` is a device name, or empty / `auto` to take whatever the
    /// programmer detects. Returns the device description to build a
    /// [`DeviceProfile`](ardpicprog_core::DeviceProfile) from.
    pub fn init_device(&mut self, requested: &str) -> Result<DeviceDetails> {
        if let Err(e) = self.command(&[CMD_DEVICE]) {
            return Err(DeviceError::NotFound(e.to_string()).into());
        }

        let details = self.read_details()?;
        let auto = requested.is_empty() || requested == DEVICE_NAME_AUTO;
        let name = details.get(KEY_DEVICE_NAME);
        let id = details
            .get(KEY_DEVICE_ID)
            .map(String::as_str)
            .filter(|id| *id != DEVICE_ID_NONE);

        if let Some(name) = name {
            if auto || name.eq_ignore_ascii_case(requested) {
                log::debug!("session: Using detected device {}", name);
                return Ok(details);
            }
            // A name with ID 0000 is a default that may be overridden below
            if details.get(KEY_DEVICE_ID).map(String::as_str) != Some(DEVICE_ID_NONE) {
                return Err(DeviceError::Mismatch {
                    expected: requested.to_string(),
                    found: id.unwrap_or("an unrecognized device").to_string(),
                }
                .into());
            }
        }

        if let Some(id) = id {
            return Err(DeviceError::Unsupported(id.to_string()).into());
        }

        if auto {
            return Err(DeviceError::AutodetectFailed.into());
        }

        match self.command(&[CMD_SETDEVICE, requested]) {
            Ok(()) => self.read_details(),
            Err(e) => {
                log::debug!("session: SETDEVICE {} failed: {}", requested, e);
                let catalog = match self.devices() {
                    Ok(list) => format!(" Supported devices:\n{}* = autodetected", list),
                    Err(_) => " Failed to list supported devices.".to_string(),
                };
                Err(DeviceError::NotSupported {
                    name: requested.to_string(),
                    catalog,
                }
                .into())
            }
        }
    }

    /// The programmer's device catalog, one device per line
    ///
    /// Autodetectable devices are marked with `*`.
    pub fn devices(&mut self) -> Result<String> {
        self.command(&[CMD_DEVICES])?;
        self.read_multiline()
    }

    /// Read the words of `range` into `buf` via READBIN
    ///
    /// `buf.len()` must equal `range.len()`.
    pub fn read_bin(&mut self, range: AddressRange, buf: &mut [u16]) -> Result<()> {
        let Some(end) = range.end() else {
            return Ok(());
        };
        let wanted = buf.len().min(range.len());
        let range_arg = format!("{}-{}", hex4(range.start()), hex4(end));
        self.command(&[CMD_READBIN, &range_arg])?;

        let mut filled = 0;
        let mut terminated = false;
        let mut packet = [0u8; 255];
        while filled < wanted {
            let len = self.read_byte()?.ok_or(ProtocolError::Eof)? as usize;
            if len == 0 {
                terminated = true;
                break;
            }
            self.read_exact(&mut packet[..len])?;
            log::trace!("session: READBIN packet of {} byte(s)", len);

            let words = (len / 2).min(wanted - filled);
            for (slot, pair) in buf[filled..filled + words]
                .iter_mut()
                .zip(packet.chunks_exact(2))
            {
                *slot = u16::from_le_bytes([pair[0], pair[1]]);
            }
            filled += words;
        }

        if filled < wanted {
            return Err(ProtocolError::ShortRead {
                got: filled,
                wanted,
            }
            .into());
        }

        // Consume anything up to and including the terminator packet
        while !terminated {
            let len = self.read_byte()?.ok_or(ProtocolError::Eof)? as usize;
            if len == 0 {
                terminated = true;
            } else {
                log::debug!("session: Discarding {} extra READBIN byte(s)", len);
                self.read_exact(&mut packet[..len])?;
            }
        }
        Ok(())
    }

    /// Write `words` starting at word address `start`
    ///
    /// Exactly 5 words go out as a `WRITE` command with hex literals; any
    /// other count is streamed with WRITEBIN in packets of up to 32 words.
    /// `force` allows overwriting the calibration words.
    pub fn write_bin(&mut self, start: u32, words: &[u16], force: bool) -> Result<()> {
        if words.is_empty() {
            return Ok(());
        }

        let mut args: Vec<String> = Vec::with_capacity(words.len() + 3);
        if force {
            args.push(ARG_FORCE.to_string());
        }
        args.push(hex4(start));

        if words.len() == WRITE_LITERAL_WORDS {
            args.extend(words.iter().map(|&w| hex4(u32::from(w))));
            let mut cmd = vec![CMD_WRITE];
            cmd.extend(args.iter().map(String::as_str));
            return self.command(&cmd);
        }

        let mut cmd = vec![CMD_WRITEBIN];
        cmd.extend(args.iter().map(String::as_str));
        self.command(&cmd)?;

        let mut packet = Vec::with_capacity(1 + WRITE_PACKET_WORDS * 2);
        for chunk in words.chunks(WRITE_PACKET_WORDS) {
            packet.clear();
            packet.push((chunk.len() * 2) as u8);
            for word in chunk {
                packet.extend_from_slice(&word.to_le_bytes());
            }
            self.write_packet(&packet)?;
        }
        self.write_packet(&[0])
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        log::trace!("session: Writing {} byte(s) as packet", packet.len());
        self.transport.write(packet)?;
        let response = self.read_line()?;
        if response != RESPONSE_OK {
            return Err(ProtocolError::Packet(response).into());
        }
        Ok(())
    }

    /// Bulk erase; `force` also erases the calibration words
    pub fn erase(&mut self, force: bool) -> Result<()> {
        if force {
            self.command(&[CMD_ERASE, ARG_NOPRESERVE])
        } else {
            self.command(&[CMD_ERASE])
        }
    }

    /// Power off the socket and close the transport
    ///
    /// A failing `PWROFF` is logged and does not stop the close.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        if self.transport.is_open() {
            if self.state == SessionState::Ready {
                if let Err(e) = self.command(&[CMD_PWROFF]) {
                    log::warn!("session: PWROFF failed: {}", e);
                }
            }
            self.transport.close()?;
        }
        self.state = SessionState::Closed;
        Ok(())
    }

    /// Word source reading through READBIN
    pub fn source(&mut self) -> DeviceWords<'_, T> {
        DeviceWords {
            session: self,
            force_calibration: false,
        }
    }

    /// Word sink writing through WRITEBIN/WRITE
    pub fn sink(&mut self, force_calibration: bool) -> DeviceWords<'_, T> {
        DeviceWords {
            session: self,
            force_calibration,
        }
    }
}

impl<T: Transport> Drop for ProgrammerSession<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("session: Close on drop failed: {}", e);
        }
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Device memory seen as a word source and sink
pub struct DeviceWords<'a, T: Transport> {
    session: &'a mut ProgrammerSession<T>,
    force_calibration: bool,
}

impl<T: Transport> WordSource for DeviceWords<'_, T> {
    type Error = Error;

    fn read_words(&mut self, range: AddressRange, buf: &mut [u16]) -> Result<()> {
        self.session.read_bin(range, buf)
    }
}

impl<T: Transport> WordSink for DeviceWords<'_, T> {
    type Error = Error;

    fn write_words(&mut self, range: AddressRange, words: &[u16]) -> Result<()> {
        self.session
            .write_bin(range.start(), words, self.force_calibration)
    }
}
