//! ProgramPIC protocol constants
//!
//! Commands are ASCII lines terminated by `\n`. Simple replies are a single
//! `OK`, `ERROR ...` or `PENDING` line; device descriptions and catalogs
//! are lines terminated by a lone `.`; bulk transfers use packets made of a
//! length byte followed by that many payload bytes.

use std::time::Duration;

/// Version query, answered with a `ProgramPIC x.y` line
pub const CMD_VERSION: &str = "PROGRAM_PIC_VERSION";
/// Auto-detect the device in the socket
pub const CMD_DEVICE: &str = "DEVICE";
/// List the devices the programmer supports
pub const CMD_DEVICES: &str = "DEVICES";
/// Select a device by name
pub const CMD_SETDEVICE: &str = "SETDEVICE";
/// Read words as binary packets
pub const CMD_READBIN: &str = "READBIN";
/// Write words from binary packets
pub const CMD_WRITEBIN: &str = "WRITEBIN";
/// Write words given as hex literals
pub const CMD_WRITE: &str = "WRITE";
/// Bulk erase the device
pub const CMD_ERASE: &str = "ERASE";
/// Remove power from the socket
pub const CMD_PWROFF: &str = "PWROFF";

/// Allow writing the calibration words
pub const ARG_FORCE: &str = "FORCE";
/// Erase without preserving the calibration words
pub const ARG_NOPRESERVE: &str = "NOPRESERVE";

/// Success reply
pub const RESPONSE_OK: &str = "OK";
/// Long-running operation, keep waiting
pub const RESPONSE_PENDING: &str = "PENDING";
/// Terminator of multi-line replies
pub const RESPONSE_END: &str = ".";

/// Version prefix this session speaks
pub const VERSION_COMPATIBLE: &str = "ProgramPIC 1.";
/// Version prefix of any ProgramPIC firmware
pub const VERSION_ANY: &str = "ProgramPIC ";

/// Device ID reported by devices without an identifier
pub const DEVICE_ID_NONE: &str = "0000";
/// Device name that requests auto-detection
pub const DEVICE_NAME_AUTO: &str = "auto";

/// Receive timeout while polling for the version
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1000);
/// Receive timeout for everything after the handshake
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(3000);
/// Number of version polls before giving up
pub const VERSION_POLLS: usize = 5;

/// Maximum words per WRITEBIN packet
pub const WRITE_PACKET_WORDS: usize = 32;
/// WRITEBIN cannot carry exactly this many words; WRITE is used instead
pub const WRITE_LITERAL_WORDS: usize = 5;
/// Bytes requested from the transport per read
pub const READ_CHUNK: usize = 1024;

/// Format a word address or value as (at least) 4 uppercase hex digits
pub fn hex4(value: u32) -> String {
    format!("{:04X}", value)
}
