//! Error types for ardpicprog-core
//!
//! The core crate only has one failure mode: input that does not follow the
//! expected format. This covers malformed Intel HEX lines as well as bad
//! device range strings reported by the programmer.

use alloc::string::String;
use core::fmt;

/// What kind of input was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSource {
    /// A line of an Intel HEX file
    HexRecord,
    /// A device parameter such as `ProgramRange` or `DataBits`
    DeviceParameter,
}

/// Malformed hex file or device description
///
/// The message always names the offending fragment so it can be shown to the
/// user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    source: FormatSource,
    line: Option<usize>,
    message: String,
}

impl FormatError {
    /// Create an error for a hex file record
    ///
    /// `line` is 1-based; pass `None` when the error is not tied to a line
    /// (e.g. the input ended without an EOF record).
    pub fn hex(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            source: FormatSource::HexRecord,
            line,
            message: message.into(),
        }
    }

    /// Create an error for a device parameter
    pub fn device(message: impl Into<String>) -> Self {
        Self {
            source: FormatSource::DeviceParameter,
            line: None,
            message: message.into(),
        }
    }

    /// What kind of input was rejected
    pub fn source_kind(&self) -> FormatSource {
        self.source
    }

    /// Line number of the offending hex record, if known
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Human-readable cause
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.source, self.line) {
            (FormatSource::HexRecord, Some(line)) => {
                write!(f, "hex file format error at line {}: {}", line, self.message)
            }
            (FormatSource::HexRecord, None) => write!(f, "hex file format error: {}", self.message),
            (FormatSource::DeviceParameter, _) => {
                write!(f, "invalid device parameter: {}", self.message)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}

/// Result type alias using the core error type
pub type Result<T> = core::result::Result<T, FormatError>;
