//! Intel HEX codec for word-oriented PIC memory
//!
//! Records are the standard `:LLAAAATT<data>CC` lines. Data payloads are
//! little-endian word pairs at even byte addresses; the word address is the
//! byte address divided by two.
//!
//! - [`parse`] turns hex text into a [`SparseMemoryStore`](crate::memory::SparseMemoryStore)
//! - [`HexWriter`] turns a [`HexImage`](crate::image::HexImage) back into hex text

mod parser;
mod writer;

pub use parser::parse;
pub use writer::HexWriter;

/// Data record
pub const RECORD_DATA: u8 = 0x00;
/// End Of File record
pub const RECORD_EOF: u8 = 0x01;
/// Extended Segment Address record (base = value << 4)
pub const RECORD_EXTENDED_SEGMENT_ADDRESS: u8 = 0x02;
/// Start Segment Address record (ignored)
pub const RECORD_START_SEGMENT_ADDRESS: u8 = 0x03;
/// Extended Linear Address record (base = value << 16)
pub const RECORD_EXTENDED_LINEAR_ADDRESS: u8 = 0x04;
/// Start Linear Address record (ignored)
pub const RECORD_START_LINEAR_ADDRESS: u8 = 0x05;

/// The terminating End Of File line
pub const EOF_LINE: &str = ":00000001FF\n";

/// Maximum number of words per data record on output
pub const WORDS_PER_LINE: u32 = 8;

/// Output flavour of the hex file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HexFormat {
    /// Pick from the device: 32-bit addressing for 16-bit program words,
    /// segment addressing otherwise
    #[default]
    Auto,
    /// 8-bit merged format, no extended address records
    Ihx8m,
    /// Extended Segment Address records below 1M
    Ihx16,
    /// Extended Linear Address records only
    Ihx32,
}

impl HexFormat {
    /// Resolve [`HexFormat::Auto`] against the program word width
    pub fn effective(self, program_bits: u32) -> HexFormat {
        match self {
            HexFormat::Auto if program_bits == 16 => HexFormat::Ihx32,
            other => other,
        }
    }
}

/// Two's complement of the low byte of the byte sum
///
/// Appending this to `bytes` makes the whole record sum to zero mod 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}
