//! Device parameters
//!
//! The programmer describes the device in its socket as a list of
//! `key: value` pairs (see [`DeviceDetails`]). [`DeviceProfile`] is the
//! parsed, immutable form of that description.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};

use crate::error::{FormatError, Result};
use crate::range::AddressRange;

/// Raw device description as reported by the programmer
pub type DeviceDetails = BTreeMap<String, String>;

/// Key holding the device name
pub const KEY_DEVICE_NAME: &str = "DeviceName";
/// Key holding the 4-digit device identifier
pub const KEY_DEVICE_ID: &str = "DeviceID";
/// Key holding the program memory range
pub const KEY_PROGRAM_RANGE: &str = "ProgramRange";
/// Key holding the program word width
pub const KEY_PROGRAM_BITS: &str = "ProgramBits";
/// Key holding the config (id words and fuses) range
pub const KEY_CONFIG_RANGE: &str = "ConfigRange";
/// Key holding the data memory range
pub const KEY_DATA_RANGE: &str = "DataRange";
/// Key holding the data word width
pub const KEY_DATA_BITS: &str = "DataBits";
/// Key holding the reserved (calibration) range
pub const KEY_RESERVED_RANGE: &str = "ReservedRange";

const DEFAULT_PROGRAM_START: u32 = 0x0001;
const DEFAULT_CONFIG_START: u32 = 0x2000;
const DEFAULT_DATA_START: u32 = 0x2100;
const DEFAULT_PROGRAM_BITS: u32 = 14;
const DEFAULT_DATA_BITS: u32 = 8;

/// The named memory areas of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    /// Program memory
    Program,
    /// Data memory (EEPROM)
    Data,
    /// ID words and configuration fuses
    Config,
}

impl AreaKind {
    /// Human-readable name used in progress messages
    pub fn description(self) -> &'static str {
        match self {
            Self::Program => "program memory",
            Self::Data => "data memory",
            Self::Config => "id words and fuses",
        }
    }
}

/// One named area together with its address range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryArea {
    /// Which area this is
    pub kind: AreaKind,
    /// Word addresses covered by the area
    pub range: AddressRange,
}

/// Immutable per-device parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    device_name: String,
    program_range: AddressRange,
    config_range: AddressRange,
    data_range: AddressRange,
    reserved_range: AddressRange,
    program_bits: u32,
    data_bits: u32,
}

impl DeviceProfile {
    /// Build a profile from the programmer's device description
    ///
    /// Missing or empty range values default to an empty range at the usual
    /// PIC16 location; the reserved range defaults to just past program
    /// memory. Word widths default to 14 (program) and 8 (data).
    pub fn from_details(details: &DeviceDetails) -> Result<Self> {
        let lookup = |key: &str| details.get(key).map(String::as_str);

        let device_name = lookup(KEY_DEVICE_NAME).unwrap_or_default().to_string();
        let program_range = parse_range_or_empty(lookup(KEY_PROGRAM_RANGE), DEFAULT_PROGRAM_START)?;
        let program_bits = parse_bits(lookup(KEY_PROGRAM_BITS), DEFAULT_PROGRAM_BITS, "program")?;
        let config_range = parse_range_or_empty(lookup(KEY_CONFIG_RANGE), DEFAULT_CONFIG_START)?;
        let data_range = parse_range_or_empty(lookup(KEY_DATA_RANGE), DEFAULT_DATA_START)?;
        let data_bits = parse_bits(lookup(KEY_DATA_BITS), DEFAULT_DATA_BITS, "data")?;
        let reserved_range =
            parse_range_or_empty(lookup(KEY_RESERVED_RANGE), program_range.post())?;

        Ok(Self {
            device_name,
            program_range,
            config_range,
            data_range,
            reserved_range,
            program_bits,
            data_bits,
        })
    }

    /// Device name, empty if the programmer did not report one
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Program memory range
    pub fn program_range(&self) -> AddressRange {
        self.program_range
    }

    /// ID words and fuses range
    pub fn config_range(&self) -> AddressRange {
        self.config_range
    }

    /// Data memory range
    pub fn data_range(&self) -> AddressRange {
        self.data_range
    }

    /// Reserved (calibration) range, at the tail of program memory
    pub fn reserved_range(&self) -> AddressRange {
        self.reserved_range
    }

    /// Program word width in bits
    pub fn program_bits(&self) -> u32 {
        self.program_bits
    }

    /// Data word width in bits
    pub fn data_bits(&self) -> u32 {
        self.data_bits
    }

    /// Size of data memory in bytes
    pub fn data_size_bytes(&self) -> u64 {
        u64::from(self.data_range.size()) * u64::from(self.data_bits) / 8
    }

    /// Word width at `addr`
    pub fn bits_at(&self, addr: u32) -> u32 {
        if self.data_range.contains(addr) {
            self.data_bits
        } else {
            self.program_bits
        }
    }

    /// Value of an erased word at `addr`
    ///
    /// This is `(1 << bits) - 1` for the width of the area containing the
    /// address, so a 14-bit program word is blank at `0x3FFF`, not `0xFFFF`.
    pub fn full_word_at(&self, addr: u32) -> u16 {
        let bits = self.bits_at(addr).min(16);
        ((1u32 << bits) - 1) as u16
    }

    /// Check whether `word` is the erased value for `addr`
    pub fn is_full_word(&self, addr: u32, word: u16) -> bool {
        word == self.full_word_at(addr)
    }

    /// Check whether `words`, starting at `start`, are all erased
    pub fn all_full_words(&self, start: u32, words: &[u16]) -> bool {
        (start..)
            .zip(words)
            .all(|(addr, &word)| self.is_full_word(addr, word))
    }

    /// The three areas in processing order: program, data, then config
    ///
    /// Data comes before config because a fuse write may enable data
    /// protection, which would then block verification of the data write.
    pub fn areas(&self) -> [MemoryArea; 3] {
        [
            MemoryArea {
                kind: AreaKind::Program,
                range: self.program_range,
            },
            MemoryArea {
                kind: AreaKind::Data,
                range: self.data_range,
            },
            MemoryArea {
                kind: AreaKind::Config,
                range: self.config_range,
            },
        ]
    }

    /// One-line summary of the device
    pub fn describe(&self) -> String {
        format!(
            "Device {}, program memory: {} words, data memory: {} bytes.",
            self.device_name,
            self.program_range.size(),
            self.data_size_bytes()
        )
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        let program_range = AddressRange::empty(DEFAULT_PROGRAM_START);
        Self {
            device_name: String::new(),
            program_range,
            config_range: AddressRange::empty(DEFAULT_CONFIG_START),
            data_range: AddressRange::empty(DEFAULT_DATA_START),
            reserved_range: AddressRange::empty(program_range.post()),
            program_bits: DEFAULT_PROGRAM_BITS,
            data_bits: DEFAULT_DATA_BITS,
        }
    }
}

/// Parse an inclusive `HEX-HEX` range string
pub fn parse_range(value: &str) -> Result<AddressRange> {
    let (start, end) = value
        .split_once('-')
        .ok_or_else(|| FormatError::device(format!("Invalid range '{}' (missing '-')", value)))?;
    let start = parse_hex(start).ok_or_else(|| {
        FormatError::device(format!("Invalid range '{}' (start not a number)", value))
    })?;
    let end = parse_hex(end).ok_or_else(|| {
        FormatError::device(format!("Invalid range '{}' (end not a number)", value))
    })?;
    Ok(AddressRange::with_end(start, end))
}

fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    u32::from_str_radix(s, 16).ok()
}

fn parse_range_or_empty(value: Option<&str>, empty_start: u32) -> Result<AddressRange> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_range(v),
        _ => Ok(AddressRange::empty(empty_start)),
    }
}

fn parse_bits(value: Option<&str>, default: u32, which: &str) -> Result<u32> {
    let bits = match value {
        Some(v) => v.trim().parse::<u32>().unwrap_or(0),
        None => default,
    };
    if bits < 1 {
        return Err(FormatError::device(format!(
            "Invalid {} word width {}",
            which,
            value.unwrap_or_default()
        )));
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(pairs: &[(&str, &str)]) -> DeviceDetails {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn pic16f628a() -> DeviceDetails {
        details(&[
            ("DeviceName", "pic16f628a"),
            ("ProgramRange", "0000-07FF"),
            ("ProgramBits", "14"),
            ("ConfigRange", "2000-2007"),
            ("DataRange", "2100-217F"),
            ("DataBits", "8"),
        ])
    }

    #[test]
    fn test_from_details() {
        let profile = DeviceProfile::from_details(&pic16f628a()).unwrap();
        assert_eq!(profile.device_name(), "pic16f628a");
        assert_eq!(profile.program_range(), AddressRange::new(0, 0x800));
        assert_eq!(profile.config_range(), AddressRange::new(0x2000, 0x2008));
        assert_eq!(profile.data_range(), AddressRange::new(0x2100, 0x2180));
        assert_eq!(profile.program_bits(), 14);
        assert_eq!(profile.data_bits(), 8);
        // No reserved words: empty range just past program memory
        assert!(profile.reserved_range().is_empty());
        assert_eq!(profile.reserved_range().start(), 0x800);
    }

    #[test]
    fn test_defaults() {
        let profile = DeviceProfile::from_details(&DeviceDetails::new()).unwrap();
        assert_eq!(profile, DeviceProfile::default());
        assert_eq!(profile.program_range(), AddressRange::empty(1));
        assert_eq!(profile.config_range(), AddressRange::empty(0x2000));
        assert_eq!(profile.data_range(), AddressRange::empty(0x2100));
        assert_eq!(profile.program_bits(), 14);
        assert_eq!(profile.data_bits(), 8);
    }

    #[test]
    fn test_empty_value_uses_default() {
        let profile = DeviceProfile::from_details(&details(&[("DataRange", "")])).unwrap();
        assert_eq!(profile.data_range(), AddressRange::empty(0x2100));
    }

    #[test]
    fn test_full_word_depends_on_area() {
        let profile = DeviceProfile::from_details(&pic16f628a()).unwrap();
        assert_eq!(profile.full_word_at(0x0000), 0x3FFF);
        assert_eq!(profile.full_word_at(0x2007), 0x3FFF);
        assert_eq!(profile.full_word_at(0x2100), 0x00FF);
        assert!(profile.is_full_word(0x10, 0x3FFF));
        assert!(!profile.is_full_word(0x10, 0xFFFF));
        assert!(profile.all_full_words(0x217E, &[0xFF, 0xFF, 0x3FFF]));
    }

    #[test]
    fn test_sixteen_bit_words() {
        let profile =
            DeviceProfile::from_details(&details(&[("ProgramBits", "16")])).unwrap();
        assert_eq!(profile.full_word_at(0), 0xFFFF);
    }

    #[test]
    fn test_reserved_range() {
        let mut d = details(&[("ProgramRange", "0000-03FF"), ("ReservedRange", "03FF-03FF")]);
        d.insert("DeviceName".to_string(), "pic12f675".to_string());
        let profile = DeviceProfile::from_details(&d).unwrap();
        assert_eq!(profile.reserved_range(), AddressRange::new(0x3FF, 0x400));
    }

    #[test]
    fn test_malformed_ranges() {
        for bad in ["0000", "xyz-0010", "0000-zz", "-0010", "0000-"] {
            let err = DeviceProfile::from_details(&details(&[("ProgramRange", bad)])).unwrap_err();
            assert_eq!(err.source_kind(), crate::error::FormatSource::DeviceParameter);
            assert!(err.message().contains(bad));
        }
    }

    #[test]
    fn test_invalid_bits() {
        assert!(DeviceProfile::from_details(&details(&[("ProgramBits", "0")])).is_err());
        assert!(DeviceProfile::from_details(&details(&[("DataBits", "abc")])).is_err());
    }

    #[test]
    fn test_areas_order() {
        let profile = DeviceProfile::from_details(&pic16f628a()).unwrap();
        let kinds: alloc::vec::Vec<_> = profile.areas().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, [AreaKind::Program, AreaKind::Data, AreaKind::Config]);
    }

    #[test]
    fn test_describe() {
        let profile = DeviceProfile::from_details(&pic16f628a()).unwrap();
        assert_eq!(
            profile.describe(),
            "Device pic16f628a, program memory: 2048 words, data memory: 128 bytes."
        );
    }

    #[test]
    fn test_data_size_wide_words() {
        let profile = DeviceProfile::from_details(&details(&[
            ("DataRange", "0000-FFFFFFFE"),
            ("DataBits", "4294967295"),
        ]))
        .unwrap();
        assert_eq!(
            profile.data_size_bytes(),
            0xFFFF_FFFFu64 * 0xFFFF_FFFF / 8
        );
        assert!(profile.describe().ends_with("data memory: 2305843008139952128 bytes."));
    }
}
