//! Intel HEX parser

use alloc::format;
use alloc::vec::Vec;

use super::{
    checksum, RECORD_DATA, RECORD_EOF, RECORD_EXTENDED_LINEAR_ADDRESS,
    RECORD_EXTENDED_SEGMENT_ADDRESS, RECORD_START_LINEAR_ADDRESS, RECORD_START_SEGMENT_ADDRESS,
};
use crate::error::{FormatError, Result};
use crate::memory::SparseMemoryStore;

/// Parse hex text into a word store
///
/// Parsing stops at the first End Of File record; anything after it is never
/// looked at. Input that ends without one is rejected, as is any malformed
/// line. There is no partial result.
pub fn parse(input: &str) -> Result<SparseMemoryStore> {
    let mut store = SparseMemoryStore::new();
    let mut base_address: u32 = 0;

    for (index, line) in input.split('\n').enumerate() {
        let line_num = index + 1;
        let Some(bytes) = decode_line(line, line_num)? else {
            continue;
        };
        validate_size(&bytes, line_num)?;
        validate_checksum(&bytes, line_num)?;

        let declared_len = bytes[0];
        let payload = &bytes[4..bytes.len() - 1];

        match bytes[3] {
            RECORD_DATA => {
                if declared_len & 0x01 != 0 {
                    return Err(FormatError::hex(
                        Some(line_num),
                        format!("data length must be even, got {}", declared_len),
                    ));
                }
                let address = base_address + u32::from(u16::from_be_bytes([bytes[1], bytes[2]]));
                if address & 0x0001 != 0 {
                    return Err(FormatError::hex(
                        Some(line_num),
                        format!("address must be even, got 0x{:X}", address),
                    ));
                }
                let words: Vec<u16> = payload
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                store.set_words(address >> 1, &words);
            }
            RECORD_EOF => {
                if declared_len != 0 {
                    return Err(FormatError::hex(Some(line_num), "invalid end of file record"));
                }
                log::trace!("hex: end of file record at line {}", line_num);
                return Ok(store);
            }
            RECORD_EXTENDED_SEGMENT_ADDRESS => {
                if declared_len != 2 {
                    return Err(FormatError::hex(
                        Some(line_num),
                        "invalid segment address record",
                    ));
                }
                base_address = u32::from(u16::from_be_bytes([payload[0], payload[1]])) << 4;
            }
            RECORD_EXTENDED_LINEAR_ADDRESS => {
                if declared_len != 2 {
                    return Err(FormatError::hex(Some(line_num), "invalid linear address record"));
                }
                base_address = u32::from(u16::from_be_bytes([payload[0], payload[1]])) << 16;
            }
            RECORD_START_SEGMENT_ADDRESS | RECORD_START_LINEAR_ADDRESS => {}
            other => {
                return Err(FormatError::hex(
                    Some(line_num),
                    format!("invalid record type 0x{:02X}", other),
                ));
            }
        }
    }

    Err(FormatError::hex(None, "unexpected end of input"))
}

/// Strip whitespace and NULs and decode the hex digits after the colon
///
/// Returns `None` for lines that are blank after stripping.
fn decode_line(line: &str, line_num: usize) -> Result<Option<Vec<u8>>> {
    let mut chars = line
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | '\n' | '\0'));

    match chars.next() {
        None => return Ok(None),
        Some(':') => {}
        Some(c) => {
            return Err(FormatError::hex(
                Some(line_num),
                format!("line must start with ':', found '{}'", c),
            ));
        }
    }

    let mut bytes = Vec::with_capacity(line.len() / 2);
    let mut high: Option<u8> = None;
    for c in chars {
        let digit = c.to_digit(16).ok_or_else(|| {
            FormatError::hex(Some(line_num), format!("invalid hex character '{}'", c))
        })? as u8;
        match high.take() {
            None => high = Some(digit),
            Some(h) => bytes.push((h << 4) | digit),
        }
    }
    if high.is_some() {
        return Err(FormatError::hex(Some(line_num), "half byte at end of line"));
    }
    Ok(Some(bytes))
}

fn validate_size(bytes: &[u8], line_num: usize) -> Result<()> {
    if bytes.len() < 5 {
        return Err(FormatError::hex(Some(line_num), "line too short"));
    }
    let declared = bytes[0] as usize;
    if declared != bytes.len() - 5 {
        return Err(FormatError::hex(
            Some(line_num),
            format!(
                "line size is not correct: declared {} data byte(s), found {}",
                declared,
                bytes.len() - 5
            ),
        ));
    }
    Ok(())
}

fn validate_checksum(bytes: &[u8], line_num: usize) -> Result<()> {
    let (last, body) = bytes
        .split_last()
        .ok_or_else(|| FormatError::hex(Some(line_num), "line too short"))?;
    let expected = checksum(body);
    if expected != *last {
        return Err(FormatError::hex(
            Some(line_num),
            format!(
                "line checksum is not correct: expected {:02X}, found {:02X}",
                expected, last
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::AddressRange;

    #[test]
    fn test_parse_two_words() {
        let store = parse(":0400000034127856E8\n:00000001FF\n").unwrap();
        assert_eq!(store.get(0), Some(0x1234));
        assert_eq!(store.get(1), Some(0x5678));
        assert_eq!(store.extents(), [AddressRange::new(0, 2)]);
        assert_eq!(store.word_count(), 2);
    }

    #[test]
    fn test_whitespace_and_crlf() {
        let store = parse(" :04 0000 00 3412 7856 E8\r\n\r\n\t:00000001FF\r\n").unwrap();
        assert_eq!(store.get(1), Some(0x5678));
    }

    #[test]
    fn test_lowercase_digits() {
        let store = parse(":04000000abcdef0194\n:00000001ff\n").unwrap();
        assert_eq!(store.get(0), Some(0xCDAB));
        assert_eq!(store.get(1), Some(0x01EF));
    }

    #[test]
    fn test_stops_at_eof_record() {
        let store = parse(":0400000034127856E8\n:00000001FF\nthis is never read\n").unwrap();
        assert_eq!(store.word_count(), 2);
    }

    #[test]
    fn test_missing_eof() {
        let err = parse(":0400000034127856E8\n").unwrap_err();
        assert_eq!(err.line(), None);
        assert!(err.message().contains("unexpected end of input"));
        assert!(parse("").is_err());
    }

    #[test]
    fn test_bad_checksum() {
        let err = parse(":0400000034127856E9\n:00000001FF\n").unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert!(err.message().contains("checksum"));
    }

    #[test]
    fn test_size_mismatch() {
        let err = parse(":0600000034127856E6\n:00000001FF\n").unwrap_err();
        assert!(err.message().contains("size"));
        assert!(parse(":0000\n").is_err());
    }

    #[test]
    fn test_odd_digit_count() {
        let err = parse(":0400000034127856E8F\n:00000001FF\n").unwrap_err();
        assert!(err.message().contains("half byte"));
    }

    #[test]
    fn test_bad_characters() {
        assert!(parse("0400000034127856E8\n").is_err());
        assert!(parse(":04000000341278G6E8\n").is_err());
        assert!(parse(":0400:00034127856E8\n").is_err());
    }

    #[test]
    fn test_odd_length_data_rejected() {
        // 3 data bytes, correct checksum
        let err = parse(":03000000010203F7\n:00000001FF\n").unwrap_err();
        assert!(err.message().contains("even"));
    }

    #[test]
    fn test_odd_address_rejected() {
        let err = parse(":020001000102FA\n:00000001FF\n").unwrap_err();
        assert!(err.message().contains("address must be even"));
    }

    #[test]
    fn test_invalid_eof_record() {
        assert!(parse(":02000001AAAAA9\n").is_err());
    }

    #[test]
    fn test_unknown_record_type() {
        let err = parse(":0000000AF6\n:00000001FF\n").unwrap_err();
        assert!(err.message().contains("record type"));
    }

    #[test]
    fn test_extended_linear_address() {
        // Base 0x00010000 bytes -> word 0x8000
        let input = ":020000040001F9\n:02000000FFFF00\n:00000001FF\n";
        let store = parse(input).unwrap();
        assert_eq!(store.get(0x8000), Some(0xFFFF));
        assert_eq!(store.get(0), None);
    }

    #[test]
    fn test_extended_segment_address() {
        // Segment 0x1000 -> base 0x10000 bytes -> word 0x8000; persists across records
        let input = ":020000021000EC\n:020000000100FD\n:020002000200FA\n:00000001FF\n";
        let store = parse(input).unwrap();
        assert_eq!(store.get(0x8000), Some(0x0001));
        assert_eq!(store.get(0x8001), Some(0x0002));
    }

    #[test]
    fn test_start_address_records_ignored() {
        let input = ":0400000300000000F9\n:0400000500000000F7\n:020000000100FD\n:00000001FF\n";
        let store = parse(input).unwrap();
        assert_eq!(store.get(0), Some(1));
    }

    #[test]
    fn test_overlapping_records_merge() {
        let input = ":0400000001000200F9\n:0400040003000400F1\n:00000001FF\n";
        let store = parse(input).unwrap();
        assert_eq!(store.extents(), [AddressRange::new(0, 4)]);
        assert_eq!(store.get(3), Some(4));
    }
}
