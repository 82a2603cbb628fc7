//! Intel HEX writer

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use super::{
    checksum, HexFormat, EOF_LINE, RECORD_DATA, RECORD_EXTENDED_LINEAR_ADDRESS,
    RECORD_EXTENDED_SEGMENT_ADDRESS, WORDS_PER_LINE,
};
use crate::image::HexImage;
use crate::range::AddressRange;

/// Offset of the device ID word inside the config area
const DEVICE_ID_OFFSET: u32 = 6;

/// Words per 64K byte segment
const SEGMENT_WORDS: u32 = 0x8000;

/// Serializes a [`HexImage`] as Intel HEX text
///
/// The writer remembers the last extended address it emitted, so a record is
/// only written when a data line lands in a different 64K segment.
pub struct HexWriter<'a> {
    image: &'a HexImage,
    format: HexFormat,
    segment: Option<u32>,
    out: String,
}

impl<'a> HexWriter<'a> {
    /// Create a writer for `image` using its effective format
    pub fn new(image: &'a HexImage) -> Self {
        let format = image.effective_format();
        let segment = if needs_segments(image, format) {
            None
        } else {
            Some(0)
        };
        Self {
            image,
            format,
            segment,
            out: String::new(),
        }
    }

    /// Write program memory, config words and data memory, then End Of File
    ///
    /// On devices with at least 8 config words the device ID word is left out.
    pub fn save(mut self, skip_ones: bool) -> String {
        let profile = self.image.profile();
        let program = profile.program_range();
        let config = profile.config_range();
        let data = profile.data_range();

        self.emit_range(program, skip_ones);
        if !config.is_empty() {
            if config.size() >= 8 {
                let id_word = config.start() + DEVICE_ID_OFFSET;
                self.emit_range(AddressRange::new(config.start(), id_word), skip_ones);
                self.emit_range(AddressRange::new(id_word + 1, config.post()), skip_ones);
            } else {
                self.emit_range(config, skip_ones);
            }
        }
        self.emit_range(data, skip_ones);
        self.finish()
    }

    /// Write every populated extent in ascending order, then End Of File
    pub fn save_cc(mut self, skip_ones: bool) -> String {
        for extent in self.image.extents() {
            self.emit_range(extent, skip_ones);
        }
        self.finish()
    }

    fn finish(mut self) -> String {
        self.out.push_str(EOF_LINE);
        self.out
    }

    /// Emit `range`, optionally leaving out runs of erased words
    fn emit_range(&mut self, range: AddressRange, skip_ones: bool) {
        if !skip_ones {
            self.emit_words(range);
            return;
        }

        let post = range.post();
        let mut current = range.start();
        while current < post {
            while current < post && self.image.is_all_ones(current) {
                current += 1;
            }
            if current >= post {
                break;
            }
            let mut limit = current + 1;
            while limit < post && !self.image.is_all_ones(limit) {
                limit += 1;
            }
            self.emit_words(AddressRange::new(current, limit));
            current = limit;
        }
    }

    /// Emit every word of `range`, at most 8 per data record
    fn emit_words(&mut self, range: AddressRange) {
        let post = range.post();
        let mut current = range.start();
        while current < post {
            self.select_segment(current);

            // Lines never straddle a 64K byte boundary
            let boundary = (current / SEGMENT_WORDS + 1) * SEGMENT_WORDS;
            let line_post = post.min(current + WORDS_PER_LINE).min(boundary);

            let byte_address = (current << 1) as u16;
            let mut record: Vec<u8> = Vec::with_capacity(4 + 2 * WORDS_PER_LINE as usize);
            record.push(((line_post - current) * 2) as u8);
            record.extend_from_slice(&byte_address.to_be_bytes());
            record.push(RECORD_DATA);
            for addr in current..line_post {
                record.extend_from_slice(&self.image.word(addr).to_le_bytes());
            }
            self.write_record(&record);
            current = line_post;
        }
    }

    /// Emit an extended address record if `addr` is in a new segment
    fn select_segment(&mut self, addr: u32) {
        if self.format == HexFormat::Ihx8m {
            return;
        }
        let segment = (addr << 1) >> 16;
        if self.segment == Some(segment) {
            return;
        }

        let (record_type, value) = if segment < 16 && self.format != HexFormat::Ihx32 {
            (RECORD_EXTENDED_SEGMENT_ADDRESS, segment << 12)
        } else {
            (RECORD_EXTENDED_LINEAR_ADDRESS, segment)
        };
        let value = (value as u16).to_be_bytes();
        log::trace!("hex: segment 0x{:X} via record type {:02X}", segment, record_type);
        self.write_record(&[0x02, 0x00, 0x00, record_type, value[0], value[1]]);
        self.segment = Some(segment);
    }

    fn write_record(&mut self, record: &[u8]) {
        self.out.push(':');
        for byte in record {
            // Writing into a String cannot fail
            let _ = write!(self.out, "{:02X}", byte);
        }
        let _ = write!(self.out, "{:02X}", checksum(record));
        self.out.push('\n');
    }
}

/// Check whether any device area reaches past the first 64K bytes
fn needs_segments(image: &HexImage, format: HexFormat) -> bool {
    if format == HexFormat::Ihx8m {
        return false;
    }
    image
        .profile()
        .areas()
        .iter()
        .any(|area| u64::from(area.range.post()) * 2 > 0x10000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceDetails, DeviceProfile};
    use crate::hex::parse;
    use alloc::string::ToString;
    use alloc::sync::Arc;

    fn profile(pairs: &[(&str, &str)]) -> Arc<DeviceProfile> {
        let details: DeviceDetails = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(DeviceProfile::from_details(&details).unwrap())
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    fn assert_checksums(text: &str) {
        for line in text.lines() {
            let hex = &line[1..];
            let bytes: Vec<u8> = (0..hex.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
                .collect();
            let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            assert_eq!(sum, 0, "bad checksum on {}", line);
        }
    }

    #[test]
    fn test_skip_ones_splits_runs() {
        let profile = profile(&[("ProgramRange", "0000-0009"), ("ConfigRange", "2000-1FFF")]);
        let mut image = HexImage::new(profile, HexFormat::Auto);
        for addr in 0..10 {
            let word = if (2..6).contains(&addr) { 0x3FFF } else { 0x0001 };
            image.words_mut().set(addr, word);
        }

        let text = image.save_cc(true);
        assert_eq!(
            lines(&text),
            [
                ":0400000001000100FA",
                ":08000C000100010001000100E8",
                ":00000001FF",
            ]
        );
    }

    #[test]
    fn test_eight_words_per_line() {
        let profile = profile(&[("ProgramRange", "0000-0009")]);
        let mut image = HexImage::new(profile, HexFormat::Auto);
        image.words_mut().set_words(0, &[0; 10]);

        let text = image.save_cc(false);
        let out = lines(&text);
        assert_eq!(out.len(), 3);
        assert!(out[0].starts_with(":10000000"));
        assert!(out[1].starts_with(":04001000"));
        assert_checksums(&text);
    }

    #[test]
    fn test_undefined_words_written_erased() {
        let profile = profile(&[
            ("ProgramRange", "0000-0001"),
            ("ConfigRange", "2000-1FFF"),
            ("DataRange", "2100-20FF"),
        ]);
        let image = HexImage::new(profile, HexFormat::Auto);
        assert_eq!(image.save(false), ":04000000FF3FFF3F80\n:00000001FF\n");
        assert_eq!(image.save(true), EOF_LINE);
    }

    #[test]
    fn test_config_skips_device_id() {
        let profile = profile(&[
            ("ProgramRange", "0000-000F"),
            ("ConfigRange", "2000-2007"),
        ]);
        let mut image = HexImage::new(profile, HexFormat::Auto);
        image.words_mut().set_words(0x2000, &[1, 2, 3, 4, 5, 6, 0x0FC0, 8]);

        let text = image.save(true);
        assert_eq!(lines(&text).len(), 3);
        let reloaded = parse(&text).unwrap();
        assert_eq!(reloaded.get(0x0000), None);
        assert_eq!(reloaded.get(0x2005), Some(6));
        assert_eq!(reloaded.get(0x2006), None);
        assert_eq!(reloaded.get(0x2007), Some(8));
    }

    #[test]
    fn test_full_save_round_trip() {
        let profile = profile(&[
            ("ProgramRange", "0000-003F"),
            ("ConfigRange", "2000-2007"),
            ("DataRange", "2100-210F"),
        ]);
        let mut image = HexImage::new(profile.clone(), HexFormat::Auto);
        for area in profile.areas() {
            for addr in area.range.addresses() {
                image.words_mut().set(addr, (addr as u16) & 0xFF);
            }
        }

        let text = image.save(false);
        assert_checksums(&text);
        // Config and data live past 0x4000 bytes but below 64K, so no
        // extended address records are needed
        assert!(text.lines().all(|line| &line[7..9] != "02" && &line[7..9] != "04"));

        let reloaded = parse(&text).unwrap();
        for area in profile.areas() {
            for addr in area.range.addresses() {
                if addr == 0x2006 {
                    assert_eq!(reloaded.get(addr), None);
                } else {
                    assert_eq!(reloaded.get(addr), image.words().get(addr));
                }
            }
        }
    }

    #[test]
    fn test_segment_records_for_large_devices() {
        let profile = profile(&[
            ("ProgramRange", "0000-FFFF"),
            ("ProgramBits", "14"),
            ("ConfigRange", "2000-1FFF"),
            ("DataRange", "2100-20FF"),
        ]);
        let mut image = HexImage::new(profile, HexFormat::Ihx16);
        image.words_mut().set(0x0000, 0x0123);
        image.words_mut().set(0x8000, 0x0456);

        let text = image.save_cc(false);
        assert_eq!(
            lines(&text),
            [
                ":020000020000FC",
                ":020000002301DA",
                ":020000021000EC",
                ":020000005604A4",
                ":00000001FF",
            ]
        );
        let reloaded = parse(&text).unwrap();
        assert_eq!(reloaded.get(0x8000), Some(0x0456));
    }

    #[test]
    fn test_linear_records_for_ihx32() {
        let profile = profile(&[("ProgramRange", "0000-FFFF"), ("ProgramBits", "16")]);
        let mut image = HexImage::new(profile, HexFormat::Auto);
        image.words_mut().set(0x8000, 0x0456);

        let text = image.save_cc(false);
        assert_eq!(
            lines(&text),
            [":020000040001F9", ":020000005604A4", ":00000001FF"]
        );
    }

    #[test]
    fn test_lines_do_not_cross_segments() {
        let profile = profile(&[("ProgramRange", "0000-FFFF"), ("ProgramBits", "16")]);
        let mut image = HexImage::new(profile, HexFormat::Auto);
        image.words_mut().set_words(0x7FFE, &[1, 2, 3, 4]);

        let text = image.save_cc(false);
        let reloaded = parse(&text).unwrap();
        assert_eq!(reloaded.get(0x7FFF), Some(2));
        assert_eq!(reloaded.get(0x8000), Some(3));
        assert_eq!(reloaded.get(0x8001), Some(4));
        assert_eq!(reloaded.word_count(), 4);
    }

    #[test]
    fn test_ihx8m_has_no_extended_records() {
        let profile = profile(&[("ProgramRange", "0000-FFFF"), ("ProgramBits", "16")]);
        let mut image = HexImage::new(profile, HexFormat::Ihx8m);
        image.words_mut().set(0x8000, 0x0456);

        assert_eq!(image.save_cc(false), ":020000005604A4\n:00000001FF\n");
    }
}
