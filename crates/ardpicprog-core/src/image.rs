//! Hex file images
//!
//! A [`HexImage`] is what gets loaded from a hex file or read back from a
//! device: the words themselves, the device they belong to, and the hex
//! flavour to use when writing them out again.

use alloc::string::String;
use alloc::sync::Arc;

use crate::device::DeviceProfile;
use crate::error::Result;
use crate::hex::{self, HexFormat, HexWriter};
use crate::memory::SparseMemoryStore;
use crate::range::AddressRange;

/// Device contents plus the metadata needed to serialize them
#[derive(Debug, Clone)]
pub struct HexImage {
    profile: Arc<DeviceProfile>,
    format: HexFormat,
    words: SparseMemoryStore,
}

impl HexImage {
    /// Create an empty image
    pub fn new(profile: Arc<DeviceProfile>, format: HexFormat) -> Self {
        Self {
            profile,
            format,
            words: SparseMemoryStore::new(),
        }
    }

    /// Parse hex text into a new image
    pub fn load(profile: Arc<DeviceProfile>, format: HexFormat, input: &str) -> Result<Self> {
        let words = hex::parse(input)?;
        log::debug!(
            "image: loaded {} word(s) in {} extent(s)",
            words.word_count(),
            words.extents().len()
        );
        Ok(Self {
            profile,
            format,
            words,
        })
    }

    /// Device parameters
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Requested output format
    pub fn format(&self) -> HexFormat {
        self.format
    }

    /// Output format with `Auto` resolved against the device
    pub fn effective_format(&self) -> HexFormat {
        self.format.effective(self.profile.program_bits())
    }

    /// The underlying word store
    pub fn words(&self) -> &SparseMemoryStore {
        &self.words
    }

    /// Mutable access to the underlying word store
    pub fn words_mut(&mut self) -> &mut SparseMemoryStore {
        &mut self.words
    }

    /// Word at `addr`, reading undefined words as erased
    pub fn word(&self, addr: u32) -> u16 {
        self.words.get_or(addr, self.profile.full_word_at(addr))
    }

    /// Check whether the word at `addr` is erased (or undefined)
    pub fn is_all_ones(&self, addr: u32) -> bool {
        self.profile.is_full_word(addr, self.word(addr))
    }

    /// Check whether every word in `range` is erased (or undefined)
    pub fn is_blank(&self, range: AddressRange) -> bool {
        range.addresses().all(|addr| self.is_all_ones(addr))
    }

    /// Ranges actually populated, in ascending order
    pub fn extents(&self) -> alloc::vec::Vec<AddressRange> {
        self.words.extents()
    }

    /// Check whether the image justifies overwriting calibration words
    ///
    /// True when the device has no reserved words, or when at least one
    /// reserved word in the image is not erased (i.e. real calibration data
    /// is present).
    pub fn can_force_calibration(&self) -> bool {
        let reserved = self.profile.reserved_range();
        reserved.is_empty() || !self.is_blank(reserved)
    }

    /// Serialize the device areas (program, config, data)
    pub fn save(&self, skip_ones: bool) -> String {
        HexWriter::new(self).save(skip_ones)
    }

    /// Serialize only the populated extents
    pub fn save_cc(&self, skip_ones: bool) -> String {
        HexWriter::new(self).save_cc(skip_ones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceDetails;
    use alloc::string::ToString;

    fn profile(pairs: &[(&str, &str)]) -> Arc<DeviceProfile> {
        let details: DeviceDetails = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(DeviceProfile::from_details(&details).unwrap())
    }

    fn pic12f675() -> Arc<DeviceProfile> {
        profile(&[
            ("DeviceName", "pic12f675"),
            ("ProgramRange", "0000-03FF"),
            ("ConfigRange", "2000-2007"),
            ("DataRange", "2100-217F"),
            ("ReservedRange", "03FF-03FF"),
        ])
    }

    #[test]
    fn test_blank_program_range() {
        let profile = profile(&[("ProgramRange", "0000-000F"), ("ProgramBits", "14")]);
        let mut image = HexImage::new(profile.clone(), HexFormat::Auto);
        for addr in profile.program_range().addresses() {
            image.words_mut().set(addr, 0x3FFF);
        }
        assert!(image.is_blank(profile.program_range()));

        image.words_mut().set(5, 0x3FFE);
        assert!(!image.is_blank(profile.program_range()));
    }

    #[test]
    fn test_undefined_words_read_as_erased() {
        let image = HexImage::new(pic12f675(), HexFormat::Auto);
        assert_eq!(image.word(0x10), 0x3FFF);
        assert_eq!(image.word(0x2100), 0x00FF);
        assert!(image.is_all_ones(0x10));
    }

    #[test]
    fn test_can_force_calibration() {
        let mut image = HexImage::new(pic12f675(), HexFormat::Auto);
        assert!(!image.can_force_calibration());

        image.words_mut().set(0x3FF, 0x3FFF);
        assert!(!image.can_force_calibration());

        image.words_mut().set(0x3FF, 0x3480);
        assert!(image.can_force_calibration());
    }

    #[test]
    fn test_can_force_without_reserved_words() {
        let image = HexImage::new(profile(&[("ProgramRange", "0000-07FF")]), HexFormat::Auto);
        assert!(image.can_force_calibration());
    }

    #[test]
    fn test_load() {
        let image = HexImage::load(
            pic12f675(),
            HexFormat::Ihx16,
            ":0400000034127856E8\n:00000001FF\n",
        )
        .unwrap();
        assert_eq!(image.word(0), 0x1234);
        assert_eq!(image.format(), HexFormat::Ihx16);
        assert_eq!(image.extents(), [AddressRange::new(0, 2)]);
    }
}
