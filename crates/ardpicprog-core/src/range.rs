//! Word address ranges
//!
//! PIC memory is addressed in words, so every range in this crate is a
//! half-open interval of word addresses `[start, post)`.

use core::fmt;

/// A half-open interval of word addresses
///
/// Construction never fails: if the end lies before the start, the range
/// collapses to an empty range anchored at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    start: u32,
    post: u32,
}

impl AddressRange {
    /// Create the range `[start, post)`
    pub const fn new(start: u32, post: u32) -> Self {
        let post = if post < start { start } else { post };
        Self { start, post }
    }

    /// Create the range `[start, end]` from an inclusive end address
    pub const fn with_end(start: u32, end: u32) -> Self {
        Self::new(start, end.saturating_add(1))
    }

    /// Create the range `[start, start + size)`
    pub const fn with_size(start: u32, size: u32) -> Self {
        Self::new(start, start.saturating_add(size))
    }

    /// Create an empty range anchored at `start`
    pub const fn empty(start: u32) -> Self {
        Self { start, post: start }
    }

    /// First address in the range
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// First address past the end of the range
    pub const fn post(&self) -> u32 {
        self.post
    }

    /// Last address in the range, or `None` if the range is empty
    pub const fn end(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.post - 1)
        }
    }

    /// Number of words in the range
    pub const fn size(&self) -> u32 {
        self.post - self.start
    }

    /// Number of words in the range as a `usize`
    pub const fn len(&self) -> usize {
        self.size() as usize
    }

    /// Check whether the range covers no addresses
    pub const fn is_empty(&self) -> bool {
        self.start >= self.post
    }

    /// Check if an address is within this range
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.post
    }

    /// Check if this range shares at least one address with another
    pub const fn intersects(&self, other: &AddressRange) -> bool {
        self.start < other.post && self.post > other.start
    }

    /// Return the overlap of two ranges
    ///
    /// Disjoint ranges produce an empty range anchored at the larger of the
    /// two starts.
    pub fn intersection(&self, other: &AddressRange) -> AddressRange {
        AddressRange::new(self.start.max(other.start), self.post.min(other.post))
    }

    /// Iterate over every address in the range
    pub fn addresses(&self) -> core::ops::Range<u32> {
        self.start..self.post
    }
}

/// Formats as the inclusive `SSSS-EEEE` hex form the programmer expects
impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "{:04X}-{:04X}", self.start, end),
            None => write!(f, "empty@{:04X}", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_inverted_bounds_are_empty() {
        for (start, post) in [(10, 3), (1, 0), (0x2100, 0x2000), (u32::MAX, 0)] {
            let range = AddressRange::new(start, post);
            assert!(range.is_empty());
            assert_eq!(range.size(), 0);
            assert_eq!(range.start(), start);
        }
        assert!(AddressRange::with_end(0x0800, 0x07FF).is_empty());
    }

    #[test]
    fn test_constructors() {
        let r = AddressRange::with_end(0x2000, 0x2007);
        assert_eq!(r.start(), 0x2000);
        assert_eq!(r.post(), 0x2008);
        assert_eq!(r.size(), 8);
        assert_eq!(r.end(), Some(0x2007));
        assert_eq!(AddressRange::with_size(4, 6), AddressRange::new(4, 10));
        assert_eq!(AddressRange::empty(7).end(), None);
    }

    #[test]
    fn test_contains() {
        let r = AddressRange::new(4, 8);
        assert!(!r.contains(3));
        assert!(r.contains(4));
        assert!(r.contains(7));
        assert!(!r.contains(8));
        assert!(!AddressRange::empty(4).contains(4));
    }

    #[test]
    fn test_touching_ranges_do_not_intersect() {
        let a = AddressRange::new(0, 8);
        let b = AddressRange::new(8, 16);
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_empty());
        assert_eq!(a.intersection(&b).start(), 8);
    }

    #[test]
    fn test_disjoint_intersection_anchors_at_larger_start() {
        let a = AddressRange::new(0, 4);
        let b = AddressRange::new(10, 20);
        assert!(!a.intersects(&b));
        let i = b.intersection(&a);
        assert!(i.is_empty());
        assert_eq!(i.start(), 10);
    }

    #[test]
    fn test_overlapping_intersection() {
        let a = AddressRange::new(0, 10);
        let b = AddressRange::new(6, 20);
        assert!(a.intersects(&b));
        assert_eq!(a.intersection(&b), AddressRange::new(6, 10));
        assert_eq!(b.intersection(&a), AddressRange::new(6, 10));
    }

    #[test]
    fn test_display_is_inclusive_hex() {
        assert_eq!(AddressRange::with_end(0, 0x7FF).to_string(), "0000-07FF");
        assert_eq!(AddressRange::with_end(0x2100, 0x217F).to_string(), "2100-217F");
    }
}
