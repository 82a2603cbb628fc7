//! Sparse word memory
//!
//! A PIC address space can span hundreds of thousands of words, but a hex
//! file or a device read usually touches only a few contiguous runs: program
//! code, a handful of config words and a little EEPROM. [`SparseMemoryStore`]
//! tracks exactly those runs as blocks.
//!
//! Invariant kept by every mutation: blocks are sorted by start address and
//! no two blocks overlap or touch. Touching runs are always merged.

use alloc::vec;
use alloc::vec::Vec;

use crate::range::AddressRange;

/// Something that can supply a contiguous run of words (e.g. a programmer)
pub trait WordSource {
    /// Error produced by the source
    type Error;

    /// Fill `buf` with the words at `range`
    ///
    /// `buf.len()` always equals `range.len()`.
    fn read_words(&mut self, range: AddressRange, buf: &mut [u16]) -> Result<(), Self::Error>;
}

/// Something that can accept a contiguous run of words (e.g. a programmer)
pub trait WordSink {
    /// Error produced by the sink
    type Error;

    /// Store `words` at `range`
    ///
    /// `words.len()` always equals `range.len()`.
    fn write_words(&mut self, range: AddressRange, words: &[u16]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    start: u32,
    words: Vec<u16>,
}

impl Block {
    fn post(&self) -> u32 {
        self.start + self.words.len() as u32
    }

    fn range(&self) -> AddressRange {
        AddressRange::new(self.start, self.post())
    }

    fn get(&self, addr: u32) -> Option<u16> {
        if addr >= self.start && addr < self.post() {
            Some(self.words[(addr - self.start) as usize])
        } else {
            None
        }
    }
}

/// Address-indexed word storage that only keeps populated extents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMemoryStore {
    blocks: Vec<Block>,
}

impl SparseMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Check whether no word is defined
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of defined words
    pub fn word_count(&self) -> usize {
        self.blocks.iter().map(|b| b.words.len()).sum()
    }

    /// Drop all blocks
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Word at `addr`, or `None` if it was never set
    pub fn get(&self, addr: u32) -> Option<u16> {
        let index = self.blocks.partition_point(|b| b.post() <= addr);
        self.blocks.get(index).and_then(|b| b.get(addr))
    }

    /// Word at `addr`, or `default` if it was never set
    pub fn get_or(&self, addr: u32, default: u16) -> u16 {
        self.get(addr).unwrap_or(default)
    }

    /// Set a single word
    pub fn set(&mut self, addr: u32, word: u16) {
        let index = self.blocks.partition_point(|b| b.post() < addr);

        if let Some(block) = self.blocks.get_mut(index) {
            if addr >= block.start && addr < block.post() {
                // Overwrite in place
                let offset = (addr - block.start) as usize;
                block.words[offset] = word;
                return;
            }
            if addr == block.post() {
                // Grow right, then absorb the next block if the gap closed
                block.words.push(word);
                if let Some(next) = self.blocks.get(index + 1) {
                    if next.start == addr + 1 {
                        let next = self.blocks.remove(index + 1);
                        self.blocks[index].words.extend_from_slice(&next.words);
                    }
                }
                return;
            }
            if addr + 1 == block.start {
                // Grow left
                block.words.insert(0, word);
                block.start = addr;
                return;
            }
        }

        self.blocks.insert(
            index,
            Block {
                start: addr,
                words: vec![word],
            },
        );
    }

    /// Set a contiguous run of words starting at `addr`
    ///
    /// Existing words in the run are overwritten; blocks touching the run on
    /// either side are merged with it.
    pub fn set_words(&mut self, addr: u32, words: &[u16]) {
        match words.len() {
            0 => return,
            1 => return self.set(addr, words[0]),
            _ => {}
        }
        let post = addr + words.len() as u32;

        // Blocks in lo..hi overlap or touch [addr, post)
        let lo = self.blocks.partition_point(|b| b.post() < addr);
        let hi = self.blocks.partition_point(|b| b.start <= post);

        if lo == hi {
            self.blocks.insert(
                lo,
                Block {
                    start: addr,
                    words: words.to_vec(),
                },
            );
            return;
        }

        if hi - lo == 1 {
            let block = &mut self.blocks[lo];
            if addr >= block.start && post <= block.post() {
                let offset = (addr - block.start) as usize;
                block.words[offset..offset + words.len()].copy_from_slice(words);
                return;
            }
        }

        let start = addr.min(self.blocks[lo].start);
        let end = post.max(self.blocks[hi - 1].post());
        let mut merged = vec![0u16; (end - start) as usize];
        for block in self.blocks.drain(lo..hi) {
            let offset = (block.start - start) as usize;
            merged[offset..offset + block.words.len()].copy_from_slice(&block.words);
        }
        let offset = (addr - start) as usize;
        merged[offset..offset + words.len()].copy_from_slice(words);

        self.blocks.insert(
            lo,
            Block {
                start,
                words: merged,
            },
        );
    }

    /// Fetch `range` from `source` as one run and merge it in
    ///
    /// This is the bulk path used when reading a whole device area.
    pub fn read_from<S: WordSource + ?Sized>(
        &mut self,
        source: &mut S,
        range: AddressRange,
    ) -> Result<(), S::Error> {
        if range.is_empty() {
            return Ok(());
        }
        let mut words = vec![0u16; range.len()];
        source.read_words(range, &mut words)?;
        log::trace!("memory: read {} word(s) at {}", words.len(), range);
        self.set_words(range.start(), &words);
        Ok(())
    }

    /// One range per block, in ascending order
    pub fn extents(&self) -> Vec<AddressRange> {
        self.blocks.iter().map(Block::range).collect()
    }

    /// Hand every defined word inside `range` to `sink`
    ///
    /// The sink sees one call per block that overlaps `range`, in ascending
    /// address order, and never a sub-range outside `range`. Returns the
    /// number of words written.
    pub fn write_to<S: WordSink + ?Sized>(
        &self,
        sink: &mut S,
        range: AddressRange,
    ) -> Result<usize, S::Error> {
        let mut count = 0;
        for block in &self.blocks {
            let overlap = range.intersection(&block.range());
            if overlap.is_empty() {
                continue;
            }
            let offset = (overlap.start() - block.start) as usize;
            sink.write_words(overlap, &block.words[offset..offset + overlap.len()])?;
            count += overlap.len();
        }
        Ok(count)
    }

    /// Iterate over `(address, word)` for every defined word
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| (b.start..).zip(b.words.iter().copied()))
    }
}
