use std::fmt;
use std::ops::RangeInclusive;
use rand::Rng;
use crate::error::{Error, Result};
use super::common::*;

/// Backing store: one block per tag. Blocks go in and come out as copies.
pub struct Memory {
    blocks: Vec<Block>,
    max_random: Word,
}

impl Memory {
    pub(crate) fn new(specs: &SystemSpec) -> Self {
        Memory {
            blocks: vec![Block::zeroed(specs.block_words); specs.tags],
            max_random: specs.max_random,
        }
    }

    /// Fills every word with a random value in `[0, max_random]`.
    pub fn populate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for block in self.blocks.iter_mut() {
            for offset in 0..block.len() {
                block.write(rng.gen_range(0..=self.max_random), offset);
            }
        }
    }

    pub fn read(&self, tag: usize) -> Result<Block> {
        self.blocks
            .get(tag)
            .cloned()
            .ok_or(Error::TagOutOfRange { tag, tags: self.blocks.len() })
    }

    pub fn write(&mut self, tag: usize, block: &Block) -> Result<()> {
        let tags = self.blocks.len();
        let slot = self.blocks.get_mut(tag).ok_or(Error::TagOutOfRange { tag, tags })?;
        *slot = block.clone();
        Ok(())
    }

    pub fn tags(&self) -> usize {
        self.blocks.len()
    }

    /// Tags within `lines / 2` of `center`, clipped to the tag space.
    pub fn window(&self, center: usize, lines: usize) -> RangeInclusive<usize> {
        let last = self.blocks.len() - 1;
        let start = center.saturating_sub(lines / 2).min(last);
        let end = center.saturating_add(lines / 2).min(last);
        start..=end
    }

    pub fn view(&self, center: usize, lines: usize) -> MemoryView<'_> {
        MemoryView { memory: self, range: self.window(center, lines) }
    }
}

/// A printable slice of memory, elided with `...` where it stops short of
/// either end of the tag space.
pub struct MemoryView<'a> {
    memory: &'a Memory,
    range: RangeInclusive<usize>,
}

impl fmt::Display for MemoryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.memory.blocks.len() - 1;
        writeln!(f, "memory:")?;
        if *self.range.start() != 0 { writeln!(f, "...")?; }
        for tag in self.range.clone() {
            writeln!(f, "#{tag:<4}| {}", self.memory.blocks[tag])?;
        }
        if *self.range.end() != last { writeln!(f, "...")?; }
        Ok(())
    }
}
