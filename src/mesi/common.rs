use std::fmt;
use serde::Deserialize;
use crate::error::{Error, Result};

// system specs

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SystemSpec {         // unit         reasonable defaults
    pub cache_units: usize,     // caches       4
    pub cache_sets: usize,      // lines        4
    pub block_words: usize,     // words        4
    pub tags: usize,            // blocks       256
    pub max_random: Word,       // value        999
    pub seed: Option<u64>,      // rng seed     none (entropy)
}

impl Default for SystemSpec {
    fn default() -> Self {
        SystemSpec {
            cache_units: 4,
            cache_sets: 4,
            block_words: 4,
            tags: 256,
            max_random: 999,
            seed: None,
        }
    }
}

impl SystemSpec {
    /// Rejects configurations the engine cannot start with.
    pub fn validate(&self) -> Result<()> {
        let zero = |name: &str| Err(Error::InvalidConfig(format!("{name} must be greater than zero")));
        if self.cache_units == 0 { return zero("cache_units"); }
        if self.cache_sets == 0 { return zero("cache_sets"); }
        if self.block_words == 0 { return zero("block_words"); }
        if self.tags == 0 { return zero("tags"); }
        Ok(())
    }

    pub fn check_unit(&self, unit: usize) -> Result<()> {
        if unit < self.cache_units {
            Ok(())
        } else {
            Err(Error::UnitOutOfRange { unit, units: self.cache_units })
        }
    }
}

// words and blocks

pub type Word = u32;

/// A fixed-width run of words. Blocks are handed over by value: whoever
/// receives one gets its own clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    words: Box<[Word]>,
}

impl Block {
    pub fn zeroed(block_words: usize) -> Self {
        Block { words: vec![0; block_words].into_boxed_slice() }
    }
    pub fn read(&self, offset: usize) -> Word {
        self.words[offset]
    }
    pub fn write(&mut self, value: Word, offset: usize) {
        self.words[offset] = value;
    }
    pub fn words(&self) -> &[Word] {
        &self.words
    }
    pub fn len(&self) -> usize {
        self.words.len()
    }
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, w) in self.words.iter().enumerate() {
            if i > 0 { write!(f, " ")?; }
            write!(f, "{w:>3}")?;
        }
        Ok(())
    }
}

// addresses

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReadAddress {
    tag: usize,
    offset: usize,
}

impl ReadAddress {
    /// Builds an address, rejecting tags and offsets outside the given specs.
    pub fn new(tag: usize, offset: usize, specs: &SystemSpec) -> Result<Self> {
        if tag >= specs.tags {
            return Err(Error::TagOutOfRange { tag, tags: specs.tags });
        }
        if offset >= specs.block_words {
            return Err(Error::OffsetOutOfRange { offset, block_words: specs.block_words });
        }
        Ok(ReadAddress { tag, offset })
    }
    // callers guarantee the bounds
    pub(crate) fn from_parts(tag: usize, offset: usize) -> Self {
        ReadAddress { tag, offset }
    }
    pub fn tag(&self) -> usize {
        self.tag
    }
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for ReadAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}[{}]", self.tag, self.offset)
    }
}

// line states

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MesiState {
    Modified,
    Exclusive,
    Shared,
    #[default]
    Invalid,
}

impl MesiState {
    pub fn is_valid(&self) -> bool {
        *self != MesiState::Invalid
    }
    pub fn letter(&self) -> char {
        match self {
            MesiState::Modified => 'M',
            MesiState::Exclusive => 'E',
            MesiState::Shared => 'S',
            MesiState::Invalid => 'I',
        }
    }
}

impl fmt::Display for MesiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// MESSAGE TYPES

// the bus signals that caches can receive as defined by the protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusSignal {
    BusRd(usize),
    BusRdX(usize),
}

impl BusSignal {
    pub fn tag(&self) -> usize {
        match self {
            BusSignal::BusRd(tag) | BusSignal::BusRdX(tag) => *tag,
        }
    }
}

/// One processor request: a read, or a write when `value` is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Access {
    pub unit: usize,
    pub addr: ReadAddress,
    pub value: Option<Word>,
}

impl Access {
    pub fn read(unit: usize, addr: ReadAddress) -> Self {
        Access { unit, addr, value: None }
    }
    pub fn write(unit: usize, addr: ReadAddress, value: Word) -> Self {
        Access { unit, addr, value: Some(value) }
    }
    pub fn is_write(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "P{} write {} <- {}", self.unit, self.addr, v),
            None => write!(f, "P{} read {}", self.unit, self.addr),
        }
    }
}
