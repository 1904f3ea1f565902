use std::fmt;
use crate::error::{Error, Result};
use crate::observer::{Event, EventSink, FillSource};
use super::common::*;
use super::memory::Memory;
use super::policy::{FifoPolicy, ReplacementPolicy};

// cache lines

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: usize,
    pub block: Block,
    pub state: MesiState,
}

impl CacheLine {
    pub fn new(block_words: usize) -> Self {
        CacheLine { tag: 0, block: Block::zeroed(block_words), state: MesiState::Invalid }
    }
    pub fn holds(&self, tag: usize) -> bool {
        self.tag == tag && self.state.is_valid()
    }
}

// statistics

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub peer_fills: u64,
    pub memory_fills: u64,
    pub evictions: u64,
    pub flushes: u64,
    pub invalidations: u64,
}

impl UnitStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

impl std::ops::AddAssign for UnitStats {
    fn add_assign(&mut self, o: Self) {
        self.reads += o.reads;
        self.writes += o.writes;
        self.hits += o.hits;
        self.misses += o.misses;
        self.peer_fills += o.peer_fills;
        self.memory_fills += o.memory_fills;
        self.evictions += o.evictions;
        self.flushes += o.flushes;
        self.invalidations += o.invalidations;
    }
}

// cache

/// One private cache: a fixed number of lines and its own replacement
/// policy. Lines only change through accesses issued on this unit or
/// through snoops delivered by the bus.
pub struct CacheUnit<P = FifoPolicy> {
    pub id: usize,
    lines: Vec<CacheLine>,
    policy: P,
    pub(crate) stats: UnitStats,
}

impl<P: ReplacementPolicy> CacheUnit<P> {
    pub fn new(id: usize, specs: &SystemSpec) -> Self {
        Self {
            id,
            lines: vec![CacheLine::new(specs.block_words); specs.cache_sets],
            policy: P::with_lines(specs.cache_sets),
            stats: UnitStats::default(),
        }
    }

    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }
    pub fn line(&self, index: usize) -> &CacheLine {
        &self.lines[index]
    }
    pub fn policy(&self) -> &P {
        &self.policy
    }
    pub fn stats(&self) -> UnitStats {
        self.stats
    }

    /// Index of the valid line holding `tag`, if any.
    pub fn lookup(&self, tag: usize) -> Option<usize> {
        self.lines.iter().position(|l| l.holds(tag))
    }

    /// State this unit holds `tag` in; `Invalid` when absent.
    pub fn state_of(&self, tag: usize) -> MesiState {
        self.lookup(tag).map_or(MesiState::Invalid, |i| self.lines[i].state)
    }

    /// A copy of the block of a valid line holding `tag`, with its index.
    pub fn peer_copy(&self, tag: usize) -> Option<(usize, Block)> {
        self.lookup(tag).map(|i| (i, self.lines[i].block.clone()))
    }

    /// First free line, or the policy's victim. A modified victim is
    /// written back before it is handed out.
    pub(crate) fn find_target_line(&mut self, memory: &mut Memory, events: &mut EventSink) -> Result<usize> {
        if let Some(index) = self.lines.iter().position(|l| !l.state.is_valid()) {
            return Ok(index);
        }
        let index = self.policy.select_victim(&self.lines).ok_or_else(|| Error::InvariantViolation {
            unit: self.id,
            reason: format!("{} policy has no victim for a full cache", self.policy.name()),
        })?;
        if index >= self.lines.len() {
            return Err(Error::InvariantViolation {
                unit: self.id,
                reason: format!("{} policy chose line {} of {}", self.policy.name(), index, self.lines.len()),
            });
        }
        self.stats.evictions += 1;
        events.emit(Event::LineReplaced { unit: self.id, index, evicted_tag: self.lines[index].tag });
        if self.lines[index].state == MesiState::Modified {
            self.flush(index, memory, events)?;
        }
        Ok(index)
    }

    /// Writes the line back to memory. The state is left to the caller.
    pub(crate) fn flush(&mut self, index: usize, memory: &mut Memory, events: &mut EventSink) -> Result<()> {
        let line = &self.lines[index];
        events.emit(Event::LineFlushed { unit: self.id, tag: line.tag });
        memory.write(line.tag, &line.block)?;
        events.emit(Event::MemoryWrite { tag: line.tag });
        self.stats.flushes += 1;
        Ok(())
    }

    pub(crate) fn set_state(&mut self, index: usize, state: MesiState, events: &mut EventSink) {
        let line = &mut self.lines[index];
        if line.state == state {
            return;
        }
        let old = line.state;
        line.state = state;
        events.emit(Event::StateChanged { unit: self.id, index, tag: line.tag, old, new: state });
    }

    /// Installs `block` for `tag` in line `index`; the state is set by the caller.
    pub(crate) fn load(&mut self, index: usize, tag: usize, block: Block, source: FillSource, events: &mut EventSink) {
        let line = &mut self.lines[index];
        line.tag = tag;
        line.block = block;
        match source {
            FillSource::Memory => self.stats.memory_fills += 1,
            FillSource::Peer { .. } => self.stats.peer_fills += 1,
        }
        self.policy.on_fill(index);
        events.emit(Event::LineFilled { unit: self.id, index, tag, source });
    }

    pub(crate) fn write_word(&mut self, index: usize, offset: usize, value: Word, events: &mut EventSink) {
        self.lines[index].block.write(value, offset);
        events.emit(Event::WordWritten { unit: self.id, index, offset, value });
    }

    // inputs

    /// Snoop handler for signals other caches put on the bus.
    pub(crate) fn on_bus_sig(&mut self, sig: BusSignal, memory: &mut Memory, events: &mut EventSink) -> Result<()> {
        let tag = sig.tag();
        for index in 0..self.lines.len() {
            if self.lines[index].tag != tag {
                continue;
            }
            if self.lines[index].state == MesiState::Modified {
                self.flush(index, memory, events)?;
            }
            match sig {
                BusSignal::BusRd(_) => {
                    if self.lines[index].state.is_valid() {
                        self.set_state(index, MesiState::Shared, events);    // downgrade
                    }
                },
                BusSignal::BusRdX(_) => {
                    if self.lines[index].state.is_valid() {
                        self.stats.invalidations += 1;
                    }
                    self.set_state(index, MesiState::Invalid, events);
                },
            }
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        let block_words = self.lines.first().map_or(0, |l| l.block.len());
        self.lines.iter_mut().for_each(|l| *l = CacheLine::new(block_words));
        self.policy.reset();
        self.stats = UnitStats::default();
    }
}

impl<P: ReplacementPolicy> fmt::Display for CacheUnit<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cache {} ({}):", self.id, self.policy.name())?;
        writeln!(f, "line\t|tag\t|state\t|data")?;
        for (i, line) in self.lines.iter().enumerate() {
            writeln!(f, "#{}\t|{}\t|{}\t|{}", i, line.tag, line.state, line.block)?;
        }
        Ok(())
    }
}
