use std::collections::HashMap;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::error::{Error, Result};
use crate::observer::{Event, EventSink, FillSource, Observer};
use super::cache::{CacheUnit, UnitStats};
use super::common::*;
use super::memory::{Memory, MemoryView};
use super::policy::{FifoPolicy, ReplacementPolicy};

/// Result of locating a line for an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Located {
    pub index: usize,
    pub hit: bool,
    /// no peer held the block when it was filled; meaningless on a hit
    pub exclusive: bool,
}

/// Owns the backing memory and every cache unit, and routes snoops between
/// them. Independent hierarchies share nothing.
///
/// Accesses run one at a time to completion, snoops and write-backs
/// included. Callers that drive units from several threads must serialise
/// whole accesses (see [`crate::sim`]).
pub struct MemoryHierarchy<P = FifoPolicy> {
    specs: SystemSpec,
    pub(super) memory: Memory,
    pub(super) units: Vec<CacheUnit<P>>,
    pub(super) events: EventSink,
    rng: StdRng,
}

impl<P: ReplacementPolicy> MemoryHierarchy<P> {
    pub fn new(specs: SystemSpec) -> Result<Self> {
        specs.validate()?;
        let rng = match specs.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut hierarchy = Self {
            memory: Memory::new(&specs),
            units: (0..specs.cache_units).map(|i| CacheUnit::new(i, &specs)).collect(),
            events: EventSink::default(),
            rng,
            specs,
        };
        hierarchy.populate();
        info!("{} cache units initialized", hierarchy.units.len());
        Ok(hierarchy)
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.events.subscribe(Box::new(observer));
    }

    fn populate(&mut self) {
        self.memory.populate(&mut self.rng);
        self.events.emit(Event::MemoryPopulated);
    }

    /// Repopulates memory and returns every unit to its initial state.
    pub fn reset(&mut self) {
        self.populate();
        self.units.iter_mut().for_each(|u| u.reset());
        info!("memory hierarchy reset");
    }

    // accessors

    pub fn specs(&self) -> &SystemSpec {
        &self.specs
    }
    pub fn memory(&self) -> &Memory {
        &self.memory
    }
    /// Window of memory around `center`, which must be a valid tag.
    pub fn memory_view(&self, center: usize, lines: usize) -> Result<MemoryView<'_>> {
        self.address(center, 0)?;
        Ok(self.memory.view(center, lines))
    }
    pub fn units(&self) -> &[CacheUnit<P>] {
        &self.units
    }
    pub fn unit(&self, unit: usize) -> Result<&CacheUnit<P>> {
        self.specs.check_unit(unit)?;
        Ok(&self.units[unit])
    }
    pub fn stats(&self) -> UnitStats {
        let mut total = UnitStats::default();
        for u in self.units.iter() {
            total += u.stats();
        }
        total
    }

    pub fn address(&self, tag: usize, offset: usize) -> Result<ReadAddress> {
        ReadAddress::new(tag, offset, &self.specs)
    }

    // addresses may come from a hierarchy with other specs
    fn check(&self, unit: usize, addr: &ReadAddress) -> Result<()> {
        self.specs.check_unit(unit)?;
        ReadAddress::new(addr.tag(), addr.offset(), &self.specs).map(|_| ())
    }

    // accesses

    /// Finds or fills the line for `addr` in `unit`. Status is left to the caller.
    pub fn access(&mut self, unit: usize, addr: ReadAddress) -> Result<Located> {
        self.check(unit, &addr)?;
        let tag = addr.tag();
        if let Some(index) = self.units[unit].lookup(tag) {
            self.units[unit].stats.hits += 1;
            self.events.emit(Event::Hit { unit, tag });
            return Ok(Located { index, hit: true, exclusive: false });
        }
        self.units[unit].stats.misses += 1;
        self.events.emit(Event::Miss { unit, tag });

        self.broadcast_read(unit, tag)?;
        let index = self.units[unit].find_target_line(&mut self.memory, &mut self.events)?;
        let source = self.fill_line(unit, index, tag)?;
        Ok(Located { index, hit: false, exclusive: source == FillSource::Memory })
    }

    pub fn read(&mut self, unit: usize, addr: ReadAddress) -> Result<Word> {
        self.check(unit, &addr)?;
        debug!("cache {}: read {}", unit, addr);
        self.units[unit].stats.reads += 1;
        let loc = self.access(unit, addr)?;
        if !loc.hit {
            let state = if loc.exclusive { MesiState::Exclusive } else { MesiState::Shared };
            self.units[unit].set_state(loc.index, state, &mut self.events);
        }
        Ok(self.units[unit].line(loc.index).block.read(addr.offset()))
    }

    pub fn write(&mut self, unit: usize, addr: ReadAddress, value: Word) -> Result<Word> {
        self.check(unit, &addr)?;
        debug!("cache {}: write {} <- {}", unit, addr, value);
        self.units[unit].stats.writes += 1;
        let loc = self.access(unit, addr)?;
        self.units[unit].write_word(loc.index, addr.offset(), value, &mut self.events);
        // an exclusive hit has no peers to tell
        if !loc.hit || self.units[unit].line(loc.index).state == MesiState::Shared {
            self.broadcast_write(unit, addr.tag())?;
        }
        self.units[unit].set_state(loc.index, MesiState::Modified, &mut self.events);
        Ok(self.units[unit].line(loc.index).block.read(addr.offset()))
    }

    pub fn execute(&mut self, access: &Access) -> Result<Word> {
        match access.value {
            Some(value) => self.write(access.unit, access.addr, value),
            None => self.read(access.unit, access.addr),
        }
    }

    /// Checks the MESI invariants across all units: a modified or exclusive
    /// holder of a tag is its only valid holder, and no unit holds a tag twice.
    pub fn check_coherence(&self) -> Result<()> {
        let mut holders: HashMap<usize, Vec<(usize, MesiState)>> = HashMap::new();
        for u in self.units.iter() {
            for line in u.lines().iter().filter(|l| l.state.is_valid()) {
                holders.entry(line.tag).or_default().push((u.id, line.state));
            }
        }
        for (tag, holders) in holders {
            if holders.len() < 2 {
                continue;
            }
            let owner = holders
                .iter()
                .find(|(_, s)| matches!(s, MesiState::Modified | MesiState::Exclusive))
                .or_else(|| holders.iter().find(|(id, _)| holders.iter().filter(|(o, _)| o == id).count() > 1));
            if let Some(&(unit, state)) = owner {
                let &(other, other_state) = holders
                    .iter()
                    .find(|h| **h != (unit, state))
                    .unwrap_or(&(unit, state));
                return Err(Error::CoherenceViolation { tag, unit, state, other, other_state });
            }
        }
        Ok(())
    }
}
