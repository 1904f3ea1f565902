// The coherence bus: every cache observes every other cache's misses and
// writes. There is no bus object to own; the hierarchy iterates its units.

use crate::error::Result;
use crate::observer::{Event, FillSource};
use super::common::*;
use super::hierarchy::MemoryHierarchy;
use super::policy::ReplacementPolicy;

impl<P: ReplacementPolicy> MemoryHierarchy<P> {
    /// Read-snoop: peers flush a modified copy of `tag` and downgrade to shared.
    pub fn broadcast_read(&mut self, from: usize, tag: usize) -> Result<()> {
        self.events.emit(Event::ReadSnoop { unit: from, tag });
        self.broadcast(from, BusSignal::BusRd(tag))
    }

    /// Write-snoop: peers flush a modified copy of `tag` and invalidate it.
    pub fn broadcast_write(&mut self, from: usize, tag: usize) -> Result<()> {
        self.events.emit(Event::WriteSnoop { unit: from, tag });
        self.broadcast(from, BusSignal::BusRdX(tag))
    }

    fn broadcast(&mut self, from: usize, sig: BusSignal) -> Result<()> {
        let receivers = self.units
            .iter_mut()
            .filter(|u| u.id != from);
        for unit in receivers {
            unit.on_bus_sig(sig, &mut self.memory, &mut self.events)?;
        }
        Ok(())
    }

    /// Loads `tag` into line `index` of unit `from`, copying the block from
    /// the first peer holding a valid copy, or reading memory otherwise.
    pub(crate) fn fill_line(&mut self, from: usize, index: usize, tag: usize) -> Result<FillSource> {
        let peer = self.units
            .iter()
            .filter(|u| u.id != from)
            .find_map(|u| u.peer_copy(tag).map(|(i, block)| (u.id, i, block)));
        let (block, source) = match peer {
            Some((unit, i, block)) => (block, FillSource::Peer { unit, index: i }),
            None => {
                let block = self.memory.read(tag)?;
                self.events.emit(Event::MemoryRead { tag });
                (block, FillSource::Memory)
            },
        };
        self.units[from].load(index, tag, block, source, &mut self.events);
        Ok(source)
    }
}
