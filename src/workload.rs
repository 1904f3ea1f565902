use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::mesi::{Access, Instr, Insts, ReadAddress, SystemSpec, Word};

/// Uniformly random accesses over all units, tags and offsets; one in four
/// is a write of a random value.
pub struct RandomWorkload {
    specs: SystemSpec,
    rng: StdRng,
}

impl RandomWorkload {
    pub fn new(specs: &SystemSpec, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        RandomWorkload { specs: specs.clone(), rng }
    }

    fn next_addr(&mut self) -> ReadAddress {
        let tag = self.rng.gen_range(0..self.specs.tags);
        let offset = self.rng.gen_range(0..self.specs.block_words);
        ReadAddress::from_parts(tag, offset)
    }

    fn next_value(&mut self) -> Option<Word> {
        if self.rng.gen_range(0..4) == 3 {
            Some(self.rng.gen_range(0..=self.specs.max_random))
        } else {
            None
        }
    }

    pub fn next_access(&mut self) -> Access {
        let unit = self.rng.gen_range(0..self.specs.cache_units);
        let addr = self.next_addr();
        Access { unit, addr, value: self.next_value() }
    }

    /// `count` instructions for each processor.
    pub fn instructions(&mut self, count: usize) -> Vec<Insts> {
        (0..self.specs.cache_units)
            .map(|_| {
                (0..count)
                    .map(|_| {
                        let addr = self.next_addr();
                        match self.next_value() {
                            Some(v) => Instr::Write(addr, v),
                            None => Instr::Read(addr),
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

impl Iterator for RandomWorkload {
    type Item = Access;

    fn next(&mut self) -> Option<Access> {
        Some(self.next_access())
    }
}
