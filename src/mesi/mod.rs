mod bus;
mod cache;
mod common;
mod hierarchy;
mod memory;
mod policy;
mod processor;

pub use cache::{CacheLine, CacheUnit, UnitStats};
pub use common::*;
pub use hierarchy::{Located, MemoryHierarchy};
pub use memory::{Memory, MemoryView};
pub use policy::{FifoPolicy, ReplacementPolicy};
pub use processor::{Completed, Instr, Insts, ProcState, Processor, System};
