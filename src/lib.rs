//! A MESI snooping-coherence simulator: private caches over one backing
//! memory, kept consistent by read and write snoops on a shared bus.

pub mod error;
pub mod mesi;
pub mod observer;
pub mod sim;
pub mod workload;

pub use error::{Error, Result};
