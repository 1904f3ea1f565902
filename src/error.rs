use crate::mesi::MesiState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("tag {tag} out of range (tags: {tags})")]
    TagOutOfRange { tag: usize, tags: usize },

    #[error("offset {offset} out of range (block words: {block_words})")]
    OffsetOutOfRange { offset: usize, block_words: usize },

    #[error("cache unit {unit} out of range (units: {units})")]
    UnitOutOfRange { unit: usize, units: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal invariant violated in cache unit {unit}: {reason}")]
    InvariantViolation { unit: usize, reason: String },

    #[error("coherence violated for tag {tag}: unit {unit} holds {state} while unit {other} holds {other_state}")]
    CoherenceViolation {
        tag: usize,
        unit: usize,
        state: MesiState,
        other: usize,
        other_state: MesiState,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("simulation failed: {0}")]
    Simulation(String),
}
