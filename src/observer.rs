// Notifications emitted by the coherence engine. The engine never depends on
// anyone consuming them.

use std::fmt;
use std::sync::{Arc, Mutex};
use log::{debug, info};
use crate::mesi::{MesiState, Word};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillSource {
    Memory,
    Peer { unit: usize, index: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    MemoryPopulated,
    Hit { unit: usize, tag: usize },
    Miss { unit: usize, tag: usize },
    ReadSnoop { unit: usize, tag: usize },
    WriteSnoop { unit: usize, tag: usize },
    StateChanged { unit: usize, index: usize, tag: usize, old: MesiState, new: MesiState },
    LineReplaced { unit: usize, index: usize, evicted_tag: usize },
    LineFilled { unit: usize, index: usize, tag: usize, source: FillSource },
    LineFlushed { unit: usize, tag: usize },
    WordWritten { unit: usize, index: usize, offset: usize, value: Word },
    MemoryRead { tag: usize },
    MemoryWrite { tag: usize },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::MemoryPopulated => write!(f, "memory populated with random values"),
            Event::Hit { unit, tag } => write!(f, "cache {unit}: hit on tag {tag}"),
            Event::Miss { unit, tag } => write!(f, "cache {unit}: miss on tag {tag}"),
            Event::ReadSnoop { unit, tag } => write!(f, "cache {unit}: read request for tag {tag} on bus"),
            Event::WriteSnoop { unit, tag } => write!(f, "cache {unit}: write request for tag {tag} on bus"),
            Event::StateChanged { unit, index, tag, old, new } =>
                write!(f, "cache {unit}: line #{index} (tag {tag}) {old} -> {new}"),
            Event::LineReplaced { unit, index, evicted_tag } =>
                write!(f, "cache {unit}: replacing line #{index} holding tag {evicted_tag}"),
            Event::LineFilled { unit, index, tag, source: FillSource::Memory } =>
                write!(f, "cache {unit}: line #{index} filled with tag {tag} from memory"),
            Event::LineFilled { unit, index, tag, source: FillSource::Peer { unit: peer, index: peer_index } } =>
                write!(f, "cache {unit}: line #{index} filled with tag {tag} copied from line #{peer_index} of cache {peer}"),
            Event::LineFlushed { unit, tag } => write!(f, "cache {unit}: writing back tag {tag} to memory"),
            Event::WordWritten { unit, index, offset, value } =>
                write!(f, "cache {unit}: line #{index} word {offset} set to {value}"),
            Event::MemoryRead { tag } => write!(f, "memory: read tag {tag}"),
            Event::MemoryWrite { tag } => write!(f, "memory: write tag {tag}"),
        }
    }
}

pub trait Observer: Send {
    fn notify(&mut self, event: &Event);
}

/// Collects every event into a shared list; clone the handle before
/// subscribing to read the events back.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl Observer for Recorder {
    fn notify(&mut self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Prints every event to stdout, the way the interactive shell narrates accesses.
pub struct Narrator;

impl Observer for Narrator {
    fn notify(&mut self, event: &Event) {
        println!("{event}");
    }
}

#[derive(Default)]
pub struct EventSink {
    observers: Vec<Box<dyn Observer>>,
}

impl EventSink {
    pub fn subscribe(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }
    pub fn emit(&mut self, event: Event) {
        match event {
            Event::MemoryPopulated => info!("{}", event),
            _ => debug!("{}", event),
        }
        for o in self.observers.iter_mut() {
            o.notify(&event);
        }
    }
}
