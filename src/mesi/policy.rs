use std::collections::VecDeque;
use log::trace;
use super::cache::CacheLine;

/// Chooses which line of a full cache unit gets evicted.
///
/// Each cache unit owns its own policy instance. A policy only sees which
/// lines were filled and when; it never looks at tags or data.
pub trait ReplacementPolicy {
    fn with_lines(lines: usize) -> Self where Self: Sized;

    /// Picks a victim among `lines`, all of which are valid.
    fn select_victim(&mut self, lines: &[CacheLine]) -> Option<usize>;

    /// Called once for every line that was just (re)loaded.
    fn on_fill(&mut self, index: usize);

    fn reset(&mut self);

    fn name(&self) -> &'static str;
}

/// First-in first-out replacement over a circular record of line indices
/// in load order. Hits never reorder the queue.
#[derive(Clone, Debug)]
pub struct FifoPolicy {
    queue: VecDeque<usize>,
    lines: usize,
}

impl FifoPolicy {
    pub fn new(lines: usize) -> Self {
        FifoPolicy { queue: VecDeque::with_capacity(lines), lines }
    }

    /// Queued line indices, oldest first.
    pub fn queue(&self) -> impl Iterator<Item = &usize> {
        self.queue.iter()
    }

    fn queue_string(&self) -> String {
        self.queue.iter().fold(String::from(">"), |s, i| format!("{s} {i} >"))
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn with_lines(lines: usize) -> Self {
        Self::new(lines)
    }

    fn select_victim(&mut self, _lines: &[CacheLine]) -> Option<usize> {
        trace!("fifo buffer: {}", self.queue_string());
        self.queue.pop_front()
    }

    fn on_fill(&mut self, index: usize) {
        // a line refilled after invalidation keeps its place in the queue
        if self.queue.contains(&index) {
            return;
        }
        debug_assert!(self.queue.len() < self.lines, "fifo overflow");
        self.queue.push_back(index);
        trace!("fifo buffer: {}", self.queue_string());
    }

    fn reset(&mut self) {
        self.queue.clear();
    }

    fn name(&self) -> &'static str {
        "FIFO"
    }
}
