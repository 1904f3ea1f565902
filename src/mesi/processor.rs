use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use asynchronix::model::{Model, Requestor};
use asynchronix::time::Scheduler;
use log::{debug, warn};
use crate::error::{Error, Result};
use super::common::*;
use super::hierarchy::MemoryHierarchy;
use super::policy::ReplacementPolicy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    Read(ReadAddress),
    Write(ReadAddress, Word),
    Other(u32),
}

pub type Insts = VecDeque<Instr>;

/// An access a processor finished, stamped with the cycle it was issued in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completed {
    pub cycle: u64,
    pub access: Access,
    pub result: std::result::Result<Word, String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProcState {
    #[default]
    Idle,
    Done,
    ExecutingOther(u32),
    ContinueNext,
}

pub struct Processor {
    pub id: usize,
    pub state: ProcState,
    pub r_system: Requestor<Access, Result<Word>>,
    insts: Insts,
    done: Arc<AtomicBool>,
    log: Arc<Mutex<Vec<Completed>>>,
}

impl Processor {
    pub fn new(id: usize, insts: Insts, done: Arc<AtomicBool>, log: Arc<Mutex<Vec<Completed>>>) -> Self {
        Processor {
            id,
            state: ProcState::Idle,
            r_system: Requestor::new(),
            insts,
            done,
            log,
        }
    }

    async fn issue(&mut self, access: Access, cycle: u64) {
        let result = match self.r_system.send(access).await.next() {
            Some(Ok(word)) => Ok(word),
            Some(Err(e)) => Err(e.to_string()),
            None => Err(format!("processor {} is not connected to a memory system", self.id)),
        };
        if let Err(e) = &result {
            warn!("processor {}: {} failed: {}", self.id, access, e);
        }
        if let Ok(mut log) = self.log.lock() {
            log.push(Completed { cycle, access, result });
        }
    }

    // inputs

    pub async fn on_tick(&mut self, _: (), scheduler: &Scheduler<Self>) {
        if self.state != ProcState::Idle {
            return;
        }
        let cycle = scheduler.time().as_secs() as u64;
        match self.insts.pop_front() {
            Some(Instr::Read(addr)) => {
                self.issue(Access::read(self.id, addr), cycle).await;
                self.state = ProcState::ContinueNext;
            },
            Some(Instr::Write(addr, value)) => {
                self.issue(Access::write(self.id, addr, value), cycle).await;
                self.state = ProcState::ContinueNext;
            },
            Some(Instr::Other(d)) => {
                debug!("processor {}: executing other instruction for {} cycles", self.id, d);
                self.state = ProcState::ExecutingOther(d.max(1));
            },
            None => self.state = ProcState::ContinueNext,
        }
    }

    pub async fn on_post_tick(&mut self) {
        self.state = match self.state {
            ProcState::ExecutingOther(d) if d > 1 => ProcState::ExecutingOther(d - 1),
            ProcState::ExecutingOther(_) | ProcState::ContinueNext => {
                if self.insts.is_empty() {
                    self.done.store(true, Ordering::Relaxed);
                    ProcState::Done
                } else {
                    ProcState::Idle
                }
            },
            s => s,
        };
    }
}

impl Model for Processor {}

/// The one place accesses enter the memory hierarchy. Requests from all
/// processors queue up in this model's mailbox and each runs to
/// completion, snoops and write-backs included, under the hierarchy lock.
pub struct System<P: ReplacementPolicy> {
    hierarchy: Arc<Mutex<MemoryHierarchy<P>>>,
}

impl<P: ReplacementPolicy + Send + 'static> System<P> {
    pub fn new(hierarchy: Arc<Mutex<MemoryHierarchy<P>>>) -> Self {
        System { hierarchy }
    }

    fn serve(&self, access: &Access) -> Result<Word> {
        let mut hierarchy = self.hierarchy
            .lock()
            .map_err(|_| Error::Simulation("memory hierarchy lock poisoned".into()))?;
        hierarchy.execute(access)
    }

    // inputs

    pub async fn on_access(&mut self, access: Access) -> Result<Word> {
        debug!("system: {}", access);
        self.serve(&access)
    }
}

impl<P: ReplacementPolicy + Send + 'static> Model for System<P> {}
