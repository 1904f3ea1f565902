// Discrete-event driver: one processor model per cache unit, all feeding a
// single system model that owns the memory hierarchy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use asynchronix::simulation::{Mailbox, SimInit};
use asynchronix::time::MonotonicTime;
use log::info;
use crate::error::{Error, Result};
use crate::mesi::*;

pub struct SimReport {
    pub cycles: u64,
    pub completed: Vec<Completed>,
}

impl SimReport {
    pub fn failures(&self) -> impl Iterator<Item = &Completed> {
        self.completed.iter().filter(|c| c.result.is_err())
    }
}

/// Runs one instruction list per processor against `hierarchy` until every
/// processor is done or `max_cycles` have passed.
pub fn simulate<P>(
    hierarchy: Arc<Mutex<MemoryHierarchy<P>>>,
    mut insts: Vec<Insts>,
    max_cycles: u64,
) -> Result<SimReport>
where
    P: ReplacementPolicy + Send + 'static,
{
    let units = hierarchy
        .lock()
        .map_err(|_| Error::Simulation("memory hierarchy lock poisoned".into()))?
        .specs()
        .cache_units;
    if insts.len() > units {
        return Err(Error::Simulation(format!("{} instruction lists for {} cache units", insts.len(), units)));
    }
    let num_procs = insts.len();

    let done = (0..num_procs).map(|_| Arc::new(AtomicBool::new(false))).collect::<Vec<_>>();
    let log = Arc::new(Mutex::new(Vec::new()));

    // create models
    let mut procs = (0..num_procs)
        .map(|i| Processor::new(i, insts.remove(0), done[i].clone(), log.clone()))
        .collect::<Vec<_>>();
    let system = System::new(hierarchy);

    // create mailboxes
    let mut procs_mbox = procs.iter().map(|_| Mailbox::<Processor>::new()).collect::<Vec<_>>();
    let system_mbox = Mailbox::<System<P>>::new();

    // addresses
    let tick_addr_procs = procs_mbox.iter().map(|mb| mb.address()).collect::<Vec<_>>();

    // connect models
    for p in procs.iter_mut() {
        p.r_system.connect(System::<P>::on_access, &system_mbox);
    }

    // initialize simulation
    let mut simi = SimInit::new().add_model(system, system_mbox);
    for _ in 0..num_procs {
        simi = simi.add_model(procs.remove(0), procs_mbox.remove(0));
    }
    let mut sim = simi.init(MonotonicTime::EPOCH);

    // run simulation
    for _ in 0..max_cycles {
        if done.iter().all(|d| d.load(Ordering::Relaxed)) { break; }

        for addr in tick_addr_procs.iter() {
            sim.send_event(Processor::on_tick, (), addr);
        }
        sim.step_by(Duration::from_secs(1));
        for addr in tick_addr_procs.iter() {
            sim.send_event(Processor::on_post_tick, (), addr);
        }
    }

    let cycles = sim.time().as_secs() as u64;
    info!("finished simulation in {} cycles", cycles);
    let completed = log
        .lock()
        .map(|mut l| std::mem::take(&mut *l))
        .map_err(|_| Error::Simulation("access log lock poisoned".into()))?;
    Ok(SimReport { cycles, completed })
}
