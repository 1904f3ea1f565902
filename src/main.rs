use std::io::{self, BufRead, Write};
use std::process;
use std::sync::{Arc, Mutex};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::error;

use cachesim_mesi::mesi::*;
use cachesim_mesi::observer::Narrator;
use cachesim_mesi::sim::simulate;
use cachesim_mesi::workload::RandomWorkload;
use cachesim_mesi::{Error, Result};

#[derive(Parser, Debug)]
#[command(author, version, about = "MESI snooping cache coherence simulator")]
struct Args {
    /// TOML file with the system specs; flags below override it
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long)]
    units: Option<usize>,

    #[arg(long)]
    sets: Option<usize>,

    #[arg(long)]
    block_words: Option<usize>,

    #[arg(long)]
    tags: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Print every protocol event as it happens
    #[arg(short, long)]
    narrate: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Menu-driven manual and random accesses (default)
    Interactive,
    /// Run random accesses and print statistics
    Random {
        #[arg(long, default_value_t = 100)]
        count: usize,
        /// Drive the accesses through the processor simulation
        #[arg(long)]
        sim: bool,
    },
    /// Print a window of memory
    ShowMemory {
        #[arg(long, default_value_t = 0)]
        center: usize,
        #[arg(long, default_value_t = 10)]
        lines: usize,
    },
}

fn load_specs(args: &Args) -> Result<SystemSpec> {
    let mut specs = match &args.config {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => SystemSpec::default(),
    };
    if let Some(v) = args.units { specs.cache_units = v; }
    if let Some(v) = args.sets { specs.cache_sets = v; }
    if let Some(v) = args.block_words { specs.block_words = v; }
    if let Some(v) = args.tags { specs.tags = v; }
    if args.seed.is_some() { specs.seed = args.seed; }
    Ok(specs)
}

fn main() {
    // logging
    let env = Env::default()
        .filter_or("CACHESIM_LOG", "info")
        .write_style_or("CACHESIM_LOG_STYLE", "auto");
    env_logger::init_from_env(env);

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let specs = load_specs(&args)?;
    let mut hierarchy = MemoryHierarchy::<FifoPolicy>::new(specs)?;
    if args.narrate {
        hierarchy.subscribe(Narrator);
    }
    match args.command.unwrap_or(Command::Interactive) {
        Command::Interactive => interactive(&mut hierarchy),
        Command::Random { count, sim } => random(hierarchy, count, sim),
        Command::ShowMemory { center, lines } => {
            print!("{}", hierarchy.memory_view(center, lines)?);
            Ok(())
        },
    }
}

fn random(mut hierarchy: MemoryHierarchy, count: usize, sim: bool) -> Result<()> {
    let seed = hierarchy.specs().seed;
    let mut workload = RandomWorkload::new(hierarchy.specs(), seed);
    if sim {
        let units = hierarchy.specs().cache_units;
        let per_proc = count.div_ceil(units);
        let insts = workload.instructions(per_proc);
        let shared = Arc::new(Mutex::new(hierarchy));
        let report = simulate(shared.clone(), insts, (per_proc as u64 + 1) * 2)?;
        println!("finished simulation in {} cycles", report.cycles);
        for c in report.failures() {
            println!("failed: {} ({:?})", c.access, c.result);
        }
        let hierarchy = shared.lock().map_err(|_| Error::Simulation("memory hierarchy lock poisoned".into()))?;
        print_stats(&*hierarchy);
    } else {
        for access in workload.by_ref().take(count) {
            hierarchy.execute(&access)?;
        }
        print_stats(&hierarchy);
    }
    Ok(())
}

fn print_stats<P: ReplacementPolicy>(hierarchy: &MemoryHierarchy<P>) {
    println!("unit\t|reads\t|writes\t|hits\t|misses\t|peer\t|memory\t|evict\t|flush\t|inval\t|hit rate");
    let row = |name: String, s: UnitStats| {
        println!("{}\t|{}\t|{}\t|{}\t|{}\t|{}\t|{}\t|{}\t|{}\t|{}\t|{:.2}",
            name, s.reads, s.writes, s.hits, s.misses, s.peer_fills, s.memory_fills,
            s.evictions, s.flushes, s.invalidations, s.hit_rate());
    };
    for u in hierarchy.units() {
        row(u.id.to_string(), u.stats());
    }
    row("all".into(), hierarchy.stats());
}

// interactive shell

fn prompt(question: &str) -> Option<String> {
    print!("{question} >>> ");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// Re-asks until the answer parses and passes `valid`; `None` on end of input.
fn ask_number(question: &str, valid: impl Fn(usize) -> bool) -> Option<usize> {
    loop {
        let answer = prompt(question)?;
        match answer.parse::<usize>() {
            Ok(n) if valid(n) => return Some(n),
            Ok(_) => println!("invalid number"),
            Err(_) => println!("could not read a number"),
        }
    }
}

fn confirm(question: &str) -> bool {
    prompt(question).is_some_and(|a| a.eq_ignore_ascii_case("y"))
}

fn interactive(hierarchy: &mut MemoryHierarchy) -> Result<()> {
    println!("cache simulator: {} units, {} lines each", hierarchy.specs().cache_units, hierarchy.specs().cache_sets);
    loop {
        println!("(1) manual access\n(2) random accesses\n(3) view memory\n(4) view caches\n(5) reset\n(0) quit");
        let Some(opt) = prompt("") else { return Ok(()) };
        let outcome = match opt.as_str() {
            "1" => manual_access(hierarchy),
            "2" => random_accesses(hierarchy),
            "3" => { view_memory(hierarchy); Ok(()) },
            "4" => {
                hierarchy.units().iter().for_each(|u| println!("{u}"));
                Ok(())
            },
            "5" => { hierarchy.reset(); Ok(()) },
            "0" => return Ok(()),
            _ => Ok(()),
        };
        // bad input is reported and the menu continues; engine faults are fatal
        if let Err(e) = outcome {
            if matches!(e, Error::InvariantViolation { .. }) {
                return Err(e);
            }
            println!("{e}");
        }
    }
}

fn manual_access(hierarchy: &mut MemoryHierarchy) -> Result<()> {
    let specs = hierarchy.specs().clone();
    loop {
        let Some(unit) = ask_number(&format!("cache unit (max={})", specs.cache_units - 1), |u| u < specs.cache_units) else { return Ok(()) };
        let Some(tag) = ask_number(&format!("memory tag to access (max={})", specs.tags - 1), |t| t < specs.tags) else { return Ok(()) };
        let Some(offset) = ask_number(&format!("block word to access (max={})", specs.block_words - 1), |o| o < specs.block_words) else { return Ok(()) };
        let addr = hierarchy.address(tag, offset)?;

        let value = loop {
            let Some(answer) = prompt("new value or <enter> to only read") else { return Ok(()) };
            if answer.is_empty() { break None; }
            match answer.parse::<Word>() {
                Ok(v) => break Some(v),
                Err(_) => println!("invalid number"),
            }
        };
        let word = hierarchy.execute(&Access { unit, addr, value })?;
        println!("{} = {}", addr, word);
        println!("{}", hierarchy.unit(unit)?);

        if !confirm("another manual access? (y)") { return Ok(()); }
    }
}

fn random_accesses(hierarchy: &mut MemoryHierarchy) -> Result<()> {
    let Some(n) = ask_number("number of random accesses", |n| n > 0) else { return Ok(()) };
    let mut workload = RandomWorkload::new(hierarchy.specs(), None);
    for access in workload.by_ref().take(n) {
        let word = hierarchy.execute(&access)?;
        println!("{} = {}", access, word);
    }
    Ok(())
}

fn view_memory(hierarchy: &MemoryHierarchy) {
    let tags = hierarchy.specs().tags;
    loop {
        let Some(n) = ask_number(&format!("number of lines to show (max={tags})"), |n| n <= tags) else { return };
        let Some(center) = ask_number(&format!("tag to center on (max={})", tags - 1), |t| t < tags) else { return };
        match hierarchy.memory_view(center, n) {
            Ok(view) => print!("{view}"),
            Err(e) => println!("{e}"),
        }
        if !confirm("another view? (y)") { return; }
    }
}
