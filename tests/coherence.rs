use cachesim_mesi::mesi::*;
use cachesim_mesi::observer::{Event, Recorder};
use cachesim_mesi::workload::RandomWorkload;

fn hierarchy(units: usize, sets: usize) -> MemoryHierarchy {
    MemoryHierarchy::new(SystemSpec {
        cache_units: units,
        cache_sets: sets,
        block_words: 4,
        tags: 16,
        seed: Some(7),
        ..Default::default()
    }).unwrap()
}

fn addr(h: &MemoryHierarchy, tag: usize, offset: usize) -> ReadAddress {
    h.address(tag, offset).unwrap()
}

#[test]
fn two_unit_scenario() {
    let mut h = hierarchy(2, 4);
    let (a, b) = (0, 1);

    // A writes: miss, filled from memory, modified
    assert_eq!(h.write(a, addr(&h, 5, 0), 42).unwrap(), 42);
    assert_eq!(h.units()[a].state_of(5), MesiState::Modified);
    assert_eq!(h.units()[a].stats().memory_fills, 1);

    // B reads: A flushes and downgrades, B ends up shared
    assert_eq!(h.read(b, addr(&h, 5, 0)).unwrap(), 42);
    assert_eq!(h.memory().read(5).unwrap().read(0), 42);
    assert_eq!(h.units()[a].state_of(5), MesiState::Shared);
    assert_eq!(h.units()[b].state_of(5), MesiState::Shared);

    // A writes a shared line: hit, B is invalidated
    assert_eq!(h.write(a, addr(&h, 5, 1), 7).unwrap(), 7);
    assert_eq!(h.units()[a].stats().hits, 1);
    assert_eq!(h.units()[a].state_of(5), MesiState::Modified);
    assert_eq!(h.units()[b].lookup(5), None);

    // B reads again: miss, gets A's data
    assert_eq!(h.read(b, addr(&h, 5, 1)).unwrap(), 7);
    assert_eq!(h.units()[b].stats().misses, 2);
    assert_eq!(h.units()[b].state_of(5), MesiState::Shared);
    assert_eq!(h.units()[a].state_of(5), MesiState::Shared);
    assert_eq!(h.memory().read(5).unwrap().read(1), 7);
    h.check_coherence().unwrap();
}

#[test]
fn write_then_read_round_trip() {
    let mut h = hierarchy(3, 2);
    for (unit, tag, offset, value) in [(0, 1, 0, 10), (1, 1, 3, 11), (2, 9, 2, 12), (0, 9, 2, 13)] {
        h.write(unit, addr(&h, tag, offset), value).unwrap();
        assert_eq!(h.read(unit, addr(&h, tag, offset)).unwrap(), value);
    }
}

#[test]
fn read_miss_without_peers_is_exclusive() {
    let mut h = hierarchy(2, 4);
    let expected = h.memory().read(3).unwrap().read(2);
    assert_eq!(h.read(0, addr(&h, 3, 2)).unwrap(), expected);
    assert_eq!(h.units()[0].state_of(3), MesiState::Exclusive);
}

#[test]
fn read_snoop_flushes_modified_peer() {
    let mut h = hierarchy(2, 4);
    h.write(1, addr(&h, 9, 3), 1000).unwrap();
    assert_ne!(h.memory().read(9).unwrap().read(3), 1000);

    assert_eq!(h.read(0, addr(&h, 9, 3)).unwrap(), 1000);
    assert_eq!(h.units()[1].state_of(9), MesiState::Shared);
    assert_eq!(h.units()[0].state_of(9), MesiState::Shared);
    assert_eq!(h.memory().read(9).unwrap().read(3), 1000);
    assert_eq!(h.units()[1].stats().flushes, 1);
    assert_eq!(h.units()[0].stats().peer_fills, 1);
}

#[test]
fn write_invalidates_shared_peers() {
    let mut h = hierarchy(3, 4);
    for unit in 0..3 {
        h.read(unit, addr(&h, 4, 0)).unwrap();
    }
    (0..3).for_each(|u| assert_eq!(h.units()[u].state_of(4), MesiState::Shared));

    h.write(2, addr(&h, 4, 0), 1).unwrap();
    assert_eq!(h.units()[0].lookup(4), None);
    assert_eq!(h.units()[1].lookup(4), None);
    assert_eq!(h.units()[0].stats().invalidations, 1);

    let misses = h.units()[0].stats().misses;
    assert_eq!(h.read(0, addr(&h, 4, 0)).unwrap(), 1);
    assert_eq!(h.units()[0].stats().misses, misses + 1);
}

#[test]
fn write_miss_takes_ownership_from_exclusive_peer() {
    let mut h = hierarchy(2, 4);
    let before = h.read(0, addr(&h, 2, 1)).unwrap();
    assert_eq!(h.units()[0].state_of(2), MesiState::Exclusive);

    h.write(1, addr(&h, 2, 0), 99).unwrap();
    assert_eq!(h.units()[0].lookup(2), None);
    assert_eq!(h.units()[1].state_of(2), MesiState::Modified);
    assert_eq!(h.units()[1].stats().peer_fills, 1);
    // the untouched word came along with the peer copy
    assert_eq!(h.read(1, addr(&h, 2, 1)).unwrap(), before);
    h.check_coherence().unwrap();
}

#[test]
fn exclusive_and_modified_write_hits_stay_off_the_bus() {
    let mut h = hierarchy(2, 4);
    let recorder = Recorder::new();
    h.subscribe(recorder.clone());

    h.read(0, addr(&h, 6, 0)).unwrap();
    recorder.clear();
    h.write(0, addr(&h, 6, 0), 3).unwrap();
    h.write(0, addr(&h, 6, 1), 4).unwrap();

    assert_eq!(recorder.count(|e| matches!(e, Event::WriteSnoop { .. } | Event::ReadSnoop { .. })), 0);
    assert_eq!(h.units()[0].state_of(6), MesiState::Modified);
}

#[test]
fn invalidated_modified_line_reaches_memory() {
    let mut h = hierarchy(2, 4);
    h.write(0, addr(&h, 8, 2), 77).unwrap();
    h.write(1, addr(&h, 8, 0), 78).unwrap();

    assert_eq!(h.units()[0].lookup(8), None);
    assert_eq!(h.memory().read(8).unwrap().read(2), 77);
    assert_eq!(h.read(1, addr(&h, 8, 2)).unwrap(), 77);
    assert_eq!(h.read(1, addr(&h, 8, 0)).unwrap(), 78);
}

#[test]
fn random_workload_stays_coherent() {
    let specs = SystemSpec {
        cache_units: 3,
        cache_sets: 2,
        block_words: 2,
        tags: 6,
        max_random: 50,
        seed: Some(11),
    };
    let mut h = MemoryHierarchy::<FifoPolicy>::new(specs.clone()).unwrap();

    // every read must see the last value written anywhere
    let mut shadow = (0..specs.tags)
        .map(|t| h.memory().read(t).unwrap().words().to_vec())
        .collect::<Vec<_>>();

    for access in RandomWorkload::new(&specs, Some(5)).take(3000) {
        let word = h.execute(&access).unwrap();
        let (tag, offset) = (access.addr.tag(), access.addr.offset());
        match access.value {
            Some(v) => {
                shadow[tag][offset] = v;
                assert_eq!(word, v);
            },
            None => assert_eq!(word, shadow[tag][offset], "{access}"),
        }
        h.check_coherence().unwrap();

        for tag in 0..specs.tags {
            let modified = h.units().iter().filter(|u| u.state_of(tag) == MesiState::Modified).count();
            assert!(modified <= 1);
        }
    }
    let total = h.stats();
    assert_eq!(total.reads + total.writes, 3000);
    assert_eq!(total.hits + total.misses, 3000);
}
