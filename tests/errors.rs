use cachesim_mesi::mesi::*;
use cachesim_mesi::Error;

fn specs() -> SystemSpec {
    SystemSpec { cache_units: 2, cache_sets: 2, tags: 8, seed: Some(2), ..Default::default() }
}

#[test]
fn zero_sized_configs_are_rejected() {
    for bad in [
        SystemSpec { cache_units: 0, ..specs() },
        SystemSpec { cache_sets: 0, ..specs() },
        SystemSpec { block_words: 0, ..specs() },
        SystemSpec { tags: 0, ..specs() },
    ] {
        assert!(matches!(MemoryHierarchy::<FifoPolicy>::new(bad), Err(Error::InvalidConfig(_))));
    }
}

#[test]
fn out_of_range_addresses() {
    let h = MemoryHierarchy::<FifoPolicy>::new(specs()).unwrap();
    assert!(matches!(h.address(8, 0), Err(Error::TagOutOfRange { tag: 8, tags: 8 })));
    assert!(matches!(h.address(0, 4), Err(Error::OffsetOutOfRange { offset: 4, block_words: 4 })));
    assert!(h.address(7, 3).is_ok());
}

#[test]
fn rejected_access_leaves_no_trace() {
    let mut h = MemoryHierarchy::<FifoPolicy>::new(specs()).unwrap();
    let a = h.address(1, 0).unwrap();
    assert!(matches!(h.read(2, a), Err(Error::UnitOutOfRange { unit: 2, units: 2 })));

    // an address that only fits a bigger tag space
    let wide = ReadAddress::new(100, 0, &SystemSpec::default()).unwrap();
    assert!(matches!(h.write(0, wide, 5), Err(Error::TagOutOfRange { tag: 100, .. })));

    assert_eq!(h.stats(), UnitStats::default());
    assert!(h.units().iter().all(|u| u.lines().iter().all(|l| l.state == MesiState::Invalid)));
}

#[test]
fn reset_reinitializes_every_unit() {
    let mut h = MemoryHierarchy::<FifoPolicy>::new(specs()).unwrap();
    for tag in 0..4 {
        let a = h.address(tag, 1).unwrap();
        h.write(tag % 2, a, 1000 + tag as Word).unwrap();
    }
    h.reset();
    assert_eq!(h.stats(), UnitStats::default());
    for u in h.units() {
        assert!(u.lines().iter().all(|l| *l == CacheLine::new(4)));
        assert_eq!(u.policy().queue().count(), 0);
    }
    // repopulated memory never holds the out-of-range values written above
    for tag in 0..4 {
        assert!(h.memory().read(tag).unwrap().read(1) <= 999);
    }
}

#[test]
fn specs_load_from_toml_with_defaults() {
    let specs: SystemSpec = toml::from_str("cache_units = 2\ntags = 16\nseed = 9").unwrap();
    assert_eq!(specs, SystemSpec { cache_units: 2, tags: 16, seed: Some(9), ..Default::default() });
}

#[test]
fn memory_view_rejects_tags_outside_memory() {
    let h = MemoryHierarchy::<FifoPolicy>::new(specs()).unwrap();
    assert!(matches!(h.memory_view(8, 4), Err(Error::TagOutOfRange { tag: 8, tags: 8 })));
    assert!(matches!(h.memory_view(usize::MAX, 10), Err(Error::TagOutOfRange { .. })));

    let shown = h.memory_view(7, usize::MAX).unwrap().to_string();
    assert!(shown.starts_with("memory:\n#0"));
    assert!(shown.contains("#7"));
    assert!(!shown.contains("..."));
}

#[test]
fn unit_lookup_is_checked() {
    let h = MemoryHierarchy::<FifoPolicy>::new(specs()).unwrap();
    assert_eq!(h.unit(1).unwrap().id, 1);
    assert!(matches!(h.unit(2), Err(Error::UnitOutOfRange { unit: 2, units: 2 })));
}
