use std::sync::Arc;
use std::thread;

use unilink_rs::test_support::assert_invariants;
use unilink_rs::{ContactId, MemoryStore, Observation, Unilink};

#[test]
fn concurrent_identical_observations_yield_one_primary() {
    let store = Arc::new(MemoryStore::new());
    let unilink = Arc::new(Unilink::with_store(store.clone()));
    let observation = Observation::new(Some("ada@example.com"), Some("5551230100"));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let unilink = unilink.clone();
            let observation = observation.clone();
            thread::spawn(move || unilink.reconcile(&observation).expect("reconcile"))
        })
        .collect();

    let ids: Vec<ContactId> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .collect();

    assert_eq!(store.len(), 1);
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert_invariants(&store);
}

#[test]
fn concurrent_overlapping_observations_keep_invariants() {
    let store = Arc::new(MemoryStore::new());
    let unilink = Arc::new(Unilink::with_store(store.clone()));

    // Observations that force creates, secondary links, and merges to race.
    let observations = [
        Observation::email("ada@example.com"),
        Observation::phone("5551230100"),
        Observation::new(Some("ada@example.com"), Some("5551230100")),
        Observation::new(Some("lovelace@example.com"), Some("5551230100")),
        Observation::email("grace@example.com"),
        Observation::new(Some("grace@example.com"), Some("5551230100")),
        Observation::phone("5551230177"),
        Observation::new(Some("ada@example.com"), Some("5551230177")),
    ];

    let handles: Vec<_> = observations
        .iter()
        .cloned()
        .map(|observation| {
            let unilink = unilink.clone();
            thread::spawn(move || unilink.reconcile(&observation).expect("reconcile"))
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    assert_invariants(&store);

    // Every value ends up reachable, and the shared phone forced all email
    // clusters into one.
    let view = unilink
        .identify(&Observation::phone("5551230100"))
        .expect("identify");
    assert!(view.emails.iter().any(|email| email == "ada@example.com"));
    assert!(view.emails.iter().any(|email| email == "grace@example.com"));
}
