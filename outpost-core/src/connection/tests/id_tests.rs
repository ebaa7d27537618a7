use crate::connection::{ConnectionId, IdAllocator};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[test]
fn ids_start_at_one_and_increment() {
    let ids = IdAllocator::new();

    assert_eq!(ids.next(), ConnectionId(1));
    assert_eq!(ids.next(), ConnectionId(2));
    assert_eq!(ids.next(), ConnectionId(3));
}

#[test]
fn concurrent_allocation_never_repeats() {
    let ids = Arc::new(IdAllocator::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ids = ids.clone();
            thread::spawn(move || (0..1_000).map(|_| ids.next()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "duplicate connection id {id}");
        }
    }

    assert_eq!(seen.len(), 16_000);
    assert_eq!(seen.iter().max(), Some(&ConnectionId(16_000)));
}

#[test]
fn allocators_are_isolated() {
    let first = IdAllocator::new();
    let second = IdAllocator::new();

    assert_eq!(first.next(), ConnectionId(1));
    assert_eq!(first.next(), ConnectionId(2));
    assert_eq!(second.next(), ConnectionId(1));
    assert_eq!(second.next(), ConnectionId(2));
}
