//! Concurrent access to one store.

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::thread;
use strata_tests::prelude::*;

const WRITERS: usize = 8;

#[test]
fn test_concurrent_label_writers_serialize() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = catalog.guid_of("Table", "sales.orders").unwrap();
    catalog.reset_recordings();

    // WHEN
    thread::scope(|scope| {
        for i in 0..WRITERS {
            let catalog = &catalog;
            let guid = &guid;
            scope.spawn(move || {
                let labels = BTreeSet::from([format!("writer-{}", i)]);
                catalog
                    .store
                    .add_labels(&mut ctx(STEWARD), guid, labels)
                    .unwrap();
            });
        }
    });

    // THEN
    let entity = catalog.entity(&guid).unwrap();
    assert_eq!(entity.labels.map(|l| l.len()), Some(WRITERS));
    assert_eq!(catalog.notifier.names(), vec!["labels-added"; WRITERS]);
}

#[test]
fn test_concurrent_creates_of_same_entity_create_once() {
    // GIVEN
    let catalog = Catalog::new().unwrap();

    // WHEN
    let created: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let catalog = &catalog;
                scope.spawn(move || {
                    catalog
                        .create(STEWARD, vec![table("sales.orders")])
                        .map(|r| r.created().len())
                        .unwrap_or(0)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap_or(0)).sum()
    });

    // THEN
    assert_eq!(created, 1);
    assert_eq!(catalog.store.get_entity_guids("Table").unwrap().len(), 1);
}
