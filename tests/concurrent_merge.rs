use std::sync::{Arc, Barrier};
use std::thread;

use lotsawa::config::MergeOptions;
use lotsawa::{Confidence, Entity, EntityKind, EntityMerger, ResolveError, Script, Stores};

fn store_with(entities: &[Entity]) -> Stores {
    let stores = Stores::in_memory();
    for entity in entities {
        stores.entities.insert(entity.clone()).unwrap();
    }
    stores
}

#[test]
fn concurrent_merges_into_one_primary_are_serialized() {
    const WRITERS: usize = 8;

    let primary = Entity::new("Marpa Lotsawa", EntityKind::person())
        .with_confidence(Confidence::clamped(0.9));
    let duplicates: Vec<Entity> = (0..WRITERS)
        .map(|i| {
            Entity::new(format!("Marpa variant {i}"), EntityKind::person())
                .with_confidence(Confidence::clamped(0.5))
        })
        .collect();
    let mut all = vec![primary.clone()];
    all.extend(duplicates.iter().cloned());
    let merger = Arc::new(EntityMerger::new(store_with(&all)));

    let options = MergeOptions {
        max_retries: 32,
        ..MergeOptions::default()
    };
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = duplicates
        .iter()
        .map(|dup| {
            let merger = Arc::clone(&merger);
            let barrier = Arc::clone(&barrier);
            let options = options.clone();
            let (primary_id, dup_id) = (primary.id(), dup.id());
            thread::spawn(move || {
                barrier.wait();
                merger.merge_entities(primary_id, dup_id, &options)
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let merged = merger.stores().entities.get(primary.id()).unwrap().unwrap();
    assert_eq!(merged.version, 1 + WRITERS as u64);
    let english = merged.name_variants.get(&Script::English);
    for dup in &duplicates {
        assert!(english.contains(&dup.canonical_name), "lost update for {}", dup.canonical_name);
        assert!(merger.stores().entities.is_tombstoned(dup.id()).unwrap());
    }
    assert_eq!(merger.history_for(primary.id()).unwrap().len(), WRITERS);
}

#[test]
fn one_duplicate_cannot_be_merged_twice() {
    let a = Entity::new("Gampopa", EntityKind::person());
    let b = Entity::new("Dakpo Lhaje", EntityKind::person());
    let dup = Entity::new("sgam po pa", EntityKind::person());
    let merger = Arc::new(EntityMerger::new(store_with(&[a.clone(), b.clone(), dup.clone()])));

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [a.id(), b.id()]
        .into_iter()
        .map(|target| {
            let merger = Arc::clone(&merger);
            let barrier = Arc::clone(&barrier);
            let dup_id = dup.id();
            thread::spawn(move || {
                barrier.wait();
                merger.merge_entities(target, dup_id, &MergeOptions::default())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(err, ResolveError::NotFound(_)), "{err}");
    assert_eq!(merger.history_for(dup.id()).unwrap().len(), 1);
}
