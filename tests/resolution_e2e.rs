use lotsawa::config::{DetectionOptions, MergeOptions};
use lotsawa::entity::{PersonAttributes, Relationship};
use lotsawa::storage::EntityStore;
use lotsawa::temporal::DateContext;
use lotsawa::{
    Confidence, ConfidenceLevel, DateInfo, DatePrecision, DuplicateDetector, Entity, EntityKind,
    EntityMerger, MergeHistoryId, NotFoundError, Recommendation, ResolveError, Script, Stores,
    TemporalResolver,
};

fn marpa_corpus() -> Vec<Entity> {
    let resolver = TemporalResolver::new();
    let birth_1012 = resolver.resolve_date("1012", None).unwrap()
        .with_precision(DatePrecision::Circa);
    vec![
        Entity::new(
            "Marpa Lotsawa",
            EntityKind::Person(PersonAttributes {
                roles: vec!["translator".into()],
                ..PersonAttributes::default()
            }),
        )
        .with_date("birth", birth_1012)
        .with_variant(Script::English, "Marpa")
        .with_confidence(Confidence::clamped(0.8))
        .with_source("blue-annals"),
        Entity::new("Mar-pa", EntityKind::person())
            .with_date("birth", DateInfo::circa(1015))
            .with_variant(Script::Wylie, "mar pa chos kyi blo gros")
            .with_confidence(Confidence::clamped(0.6))
            .with_source("deb-ther-sngon-po"),
        Entity::new("Milarepa", EntityKind::person()).with_date("birth", DateInfo::exact(1052)),
    ]
}

#[test]
fn marpa_pair_is_high_and_needs_review() {
    let corpus = marpa_corpus();
    let detector = DuplicateDetector::default();
    let options = DetectionOptions::default();
    let score = detector.calculate_duplicate_probability(&corpus[0], &corpus[1], &options);

    assert!(score.signals.name > 0.85);
    assert!((0.7..=0.85).contains(&score.signals.date));
    assert!((0.80..0.90).contains(&score.overall));
    assert_eq!(score.confidence_level, ConfidenceLevel::High);
    assert_eq!(score.confidence_level.recommendation(), Recommendation::Review);
    assert!((score.weights.sum() - score.overall).abs() < 1e-3);
}

#[test]
fn third_marpa_joins_one_cluster() {
    let mut corpus = marpa_corpus();
    corpus.push(
        Entity::new("Marpa", EntityKind::person())
            .with_confidence(Confidence::clamped(0.95))
            .with_verified(true),
    );
    let groups =
        DuplicateDetector::default().detect_all_duplicates(&corpus, &DetectionOptions::default());

    assert_eq!(groups.len(), 1);
    let cluster = &groups[0].cluster;
    assert_eq!(cluster.len(), 3);
    assert_eq!(cluster.suggested_canonical, corpus[3].id());
    assert!(!cluster.contains(corpus[2].id()));
}

#[test]
fn relative_dates_feed_detection() {
    let corpus = marpa_corpus();
    let resolver = TemporalResolver::new();
    let context = DateContext::new().with_entity(&corpus[0]);
    let date = resolver
        .resolve_date("40 years after Marpa Lotsawa was born", Some(&context))
        .unwrap();
    assert_eq!(date.year, Some(1052));

    let err = resolver.resolve_date("after Naropa died", Some(&context)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn merge_then_undo_restores_both_records() {
    let corpus = marpa_corpus();
    let stores = Stores::in_memory();
    for entity in &corpus {
        stores.entities.insert(entity.clone()).unwrap();
    }
    let teacher_of = Relationship::new(corpus[1].id(), "teacher_of", corpus[2].id());
    stores.relationships.insert(teacher_of.clone()).unwrap();

    let merger = EntityMerger::new(stores.clone());
    let options = MergeOptions::default().with_resolution("dates.birth", serde_json::json!(1012));
    let result = merger.merge_entities(corpus[0].id(), corpus[1].id(), &options).unwrap();

    let merged = &result.merged;
    assert_eq!(merged.canonical_name, "Marpa Lotsawa");
    assert_eq!(merged.name_variants.get(&Script::English), ["Marpa", "Mar-pa"]);
    assert_eq!(merged.name_variants.get(&Script::Wylie), ["mar pa chos kyi blo gros"]);
    assert_eq!(merged.dates["birth"].year, Some(1012));
    assert_eq!(
        stores.relationships.get(teacher_of.id).unwrap().unwrap().subject,
        corpus[0].id()
    );
    // The merged-away id now resolves to the survivor.
    assert_eq!(stores.entities.get(corpus[1].id()).unwrap().unwrap().id(), corpus[0].id());

    assert!(merger.undo_merge(result.history_id).unwrap());

    for original in &corpus[..2] {
        let restored = stores.entities.get(original.id()).unwrap().unwrap();
        assert_eq!(restored.id(), original.id());
        assert_eq!(restored.canonical_name, original.canonical_name);
        assert_eq!(restored.name_variants, original.name_variants);
        assert_eq!(restored.kind, original.kind);
        assert_eq!(restored.dates, original.dates);
        assert_eq!(restored.confidence, original.confidence);
        assert_eq!(restored.verified, original.verified);
        assert_eq!(restored.provenance, original.provenance);
    }
    assert_eq!(
        stores.relationships.get(teacher_of.id).unwrap().unwrap().subject,
        corpus[1].id()
    );
    assert!(!stores.entities.is_tombstoned(corpus[1].id()).unwrap());
}

#[test]
fn undo_unknown_history_is_not_found() {
    let merger = EntityMerger::new(Stores::in_memory());
    let err = merger.undo_merge(MergeHistoryId::new()).unwrap_err();
    assert!(matches!(err, ResolveError::NotFound(NotFoundError::MergeHistory { .. })));
}

#[test]
fn store_trait_is_object_safe() {
    let stores = Stores::in_memory();
    let store: &dyn EntityStore = stores.entities.as_ref();
    let entity = Entity::new("Gampopa", EntityKind::person());
    store.insert(entity.clone()).unwrap();
    assert_eq!(store.find_by_name("gampopa").unwrap().len(), 1);
}
