use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use lotsawa::config::{DetectionOptions, ScanConfig};
use lotsawa::{CancellationToken, DateInfo, DuplicateDetector, Entity, EntityKind};

const NAMES: &[&str] = &[
    "Marpa Lotsawa", "Mar-pa", "Milarepa", "mi la ras pa", "Gampopa", "sgam po pa", "Rechungpa",
    "Naropa", "Tilopa", "Tsongkhapa", "Longchenpa", "Taranatha", "Buton Rinchen Drub",
];

fn corpus(copies: usize) -> Vec<Entity> {
    let mut entities = Vec::new();
    for copy in 0..copies {
        for (i, name) in NAMES.iter().enumerate() {
            let year = 1000 + i32::try_from(i * 40 + copy).unwrap();
            entities.push(
                Entity::new(*name, EntityKind::person()).with_date("birth", DateInfo::circa(year)),
            );
        }
    }
    entities
}

#[test]
fn cancelled_scan_returns_valid_partial_results() {
    let entities = corpus(20);
    let detector = DuplicateDetector::default();
    let options = DetectionOptions::default();
    let config = ScanConfig {
        workers: 2,
        queue_capacity: 4,
    };

    let full = detector.detect_all_duplicates_with_cancel(
        &entities,
        &options,
        &config,
        &CancellationToken::new(),
    );
    assert!(!full.cancelled);
    assert_eq!(full.rows_completed, entities.len() - 1);
    let full_scores: HashMap<_, _> = full
        .pairs
        .iter()
        .map(|p| ((p.entity1, p.entity2), p.score.overall))
        .collect();

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            token.cancel();
        })
    };
    let partial = detector.detect_all_duplicates_with_cancel(&entities, &options, &config, &token);
    canceller.join().unwrap();

    assert_eq!(partial.cancelled, partial.rows_completed < partial.rows_total);
    assert!(partial.pairs.len() <= full.pairs.len());
    for pair in &partial.pairs {
        let full_score = full_scores[&(pair.entity1, pair.entity2)];
        assert!((full_score - pair.score.overall).abs() < 1e-12);
    }
    for group in &partial.groups {
        assert!(group.cluster.len() >= 2);
        assert!(group
            .pairs
            .iter()
            .all(|p| group.cluster.contains(p.entity1) && group.cluster.contains(p.entity2)));
    }
}

#[test]
fn token_cancelled_up_front_scores_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let report = DuplicateDetector::default().detect_all_duplicates_with_cancel(
        &corpus(2),
        &DetectionOptions::default(),
        &ScanConfig::default(),
        &token,
    );
    assert!(report.cancelled);
    assert_eq!(report.rows_completed, 0);
    assert!(report.pairs.is_empty());
}
