//! Parallel corpus-wide duplicate scan.
//!
//! Row `i` of the upper-triangular pair matrix (entity `i` against every
//! `j > i`) is one unit of work. Rows go through a bounded crossbeam queue to
//! a fixed pool of scoped worker threads; results are collected, sorted and
//! only then clustered.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Sender};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{DetectionOptions, ScanConfig};
use crate::detection::detector::{by_overall_desc, group_duplicates, DuplicateDetector};
use crate::detection::types::{DuplicateGroup, DuplicatePair};
use crate::entity::Entity;
use crate::TARGET_DETECT;

/// Cooperative cancellation flag shared between a caller and a scan.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// Outcome of a scan, complete or cut short.
///
/// After cancellation `pairs` and `groups` cover only the completed rows and
/// are still valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub groups: Vec<DuplicateGroup>,
    pub pairs: Vec<DuplicatePair>,
    pub rows_completed: usize,
    pub rows_total: usize,
    pub cancelled: bool,
}

struct RowResult {
    row: usize,
    pairs: Vec<(usize, DuplicatePair)>,
}

fn score_row(
    detector: &DuplicateDetector,
    entities: &[Entity],
    options: &DetectionOptions,
    row: usize,
) -> RowResult {
    let entity = &entities[row];
    let pairs = entities
        .iter()
        .enumerate()
        .skip(row + 1)
        .filter_map(|(col, candidate)| {
            detector
                .score_candidate(entity, candidate, options)
                .map(|pair| (col, pair))
        })
        .collect();
    RowResult { row, pairs }
}

fn worker_loop(
    detector: &DuplicateDetector,
    entities: &[Entity],
    options: &DetectionOptions,
    rows: &crossbeam_channel::Receiver<usize>,
    out: &Sender<RowResult>,
    token: &CancellationToken,
) {
    while let Ok(row) = rows.recv() {
        // Drain the queue without scoring once cancelled.
        if token.is_cancelled() {
            continue;
        }
        if out.send(score_row(detector, entities, options, row)).is_err() {
            break;
        }
    }
}

impl DuplicateDetector {
    /// Full pairwise scan with a worker pool and cooperative cancellation.
    ///
    /// The token is checked before each row is queued and again when a
    /// worker picks the row up.
    #[must_use]
    pub fn detect_all_duplicates_with_cancel(
        &self,
        entities: &[Entity],
        options: &DetectionOptions,
        config: &ScanConfig,
        token: &CancellationToken,
    ) -> ScanReport {
        let rows_total = entities.len().saturating_sub(1);
        let workers = config.workers.clamp(1, rows_total.max(1));
        info!(
            target: TARGET_DETECT,
            entities = entities.len(),
            rows = rows_total,
            workers,
            "starting duplicate scan"
        );

        let (row_tx, row_rx) = bounded::<usize>(config.queue_capacity.max(1));
        let (out_tx, out_rx) = unbounded::<RowResult>();

        thread::scope(|scope| {
            let mut spawned = 0usize;
            for idx in 0..workers {
                let rows = row_rx.clone();
                let out = out_tx.clone();
                let token = token.clone();
                let spawn = thread::Builder::new()
                    .name(format!("lotsawa-scan-{idx}"))
                    .spawn_scoped(scope, move || {
                        worker_loop(self, entities, options, &rows, &out, &token);
                    });
                match spawn {
                    Ok(_) => spawned += 1,
                    Err(err) => {
                        warn!(
                            target: TARGET_DETECT,
                            worker = idx,
                            error = %err,
                            "failed to spawn scan worker"
                        );
                    }
                }
            }
            drop(row_rx);

            for row in 0..rows_total {
                if token.is_cancelled() {
                    break;
                }
                if spawned == 0 {
                    // No pool: score on the calling thread.
                    if out_tx.send(score_row(self, entities, options, row)).is_err() {
                        break;
                    }
                } else if row_tx.send(row).is_err() {
                    break;
                }
            }
            drop(row_tx);
        });
        drop(out_tx);

        let results: Vec<RowResult> = out_rx.iter().collect();
        let rows_completed = results.len();
        let mut indexed: Vec<(usize, usize, DuplicatePair)> = results
            .into_iter()
            .flat_map(|r| {
                let row = r.row;
                r.pairs.into_iter().map(move |(col, pair)| (row, col, pair))
            })
            .collect();
        indexed.sort_by(|a, b| by_overall_desc(&a.2, &b.2).then((a.0, a.1).cmp(&(b.0, b.1))));
        let pairs: Vec<DuplicatePair> = indexed.into_iter().map(|(_, _, pair)| pair).collect();

        let groups = group_duplicates(entities, &pairs);
        let cancelled = rows_completed < rows_total;
        if cancelled {
            warn!(
                target: TARGET_DETECT,
                rows_completed,
                rows_total,
                pairs = pairs.len(),
                "duplicate scan cancelled; returning partial results"
            );
        } else {
            info!(
                target: TARGET_DETECT,
                pairs = pairs.len(),
                groups = groups.len(),
                "duplicate scan finished"
            );
        }

        ScanReport {
            groups,
            pairs,
            rows_completed,
            rows_total,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::temporal::DateInfo;

    fn corpus() -> Vec<Entity> {
        vec![
            Entity::new("Marpa Lotsawa", EntityKind::person())
                .with_date("birth", DateInfo::circa(1012)),
            Entity::new("Milarepa", EntityKind::person()),
            Entity::new("Mar-pa", EntityKind::person()).with_date("birth", DateInfo::circa(1015)),
            Entity::new("mi la ras pa", EntityKind::person()),
            Entity::new("Gampopa", EntityKind::person()),
        ]
    }

    #[test]
    fn test_scan_is_deterministic_across_worker_counts() {
        let entities = corpus();
        let detector = DuplicateDetector::default();
        let options = DetectionOptions::default();
        let token = CancellationToken::new();

        let one = detector.detect_all_duplicates_with_cancel(
            &entities,
            &options,
            &ScanConfig { workers: 1, queue_capacity: 1 },
            &token,
        );
        let four = detector.detect_all_duplicates_with_cancel(
            &entities,
            &options,
            &ScanConfig { workers: 4, queue_capacity: 2 },
            &token,
        );
        assert!(!one.cancelled);
        assert_eq!(one.rows_total, 4);
        assert_eq!(one.rows_completed, 4);

        let ids = |r: &ScanReport| -> Vec<_> {
            r.pairs.iter().map(|p| (p.entity1, p.entity2)).collect()
        };
        assert_eq!(ids(&one), ids(&four));
        assert_eq!(one.groups.len(), 2);
        assert_eq!(
            one.groups.iter().map(|g| g.cluster.id).collect::<Vec<_>>(),
            four.groups.iter().map(|g| g.cluster.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let report = DuplicateDetector::default().detect_all_duplicates_with_cancel(
            &corpus(),
            &DetectionOptions::default(),
            &ScanConfig::default(),
            &token,
        );
        assert!(report.cancelled);
        assert_eq!(report.rows_completed, 0);
        assert!(report.pairs.is_empty());
        assert!(report.groups.is_empty());
    }

    #[test]
    fn test_empty_and_single_corpus() {
        let detector = DuplicateDetector::default();
        let token = CancellationToken::new();
        for entities in [Vec::new(), vec![Entity::new("Atisha", EntityKind::person())]] {
            let report = detector.detect_all_duplicates_with_cancel(
                &entities,
                &DetectionOptions::default(),
                &ScanConfig::default(),
                &token,
            );
            assert_eq!(report.rows_total, 0);
            assert!(!report.cancelled);
            assert!(report.groups.is_empty());
        }
    }
}
