//! Splitting and prefetched batching of a loaded dataset

mod helpers;

use ecgx_ai::dataset::{prefetch, BatchPlan, Dataset};
use ecgx_ai::ingest::DatasetLoader;
use helpers::{synthetic_ecg, DatasetFixture};
use std::collections::BTreeSet;
use std::sync::Arc;

fn load_fixture(records: usize) -> (DatasetFixture, Dataset) {
    let mut fixture = DatasetFixture::new(100).unwrap();
    for i in 0..records {
        let codes = if i % 3 == 0 {
            "{'NORM': 100.0}"
        } else {
            "{'IMI': 50.0, 'ISC_': 50.0}"
        };
        fixture
            .add_record(
                &format!("{:05}", i + 1),
                &synthetic_ecg(1000, 12, 100, i as u64),
                codes,
            )
            .unwrap();
    }
    fixture.finish().unwrap();
    let dataset = DatasetLoader::new(fixture.loader_settings(10)).load().unwrap();
    (fixture, dataset)
}

#[tokio::test]
async fn test_prefetch_streams_every_record_once() {
    let (_fixture, dataset) = load_fixture(5);
    let dataset = Arc::new(dataset);
    let plan = BatchPlan::for_epoch(dataset.len(), 2, 42, 0);
    assert_eq!(plan.len(), 3);

    let mut rx = prefetch(Arc::clone(&dataset), plan, 2);
    let mut sizes = Vec::new();
    let mut seen = BTreeSet::new();
    while let Some(batch) = rx.recv().await {
        assert_eq!(batch.waveforms.shape(), &[batch.len(), 1000, 12]);
        assert_eq!(batch.clinical.dim(), (batch.len(), 2));
        assert_eq!(batch.labels.dim(), (batch.len(), dataset.vocabulary().len()));
        for row in batch.clinical.rows() {
            assert_eq!(row.to_vec(), vec![56.0, 1.0]);
        }
        sizes.push(batch.len());
        seen.extend(batch.indices.iter().copied());
    }
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(seen, (0..5).collect::<BTreeSet<_>>());
}

#[tokio::test]
async fn test_dropped_receiver_stops_prefetch() {
    let (_fixture, dataset) = load_fixture(4);
    let plan = BatchPlan::new(dataset.len(), 1, false, 0);
    let mut rx = prefetch(Arc::new(dataset), plan, 1);
    let first = rx.recv().await.unwrap();
    assert_eq!(first.indices, vec![0]);
    drop(rx);
}

#[test]
fn test_split_is_seeded_and_shares_vocabulary() {
    let (_fixture, dataset) = load_fixture(10);
    let (train_a, val_a) = dataset.split(0.2, 7).unwrap();
    let (train_b, val_b) = dataset.split(0.2, 7).unwrap();

    assert_eq!(val_a.len(), 2);
    assert_eq!(train_a.len(), 8);
    let ids = |d: &Dataset| d.records().iter().map(|r| r.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&train_a), ids(&train_b));
    assert_eq!(ids(&val_a), ids(&val_b));

    assert_eq!(train_a.vocabulary(), dataset.vocabulary());
    assert_eq!(val_a.vocabulary(), dataset.vocabulary());
    assert_eq!(dataset.vocabulary().codes(), &["IMI", "ISC_", "NORM"]);
}

#[test]
fn test_epoch_plans_differ_but_cover_all() {
    let first = BatchPlan::for_epoch(20, 4, 42, 0);
    let second = BatchPlan::for_epoch(20, 4, 42, 1);
    assert_ne!(first, second);
    let flatten = |p: &BatchPlan| {
        let mut all: Vec<usize> = p.batches().iter().flatten().copied().collect();
        all.sort_unstable();
        all
    };
    assert_eq!(flatten(&first), (0..20).collect::<Vec<_>>());
    assert_eq!(flatten(&second), (0..20).collect::<Vec<_>>());
}
