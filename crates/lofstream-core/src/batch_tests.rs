//! Tests for `batch` module

use super::batch::*;
use super::config::LofConfig;
use super::distance::DistanceMetric;
use super::error::{Error, OracleError};
use super::inserter::IncrementalLof;
use super::oracle::LinearScanOracle;

fn golden_points() -> Vec<Vec<f64>> {
    [0.0, 1.0, 2.0, 3.0, 10.0].iter().map(|&x| vec![x]).collect()
}

fn k2_config() -> LofConfig {
    let mut config = LofConfig::default();
    config.lof.k = 2;
    config
}

#[test]
fn test_score_batch_golden() {
    let mut engine =
        IncrementalLof::new(LinearScanOracle::new(DistanceMetric::Euclidean, 2), 2).expect("engine");

    let scores = score_batch(&mut engine, golden_points()).expect("batch");

    assert_eq!(scores.len(), 5);
    assert!((scores[4].lof - 5.0).abs() < 1e-12);
    assert!(scores[..4].iter().all(|s| s.lof < 2.0));
}

#[test]
fn test_score_batch_empty_input() {
    let mut engine =
        IncrementalLof::new(LinearScanOracle::new(DistanceMetric::Euclidean, 2), 2).expect("engine");

    let scores = score_batch(&mut engine, Vec::<Vec<f64>>::new()).expect("batch");

    assert!(scores.is_empty());
}

#[test]
fn test_score_batch_stops_at_first_error() {
    let mut engine =
        IncrementalLof::new(LinearScanOracle::new(DistanceMetric::Euclidean, 2), 2).expect("engine");
    let vectors = vec![vec![0.0], vec![f64::INFINITY], vec![1.0]];

    let err = score_batch(&mut engine, vectors).expect_err("invalid vector");

    assert!(matches!(err, Error::Oracle(OracleError::InvalidVector(_))));
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_lof_batch_run_from_config() {
    let batch = LofBatch::from_config(&k2_config()).expect("batch");

    let scores = batch.run(golden_points()).expect("run");

    assert!((scores[4].lof - 5.0).abs() < 1e-12);
}

#[test]
fn test_lof_batch_stats_and_callback() {
    // Arrange
    let mut batch = LofBatch::from_config(&k2_config()).expect("batch");
    let mut seen = Vec::new();

    // Act
    batch
        .extend_with(golden_points(), |report| seen.push(report.id))
        .expect("extend");

    // Assert
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    let stats = batch.stats();
    assert_eq!(stats.inserted, 5);
    // Only inserting 3 pushes a neighbor (0) out of a full list.
    assert_eq!(stats.evictions, 1);
    assert!(stats.sum2_updates > 0);
    batch.engine().verify().expect("consistent");
}

#[test]
fn test_lof_batch_rejects_invalid_config() {
    let mut config = LofConfig::default();
    config.logging.format = "xml".to_string();

    assert!(matches!(
        LofBatch::from_config(&config),
        Err(Error::Config(_))
    ));
}
