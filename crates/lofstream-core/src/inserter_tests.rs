//! Tests for `inserter` module

use super::distance::DistanceMetric;
use super::error::{Error, OracleError};
use super::inserter::*;
use super::neighbors::ObjectId;
use super::oracle::{DistanceOracle, LinearScanOracle, OracleResult, QueryResult};

fn engine(k: usize) -> IncrementalLof<LinearScanOracle> {
    IncrementalLof::new(LinearScanOracle::new(DistanceMetric::Euclidean, k), k).expect("engine")
}

fn line_engine(xs: &[f64], k: usize) -> IncrementalLof<LinearScanOracle> {
    let mut engine = engine(k);
    for &x in xs {
        engine.insert(vec![x]).expect("insert");
    }
    engine
}

/// Claims every other object as reverse neighbor.
struct OverreportingOracle(LinearScanOracle);

impl DistanceOracle for OverreportingOracle {
    fn insert(&mut self, vector: Vec<f64>) -> OracleResult<ObjectId> {
        self.0.insert(vector)
    }

    fn distance(&self, a: ObjectId, b: ObjectId) -> OracleResult<f64> {
        self.0.distance(a, b)
    }

    fn k_nearest(&self, id: ObjectId, k: usize) -> OracleResult<Vec<QueryResult>> {
        self.0.k_nearest(id, k)
    }

    fn reverse_k_nearest(&self, id: ObjectId, _k: usize) -> OracleResult<Vec<QueryResult>> {
        (0..self.0.len() as ObjectId)
            .map(|p| Ok(QueryResult::new(p, self.0.distance(p, id)?)))
            .collect()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.0.dimension()
    }
}

/// Hands out id 0 for every vector.
struct StuckIdOracle(LinearScanOracle);

impl DistanceOracle for StuckIdOracle {
    fn insert(&mut self, vector: Vec<f64>) -> OracleResult<ObjectId> {
        self.0.insert(vector).map(|_| 0)
    }

    fn distance(&self, a: ObjectId, b: ObjectId) -> OracleResult<f64> {
        self.0.distance(a, b)
    }

    fn k_nearest(&self, id: ObjectId, k: usize) -> OracleResult<Vec<QueryResult>> {
        self.0.k_nearest(id, k)
    }

    fn reverse_k_nearest(&self, id: ObjectId, k: usize) -> OracleResult<Vec<QueryResult>> {
        self.0.reverse_k_nearest(id, k)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.0.dimension()
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_rejects_zero_k() {
    let result = IncrementalLof::new(LinearScanOracle::new(DistanceMetric::Euclidean, 1), 0);

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_new_rejects_populated_oracle() {
    let mut oracle = LinearScanOracle::new(DistanceMetric::Euclidean, 2);
    oracle.insert(vec![1.0]).expect("insert");

    let result = IncrementalLof::new(oracle, 2);

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_from_config_uses_configured_k_and_metric() {
    let mut config = crate::config::LofConfig::default();
    config.lof.k = 3;
    config.distance = DistanceMetric::Manhattan;

    let engine = IncrementalLof::from_config(&config).expect("engine");

    assert_eq!(engine.k(), 3);
    assert_eq!(
        *engine.oracle().distance_function(),
        DistanceMetric::Manhattan
    );
    assert!(engine.is_empty());
}

#[test]
fn test_from_config_rejects_invalid_config() {
    let mut config = crate::config::LofConfig::default();
    config.lof.k = 0;

    assert!(matches!(
        IncrementalLof::from_config(&config),
        Err(Error::Config(_))
    ));
}

// ============================================================================
// Insertion
// ============================================================================

#[test]
fn test_first_object_has_no_neighbors() {
    let mut engine = engine(2);

    let report = engine.insert(vec![4.0]).expect("insert");

    assert_eq!(report.id, 0);
    assert_eq!(report.neighbors, 0);
    assert_eq!(report.reverse_neighbors, 0);
    assert!(engine.neighbor_index().neighbors_of(0).expect("list").is_empty());
    assert_eq!(engine.lof(0).expect("lof"), 1.0);
}

#[test]
fn test_golden_outlier_scores_five() {
    // Arrange & Act
    let engine = line_engine(&[0.0, 1.0, 2.0, 3.0, 10.0], 2);

    // Assert
    let entry = engine.score_cache().get(4).expect("entry");
    assert_eq!(entry.sum1(), 15.0);
    assert_eq!(entry.sum2(), &[3.0, 3.0]);
    let lof = engine.lof(4).expect("lof");
    assert!((lof - 5.0).abs() < 1e-12, "got {lof}");
    engine.verify().expect("consistent");
}

#[test]
fn test_report_of_insertion_with_eviction_and_second_hop() {
    // 0, 1, 2 on a line; 3 displaces 0 from the list of 2 and shrinks
    // k_distance(2) from 2 to 1.
    let mut engine = line_engine(&[0.0, 1.0, 2.0], 2);

    let report = engine.insert(vec![3.0]).expect("insert");

    assert_eq!(report.id, 3);
    assert_eq!(report.neighbors, 2);
    assert_eq!(report.reverse_neighbors, 1);
    assert_eq!(report.evictions, 1);
    // reach(1, 2) and reach(3, 2) drop from 2 to 1; reach(0, 2) stays 2.
    assert_eq!(report.reachability_updates, 2);
    assert!(report.touched.contains(&1));
    assert!(report.touched.contains(&2));
    assert!(report.touched.contains(&3));
    assert_eq!(
        engine.neighbor_index().neighbors_of(2).expect("list").neighbor_ids(),
        vec![1, 3]
    );
    engine.verify().expect("consistent");
}

#[test]
fn test_far_outlier_touches_nothing_else() {
    let mut engine = line_engine(&[0.0, 1.0, 2.0, 3.0], 2);

    let report = engine.insert(vec![10.0]).expect("insert");

    assert_eq!(report.reverse_neighbors, 0);
    assert_eq!(report.touched.len(), 1);
    assert!(report.touched.contains(&4));
}

#[test]
fn test_warm_up_lists_grow_to_n_minus_one() {
    let mut engine = engine(3);

    for (n, x) in [0.0, 1.0, 2.0].into_iter().enumerate() {
        engine.insert(vec![x]).expect("insert");
        for id in engine.neighbor_index().ids() {
            let list = engine.neighbor_index().neighbors_of(id).expect("list");
            assert_eq!(list.len(), n, "object {id} after {} insertions", n + 1);
        }
        engine.verify().expect("consistent");
    }
}

#[test]
fn test_duplicate_vectors_exclude_self_by_identity() {
    // Arrange
    let mut engine = engine(2);

    // Act
    for x in [0.0, 0.0, 0.0, 5.0] {
        engine.insert(vec![x]).expect("insert");
    }

    // Assert
    assert_eq!(
        engine.neighbor_index().neighbors_of(1).expect("list").neighbor_ids(),
        vec![0, 2]
    );
    assert_eq!(engine.lof(0).expect("lof"), 1.0);
    assert!(engine.lof(3).expect("lof").is_infinite());
    engine.verify().expect("consistent");
}

#[test]
fn test_more_than_k_duplicates_keep_lowest_ids() {
    // Arrange: k + 3 copies push later copies out of their own kNN answer.
    let mut engine = engine(2);

    // Act
    for _ in 0..5 {
        engine.insert(vec![0.0]).expect("duplicate");
    }
    let report = engine.insert(vec![7.0]).expect("distinct");

    // Assert
    assert!(!engine.is_poisoned());
    assert_eq!(report.id, 5);
    for id in 3..=5 {
        assert_eq!(
            engine.neighbor_index().neighbors_of(id).expect("list").neighbor_ids(),
            vec![0, 1]
        );
    }
    for id in 0..5 {
        assert_eq!(engine.lof(id).expect("lof"), 1.0);
    }
    assert!(engine.lof(5).expect("lof").is_infinite());
    engine.verify().expect("consistent");
}

#[test]
fn test_lof_scores_ascending_by_id() {
    let engine = line_engine(&[0.0, 1.0, 2.0, 3.0, 10.0], 2);

    let scores = engine.lof_scores().expect("scores");

    let ids: Vec<ObjectId> = scores.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert!((scores[4].lof - 5.0).abs() < 1e-12);
}

#[test]
fn test_lof_of_unknown_object() {
    let engine = line_engine(&[0.0], 2);

    assert!(matches!(
        engine.lof(7),
        Err(Error::StructuralInconsistency(_))
    ));
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_rejected_vector_does_not_poison() {
    let mut engine = line_engine(&[0.0, 1.0], 2);

    let err = engine.insert(vec![1.0, 2.0]).expect_err("dimension");

    assert!(matches!(
        err,
        Error::Oracle(OracleError::DimensionMismatch { .. })
    ));
    assert!(!engine.is_poisoned());
    engine.insert(vec![2.0]).expect("still usable");
    assert_eq!(engine.len(), 3);
}

#[test]
fn test_structural_failure_poisons_engine() {
    // Arrange
    let oracle = OverreportingOracle(LinearScanOracle::new(DistanceMetric::Euclidean, 1));
    let mut engine = IncrementalLof::new(oracle, 1).expect("engine");
    engine.insert(vec![0.0]).expect("insert");
    engine.insert(vec![1.0]).expect("insert");

    // Act: 2 is not among the single nearest neighbor of 0.
    let err = engine.insert(vec![2.0]).expect_err("over-reported");

    // Assert
    assert!(matches!(err, Error::StructuralInconsistency(_)));
    assert!(engine.is_poisoned());
    let next = engine.insert(vec![3.0]).expect_err("poisoned");
    assert!(matches!(next, Error::Poisoned(_)));
    assert_eq!(next.code(), "LOF-005");
}

#[test]
fn test_reused_id_is_duplicate_object() {
    let oracle = StuckIdOracle(LinearScanOracle::new(DistanceMetric::Euclidean, 2));
    let mut engine = IncrementalLof::new(oracle, 2).expect("engine");
    engine.insert(vec![0.0]).expect("insert");

    let err = engine.insert(vec![1.0]).expect_err("reused id");

    assert!(matches!(err, Error::DuplicateObject(0)));
    assert!(engine.is_poisoned());
}
