//! Shared helpers for integration tests: a from-scratch LOF reference.

#![allow(dead_code)]

use lofstream_core::{
    local_outlier_factor, DistanceFunction, DistanceMetric, DistanceOracle, IncrementalLof,
    LinearScanOracle, ObjectId,
};

/// Scores of one object computed without any incremental state.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub neighbors: Vec<ObjectId>,
    pub distances: Vec<f64>,
    pub reachability: Vec<f64>,
    pub sum1: f64,
    pub sum2: Vec<f64>,
    pub lof: f64,
}

/// Batch LOF over the final dataset, ties broken by lower id.
pub fn reference_lof(points: &[Vec<f64>], k: usize, metric: DistanceMetric) -> Vec<ReferenceEntry> {
    let n = points.len();
    let knn: Vec<Vec<(f64, usize)>> = (0..n)
        .map(|i| {
            let mut others: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (metric.distance(&points[i], &points[j]), j))
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            others.truncate(k);
            others
        })
        .collect();

    let k_distance: Vec<f64> = knn
        .iter()
        .map(|list| list.last().map_or(0.0, |&(d, _)| d))
        .collect();

    let reachability: Vec<Vec<f64>> = knn
        .iter()
        .map(|list| list.iter().map(|&(d, j)| d.max(k_distance[j])).collect())
        .collect();
    let sum1: Vec<f64> = reachability.iter().map(|r| r.iter().sum()).collect();

    (0..n)
        .map(|i| {
            let sum2: Vec<f64> = knn[i].iter().map(|&(_, j)| sum1[j]).collect();
            ReferenceEntry {
                neighbors: knn[i].iter().map(|&(_, j)| j as ObjectId).collect(),
                distances: knn[i].iter().map(|&(d, _)| d).collect(),
                reachability: reachability[i].clone(),
                sum1: sum1[i],
                lof: local_outlier_factor(sum1[i], &sum2),
                sum2,
            }
        })
        .collect()
}

/// Inserts `points` in order into a fresh linear-scan engine.
pub fn build_engine(
    points: &[Vec<f64>],
    k: usize,
    metric: DistanceMetric,
) -> IncrementalLof<LinearScanOracle> {
    let mut engine =
        IncrementalLof::new(LinearScanOracle::new(metric, k), k).expect("engine");
    for point in points {
        engine.insert(point.clone()).expect("insert");
    }
    engine
}

/// `a ≈ b` with relative tolerance; infinities must match exactly.
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Compares every list and cache entry of `engine` with the reference.
///
/// Returns a description of the first mismatch.
pub fn compare_with_reference<O: DistanceOracle>(
    engine: &IncrementalLof<O>,
    reference: &[ReferenceEntry],
) -> Result<(), String> {
    if engine.len() != reference.len() {
        return Err(format!(
            "engine holds {} objects, reference {}",
            engine.len(),
            reference.len()
        ));
    }
    for (id, expected) in reference.iter().enumerate() {
        let id = id as ObjectId;
        let list = engine
            .neighbor_index()
            .neighbors_of(id)
            .map_err(|e| e.to_string())?;
        if list.neighbor_ids() != expected.neighbors {
            return Err(format!(
                "object {id}: neighbors {:?}, expected {:?}",
                list.neighbor_ids(),
                expected.neighbors
            ));
        }
        for (entry, (&d, &reach)) in list
            .iter()
            .zip(expected.distances.iter().zip(&expected.reachability))
        {
            if entry.distance.to_bits() != d.to_bits()
                || entry.reachability_distance.to_bits() != reach.to_bits()
            {
                return Err(format!(
                    "object {id} rank {}: (d, reach) = ({}, {}), expected ({d}, {reach})",
                    entry.rank, entry.distance, entry.reachability_distance
                ));
            }
        }

        let scores = engine.score_cache().get(id).map_err(|e| e.to_string())?;
        if !approx_eq(scores.sum1(), expected.sum1) {
            return Err(format!(
                "object {id}: sum1 {}, expected {}",
                scores.sum1(),
                expected.sum1
            ));
        }
        if scores.sum2().len() != expected.sum2.len()
            || !scores
                .sum2()
                .iter()
                .zip(&expected.sum2)
                .all(|(&a, &b)| approx_eq(a, b))
        {
            return Err(format!(
                "object {id}: sum2 {:?}, expected {:?}",
                scores.sum2(),
                expected.sum2
            ));
        }
        let lof = engine.lof(id).map_err(|e| e.to_string())?;
        if !approx_eq(lof, expected.lof) {
            return Err(format!("object {id}: lof {lof}, expected {}", expected.lof));
        }
    }
    Ok(())
}
