//! Exact linear-scan oracle.
//!
//! kNN queries scan every stored vector. Reverse kNN queries are answered
//! from per-object "horizons": each object keeps its `max_k` nearest other
//! objects, refreshed as new vectors arrive, so deciding whether a new
//! object entered someone's neighborhood is a lookup rather than a scan.

use tracing::trace;

use super::{DistanceOracle, OracleResult, QueryResult};
use crate::distance::{DistanceFunction, DistanceMetric};
use crate::error::OracleError;
use crate::neighbors::ObjectId;
use crate::ordered_float::DistanceKey;

/// In-memory exact oracle over an injected distance function.
#[derive(Debug, Clone)]
pub struct LinearScanOracle<D: DistanceFunction = DistanceMetric> {
    distance: D,
    max_k: usize,
    dimension: Option<usize>,
    vectors: Vec<Vec<f64>>,
    /// Per object: nearest other objects, ascending, at most `max_k`.
    horizons: Vec<Vec<DistanceKey>>,
}

impl<D: DistanceFunction> LinearScanOracle<D> {
    /// Creates an empty oracle.
    ///
    /// `max_k` bounds the reverse-kNN queries answered from horizons;
    /// larger `k` falls back to an exact quadratic scan.
    #[must_use]
    pub fn new(distance: D, max_k: usize) -> Self {
        Self::with_capacity(distance, max_k, 0)
    }

    /// Creates an empty oracle with room for `capacity` vectors.
    #[must_use]
    pub fn with_capacity(distance: D, max_k: usize, capacity: usize) -> Self {
        Self {
            distance,
            max_k,
            dimension: None,
            vectors: Vec::with_capacity(capacity),
            horizons: Vec::with_capacity(capacity),
        }
    }

    /// The injected distance function.
    #[must_use]
    pub fn distance_function(&self) -> &D {
        &self.distance
    }

    /// Stored vector of `id`.
    #[must_use]
    pub fn vector(&self, id: ObjectId) -> Option<&[f64]> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.vectors.get(idx))
            .map(Vec::as_slice)
    }

    fn index_of(&self, id: ObjectId) -> OracleResult<usize> {
        usize::try_from(id)
            .ok()
            .filter(|idx| *idx < self.vectors.len())
            .ok_or(OracleError::UnknownObject(id))
    }

    fn validate(&self, vector: &[f64]) -> OracleResult<()> {
        if vector.is_empty() {
            return Err(OracleError::InvalidVector("vector is empty".to_string()));
        }
        if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
            return Err(OracleError::InvalidVector(format!(
                "component {pos} is not finite"
            )));
        }
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(OracleError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Exact reverse kNN by counting, for `k` beyond the horizons.
    fn reverse_by_scan(&self, target: usize, k: usize) -> Vec<QueryResult> {
        let target_id = target as ObjectId;
        let mut result = Vec::new();
        for (p, vp) in self.vectors.iter().enumerate() {
            if p == target {
                continue;
            }
            let key = DistanceKey::new(self.distance.distance(vp, &self.vectors[target]), target_id);
            let closer = self
                .vectors
                .iter()
                .enumerate()
                .filter(|(x, _)| *x != p && *x != target)
                .filter(|(x, vx)| DistanceKey::new(self.distance.distance(vp, vx), *x as ObjectId) < key)
                .take(k)
                .count();
            if closer < k {
                result.push(QueryResult::new(p as ObjectId, key.distance.0));
            }
        }
        result
    }
}

impl<D: DistanceFunction> DistanceOracle for LinearScanOracle<D> {
    fn insert(&mut self, vector: Vec<f64>) -> OracleResult<ObjectId> {
        self.validate(&vector)?;
        self.dimension.get_or_insert(vector.len());

        let id = self.vectors.len() as ObjectId;
        let mut own = Vec::with_capacity(self.max_k + 1);
        for (p, (vp, horizon)) in self.vectors.iter().zip(self.horizons.iter_mut()).enumerate() {
            let d = self.distance.distance(vp, &vector);
            offer(horizon, DistanceKey::new(d, id), self.max_k);
            offer(&mut own, DistanceKey::new(d, p as ObjectId), self.max_k);
        }
        self.vectors.push(vector);
        self.horizons.push(own);

        trace!(id, size = self.vectors.len(), "oracle registered vector");
        Ok(id)
    }

    fn distance(&self, a: ObjectId, b: ObjectId) -> OracleResult<f64> {
        let a = self.index_of(a)?;
        let b = self.index_of(b)?;
        Ok(self.distance.distance(&self.vectors[a], &self.vectors[b]))
    }

    fn k_nearest(&self, id: ObjectId, k: usize) -> OracleResult<Vec<QueryResult>> {
        let query = &self.vectors[self.index_of(id)?];
        let mut keys: Vec<DistanceKey> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(j, v)| DistanceKey::new(self.distance.distance(query, v), j as ObjectId))
            .collect();
        if k < keys.len() {
            keys.select_nth_unstable(k);
            keys.truncate(k);
        }
        keys.sort_unstable();
        Ok(keys
            .into_iter()
            .map(|key| QueryResult::new(key.id, key.distance.0))
            .collect())
    }

    fn reverse_k_nearest(&self, id: ObjectId, k: usize) -> OracleResult<Vec<QueryResult>> {
        let target = self.index_of(id)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        if k > self.max_k {
            return Ok(self.reverse_by_scan(target, k));
        }
        Ok(self
            .horizons
            .iter()
            .enumerate()
            .filter(|(p, _)| *p != target)
            .filter_map(|(p, horizon)| {
                horizon
                    .iter()
                    .take(k)
                    .find(|key| key.id == id)
                    .map(|key| QueryResult::new(p as ObjectId, key.distance.0))
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

/// Inserts `key` into the sorted `horizon` if it is among the `cap` best.
fn offer(horizon: &mut Vec<DistanceKey>, key: DistanceKey, cap: usize) {
    if cap == 0 {
        return;
    }
    if horizon.len() >= cap && horizon.last().is_some_and(|last| key >= *last) {
        return;
    }
    let pos = horizon.partition_point(|existing| *existing < key);
    horizon.insert(pos, key);
    horizon.truncate(cap);
}
