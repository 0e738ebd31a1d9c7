//! Full-table consistency check.
//!
//! Walks every list and cache entry and confirms that the incrementally
//! maintained state is exactly what a fresh construction from the same lists
//! would produce. Quadratic in the worst case; meant for tests, `--verify`
//! runs and debugging, not for the insertion path.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::inserter::IncrementalLof;
use crate::neighbor_index::NeighborIndex;
use crate::neighbors::{NeighborRef, ObjectId};
use crate::oracle::DistanceOracle;
use crate::score_cache::ScoreCache;

/// Relative tolerance for `sum1` against a fresh re-summation.
pub const SUM1_TOLERANCE: f64 = 1e-9;

impl<O: DistanceOracle> IncrementalLof<O> {
    /// Checks every table invariant.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` describing the first violation.
    pub fn verify(&self) -> Result<()> {
        verify_tables(self.neighbor_index(), self.score_cache())?;

        for (owner, list) in self.neighbor_index().iter() {
            for n in list {
                let expected = self.oracle().distance(owner, n.neighbor)?;
                if n.distance != expected {
                    return Err(Error::structural(format!(
                        "stored distance {} from {owner} to {} differs from oracle ({expected})",
                        n.distance, n.neighbor
                    )));
                }
            }
        }

        debug!(objects = self.len(), "consistency check passed");
        Ok(())
    }
}

/// Checks the neighbor graph and score cache against each other.
///
/// # Errors
///
/// Returns `StructuralInconsistency` describing the first violation.
pub fn verify_tables(index: &NeighborIndex, cache: &ScoreCache) -> Result<()> {
    let n = index.len();
    if cache.len() != n {
        return Err(Error::structural(format!(
            "{n} neighbor lists but {} cache entries",
            cache.len()
        )));
    }
    let expected_len = index.k().min(n.saturating_sub(1));

    let mut derived: FxHashMap<ObjectId, BTreeSet<NeighborRef>> = FxHashMap::default();

    for id in index.ids() {
        let list = index.neighbors_of(id)?;
        if list.len() != expected_len {
            return Err(Error::structural(format!(
                "object {id} has {} neighbors, expected {expected_len}",
                list.len()
            )));
        }
        if !list.is_sorted() {
            return Err(Error::structural(format!(
                "list of object {id} is not ordered by (distance, id)"
            )));
        }

        for (rank, entry) in list.iter().enumerate() {
            if entry.owner != id || entry.rank != rank {
                return Err(Error::structural(format!(
                    "slot {rank} of object {id} is labelled ({}, {})",
                    entry.owner, entry.rank
                )));
            }
            if entry.neighbor == id {
                return Err(Error::structural(format!("object {id} lists itself")));
            }
            let k_distance = index.neighbors_of(entry.neighbor)?.k_distance();
            let reach = entry.distance.max(k_distance);
            if entry.reachability_distance != reach {
                return Err(Error::structural(format!(
                    "reach({id}, {}) is {}, expected {reach}",
                    entry.neighbor, entry.reachability_distance
                )));
            }
            derived.entry(entry.neighbor).or_default().insert(entry.slot());
        }

        let scores = cache.get(id)?;
        if scores.sum2().len() != list.len() {
            return Err(Error::structural(format!(
                "sum2 of object {id} has {} slots for {} neighbors",
                scores.sum2().len(),
                list.len()
            )));
        }
        for (entry, cached) in list.iter().zip(scores.sum2()) {
            let actual = cache.get(entry.neighbor)?.sum1();
            if cached.to_bits() != actual.to_bits() {
                return Err(Error::structural(format!(
                    "sum2 of object {id} at rank {} caches {cached}, sum1({}) is {actual}",
                    entry.rank, entry.neighbor
                )));
            }
        }

        let fresh = list.sum_of_reachability_distances();
        if (scores.sum1() - fresh).abs() > SUM1_TOLERANCE * fresh.abs().max(1.0) {
            return Err(Error::structural(format!(
                "sum1 of object {id} is {}, re-summed {fresh}",
                scores.sum1()
            )));
        }
    }

    for id in index.ids() {
        let stored: BTreeSet<NeighborRef> = index.reverse_neighbors_of(id)?.into_iter().collect();
        let expected = derived.remove(&id).unwrap_or_default();
        if stored != expected {
            return Err(Error::structural(format!(
                "reverse adjacency of object {id} has {} slots, lists imply {}",
                stored.len(),
                expected.len()
            )));
        }
    }

    Ok(())
}
