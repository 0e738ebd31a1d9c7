//! Incremental insertion: keeps neighbor graph and score cache in step with
//! a growing dataset.
//!
//! # Algorithm
//!
//! For a new object `o`:
//!
//! 1. Ask the oracle for `kNN(o)` and for `R(o)`, the existing objects whose
//!    k nearest neighbors now include `o`.
//! 2. Seed `o`'s list and cache entry. `sum2(o)` reads the current `sum1` of
//!    each neighbor; any later change to those sums in this insertion is
//!    pushed to `o` through reverse adjacency like to every other holder.
//! 3. For every `p` in `R(o)`: splice `o` into `p`'s list (evicting the old
//!    k-th neighbor), adjust `sum1(p)` by a constant-time delta, and push the
//!    new `sum1(p)` to everyone holding `p` (first hop). If `k_distance(p)`
//!    moved, the reachability distance of every holder `q` towards `p` is
//!    recomputed; a changed `sum1(q)` is pushed to everyone holding `q`
//!    (second hop).
//!
//! Propagation ends there: `sum2` only ever caches a direct neighbor's
//! `sum1`, so no third hop can be affected.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, error, trace};

use crate::config::LofConfig;
use crate::error::{Error, Result};
use crate::lof::LofScore;
use crate::neighbor_index::NeighborIndex;
use crate::neighbors::{Neighbor, NeighborRef, ObjectId};
use crate::oracle::{DistanceOracle, LinearScanOracle, QueryResult};
use crate::score_cache::ScoreCache;

/// What one insertion did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsertReport {
    /// Identifier assigned to the inserted object.
    pub id: ObjectId,
    /// Size of the new object's own neighbor list.
    pub neighbors: usize,
    /// Number of existing objects that gained the new object as neighbor.
    pub reverse_neighbors: usize,
    /// Neighbors pushed out of full lists.
    pub evictions: usize,
    /// Value-only `sum2` refreshes in both cascade hops.
    pub sum2_updates: usize,
    /// Stored reachability distances rewritten in place.
    pub reachability_updates: usize,
    /// Every object whose list or cache entry was written.
    pub touched: BTreeSet<ObjectId>,
}

/// Incremental LOF engine over a [`DistanceOracle`].
///
/// Owns the neighbor graph and the score cache exclusively; insertions are
/// processed one at a time through `&mut self`.
///
/// # Example
///
/// ```rust
/// use lofstream_core::{DistanceMetric, IncrementalLof, LinearScanOracle};
///
/// let oracle = LinearScanOracle::new(DistanceMetric::Euclidean, 2);
/// let mut engine = IncrementalLof::new(oracle, 2)?;
/// for x in [0.0, 1.0, 2.0, 3.0, 10.0] {
///     engine.insert(vec![x])?;
/// }
/// assert!((engine.lof(4)? - 5.0).abs() < 1e-9);
/// # Ok::<(), lofstream_core::Error>(())
/// ```
#[derive(Debug)]
pub struct IncrementalLof<O: DistanceOracle> {
    k: usize,
    oracle: O,
    index: NeighborIndex,
    cache: ScoreCache,
    poisoned: Option<String>,
}

impl IncrementalLof<LinearScanOracle> {
    /// Builds an engine with a [`LinearScanOracle`] from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration does not validate.
    pub fn from_config(config: &LofConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.tables.initial_capacity;
        let oracle = LinearScanOracle::with_capacity(config.distance, config.lof.k, capacity);
        Self::with_capacity(oracle, config.lof.k, capacity)
    }
}

impl<O: DistanceOracle> IncrementalLof<O> {
    /// Creates an engine over an empty oracle.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `k == 0` or the oracle already holds objects.
    pub fn new(oracle: O, k: usize) -> Result<Self> {
        Self::with_capacity(oracle, k, 0)
    }

    /// Creates an engine with tables pre-sized for `capacity` objects.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `k == 0` or the oracle already holds objects.
    pub fn with_capacity(oracle: O, k: usize, capacity: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::Config("k must be at least 1".to_string()));
        }
        if !oracle.is_empty() {
            return Err(Error::Config(format!(
                "oracle already holds {} objects unknown to the engine",
                oracle.len()
            )));
        }
        Ok(Self {
            k,
            oracle,
            index: NeighborIndex::with_capacity(k, capacity),
            cache: ScoreCache::with_capacity(k, capacity),
            poisoned: None,
        })
    }

    /// Neighborhood size.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of inserted objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns true once a failed insertion has left the tables unusable.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// The oracle.
    #[must_use]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// The neighbor graph.
    #[must_use]
    pub fn neighbor_index(&self) -> &NeighborIndex {
        &self.index
    }

    /// The score cache.
    #[must_use]
    pub fn score_cache(&self) -> &ScoreCache {
        &self.cache
    }

    /// Current LOF of `id`, computed from its cached sums.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if `id` was never inserted.
    pub fn lof(&self, id: ObjectId) -> Result<f64> {
        Ok(self.cache.get(id)?.lof())
    }

    /// LOF of every inserted object, ascending by id.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if the tables disagree on membership.
    pub fn lof_scores(&self) -> Result<Vec<LofScore>> {
        self.index
            .ids()
            .into_iter()
            .map(|id| self.lof(id).map(|lof| LofScore { id, lof }))
            .collect()
    }

    /// Inserts a feature vector and updates every affected score.
    ///
    /// A vector rejected by the oracle leaves the engine untouched. Any
    /// failure after the oracle accepted the vector aborts the insertion
    /// half-way and poisons the engine.
    ///
    /// # Errors
    ///
    /// Returns `Poisoned` after an earlier failure, `Oracle` for rejected
    /// vectors, and `StructuralInconsistency` / `DuplicateObject` when the
    /// tables and the oracle disagree.
    pub fn insert(&mut self, vector: Vec<f64>) -> Result<InsertReport> {
        if let Some(reason) = &self.poisoned {
            return Err(Error::Poisoned(reason.clone()));
        }

        let id = self.oracle.insert(vector)?;
        match self.apply_insertion(id) {
            Ok(report) => {
                debug!(
                    id,
                    neighbors = report.neighbors,
                    reverse_neighbors = report.reverse_neighbors,
                    evictions = report.evictions,
                    sum2_updates = report.sum2_updates,
                    reachability_updates = report.reachability_updates,
                    touched = report.touched.len(),
                    "inserted object"
                );
                Ok(report)
            }
            Err(err) => {
                error!(id, error = %err, "insertion failed, engine poisoned");
                self.poisoned = Some(format!("insertion of object {id} failed: {err}"));
                Err(err)
            }
        }
    }

    fn apply_insertion(&mut self, o: ObjectId) -> Result<InsertReport> {
        if self.index.contains(o) {
            return Err(Error::DuplicateObject(o));
        }

        let knn = self.query_neighbors(o)?;
        let rknn = self.query_reverse_neighbors(o)?;
        trace!(
            id = o,
            knn = ?knn.iter().map(|r| r.id).collect::<Vec<_>>(),
            rknn = ?rknn.iter().map(|r| r.id).collect::<Vec<_>>(),
            "neighborhood of inserted object"
        );

        let mut report = InsertReport {
            id: o,
            neighbors: knn.len(),
            reverse_neighbors: rknn.len(),
            ..InsertReport::default()
        };
        report.touched.insert(o);

        self.seed(o, &knn)?;
        let k_distance_o = self.index.neighbors_of(o)?.k_distance();

        for hit in &rknn {
            self.admit(hit.id, o, k_distance_o, &mut report)?;
        }

        Ok(report)
    }

    /// kNN of `o` without `o` itself.
    ///
    /// The self entry is removed by identity: an earlier duplicate of the
    /// same vector sorts before `o` at distance 0. With more than `k` such
    /// duplicates `o` drops out of the answer entirely, and the first `k`
    /// entries are already its neighbors.
    fn query_neighbors(&self, o: ObjectId) -> Result<Vec<QueryResult>> {
        let mut knn = self.oracle.k_nearest(o, self.k + 1)?;
        if let Some(own) = knn.iter().position(|r| r.id == o) {
            knn.remove(own);
        } else if knn.len() <= self.k || knn.iter().any(|r| r.distance != 0.0 || r.id > o) {
            return Err(Error::structural(format!(
                "kNN answer for object {o} omits it without {} earlier duplicates",
                self.k + 1
            )));
        }
        knn.truncate(self.k);

        let expected = self.k.min(self.index.len());
        if knn.len() != expected {
            return Err(Error::structural(format!(
                "kNN answer for object {o} has {} neighbors, expected {expected}",
                knn.len()
            )));
        }
        Ok(knn)
    }

    /// Reverse kNN of `o`, deduplicated and in ascending id order.
    fn query_reverse_neighbors(&self, o: ObjectId) -> Result<Vec<QueryResult>> {
        let mut rknn = self.oracle.reverse_k_nearest(o, self.k)?;
        rknn.retain(|r| r.id != o);
        rknn.sort_by_key(|r| r.id);
        rknn.dedup_by_key(|r| r.id);
        Ok(rknn)
    }

    /// Creates the list and cache entry of `o`.
    fn seed(&mut self, o: ObjectId, knn: &[QueryResult]) -> Result<()> {
        let mut slots = Vec::with_capacity(knn.len());
        let mut sum1 = 0.0;
        let mut sum2 = Vec::with_capacity(knn.len());

        for (rank, hit) in knn.iter().enumerate() {
            let p = hit.id;
            let reach = hit.distance.max(self.index.neighbors_of(p)?.k_distance());
            slots.push(Neighbor::new(o, rank, p, reach, hit.distance));
            sum1 += reach;
            // Read before any p is touched below.
            sum2.push(self.cache.get(p)?.sum1());
        }

        self.index.insert_initial(o, slots)?;
        self.cache.insert(o, sum1, sum2)
    }

    /// Splices `o` into the list of `p` and propagates the consequences.
    fn admit(
        &mut self,
        p: ObjectId,
        o: ObjectId,
        k_distance_o: f64,
        report: &mut InsertReport,
    ) -> Result<()> {
        let distance_po = self.oracle.distance(p, o)?;
        let reach_po = k_distance_o.max(distance_po);

        let (rank, old_k_distance) = {
            let list = self.index.neighbors_of(p)?;
            (list.insertion_rank(distance_po, o), list.k_distance())
        };
        if rank >= self.k {
            return Err(Error::structural(format!(
                "object {o} reported as reverse neighbor of {p} but ranks beyond k"
            )));
        }

        let evicted =
            self.index
                .insert_and_move(p, rank, Neighbor::new(p, rank, o, reach_po, distance_po))?;
        let new_k_distance = self.index.neighbors_of(p)?.k_distance();
        report.touched.insert(p);
        if evicted.is_some() {
            report.evictions += 1;
        }

        let sum1_o = self.cache.get(o)?.sum1();
        let sum1_p = {
            let mut entry = self.cache.get_for_update(p)?;
            let lost = evicted.map_or(0.0, |e| e.reachability_distance);
            let value = entry.sum1() + (reach_po - lost);
            entry.set_sum1(value);
            entry.insert_and_move_sum2(rank, sum1_o)?;
            value
        };

        // First hop: everyone holding p caches sum1(p).
        let holders = self.index.reverse_neighbors_of(p)?;
        for slot in &holders {
            self.cache
                .get_for_update(slot.owner)?
                .set_sum2(slot.rank, sum1_p)?;
            report.sum2_updates += 1;
            report.touched.insert(slot.owner);
        }

        // Second hop: reach(q, p) depends on k_distance(p).
        if new_k_distance != old_k_distance {
            for slot in &holders {
                self.refresh_reachability(*slot, p, new_k_distance, report)?;
            }
        }
        Ok(())
    }

    /// Recomputes `reach(q, p)` at `slot = (q, j)` and pushes a changed
    /// `sum1(q)` to everyone holding `q`.
    fn refresh_reachability(
        &mut self,
        slot: NeighborRef,
        p: ObjectId,
        k_distance_p: f64,
        report: &mut InsertReport,
    ) -> Result<()> {
        let entry = *self.index.neighbor_at(slot)?;
        if entry.neighbor != p {
            return Err(Error::structural(format!(
                "back-link ({}, {}) of object {p} points at object {}",
                slot.owner, slot.rank, entry.neighbor
            )));
        }

        let reach_new = entry.distance.max(k_distance_p);
        if reach_new == entry.reachability_distance {
            return Ok(());
        }
        let reach_old = self.index.set_reachability_distance_only(slot, reach_new)?;
        report.reachability_updates += 1;

        let q = slot.owner;
        report.touched.insert(q);
        let sum1_q = {
            let mut entry = self.cache.get_for_update(q)?;
            let value = entry.sum1() + (reach_new - reach_old);
            entry.set_sum1(value);
            value
        };

        for back in self.index.reverse_neighbors_for_update(q)? {
            self.cache
                .get_for_update(back.owner)?
                .set_sum2(back.rank, sum1_q)?;
            report.sum2_updates += 1;
            report.touched.insert(back.owner);
        }
        Ok(())
    }
}
