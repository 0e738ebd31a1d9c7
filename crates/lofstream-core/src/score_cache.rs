//! Cached partial sums from which LOF values are derived.
//!
//! For an object `o` with neighbor list `N(o)`:
//!
//! - `sum1(o) = Σ_i reach(o, N(o)[i])`
//! - `sum2(o)[i] = sum1(N(o)[i])`
//!
//! `sum2` is index-aligned with the neighbor list, so every structural
//! splice of the list has a matching [`ScoreEntryMut::insert_and_move_sum2`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lof;
use crate::neighbors::ObjectId;

/// Cached sums of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    sum1: f64,
    sum2: Vec<f64>,
}

impl ScoreEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(sum1: f64, sum2: Vec<f64>) -> Self {
        Self { sum1, sum2 }
    }

    /// Sum of the object's reachability distances to its neighbors.
    #[must_use]
    pub fn sum1(&self) -> f64 {
        self.sum1
    }

    /// `sum1` of each neighbor, in rank order.
    #[must_use]
    pub fn sum2(&self) -> &[f64] {
        &self.sum2
    }

    /// Local outlier factor derived from the cached sums.
    #[must_use]
    pub fn lof(&self) -> f64 {
        lof::local_outlier_factor(self.sum1, &self.sum2)
    }

    /// Bitwise equality.
    #[must_use]
    pub fn same_bits(&self, other: &Self) -> bool {
        self.sum1.to_bits() == other.sum1.to_bits()
            && self.sum2.len() == other.sum2.len()
            && self
                .sum2
                .iter()
                .zip(&other.sum2)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Per-object [`ScoreEntry`] table.
#[derive(Debug, Clone)]
pub struct ScoreCache {
    k: usize,
    entries: FxHashMap<ObjectId, ScoreEntry>,
}

impl ScoreCache {
    /// Creates an empty cache for sum2 arrays of capacity `k`.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self::with_capacity(k, 0)
    }

    /// Creates an empty cache with room for `capacity` objects.
    #[must_use]
    pub fn with_capacity(k: usize, capacity: usize) -> Self {
        let mut entries = FxHashMap::default();
        entries.reserve(capacity);
        Self { k, entries }
    }

    /// Number of cached objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores the entry of a newly inserted object.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateObject` if `id` is already cached and
    /// `StructuralInconsistency` if `sum2` exceeds `k`.
    pub fn insert(&mut self, id: ObjectId, sum1: f64, sum2: Vec<f64>) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(Error::DuplicateObject(id));
        }
        if sum2.len() > self.k {
            return Err(Error::structural(format!(
                "sum2 of object {id} has {} entries, capacity is {}",
                sum2.len(),
                self.k
            )));
        }
        self.entries.insert(id, ScoreEntry::new(sum1, sum2));
        Ok(())
    }

    /// Entry of `id`.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if `id` is not cached.
    pub fn get(&self, id: ObjectId) -> Result<&ScoreEntry> {
        self.entries
            .get(&id)
            .ok_or_else(|| Error::structural(format!("no score entry for object {id}")))
    }

    /// Mutable handle on the entry of `id`.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if `id` is not cached.
    pub fn get_for_update(&mut self, id: ObjectId) -> Result<ScoreEntryMut<'_>> {
        let k = self.k;
        self.entries
            .get_mut(&id)
            .map(|entry| ScoreEntryMut { id, k, entry })
            .ok_or_else(|| Error::structural(format!("no score entry for object {id}")))
    }

    /// Iterates all `(id, entry)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ScoreEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }
}

/// Mutable view of one cached entry.
#[derive(Debug)]
pub struct ScoreEntryMut<'a> {
    id: ObjectId,
    k: usize,
    entry: &'a mut ScoreEntry,
}

impl ScoreEntryMut<'_> {
    /// Current `sum1`.
    #[must_use]
    pub fn sum1(&self) -> f64 {
        self.entry.sum1
    }

    /// Overwrites `sum1`.
    pub fn set_sum1(&mut self, value: f64) {
        self.entry.sum1 = value;
    }

    /// Cached `sum1` of the neighbor at `rank`.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` for a rank outside the array.
    pub fn sum2(&self, rank: usize) -> Result<f64> {
        self.entry
            .sum2
            .get(rank)
            .copied()
            .ok_or_else(|| self.bad_rank(rank))
    }

    /// Structural insertion: puts `value` at `rank` and shifts the tail.
    ///
    /// Mirrors `NeighborIndex::insert_and_move` on the same owner and rank;
    /// the last slot is dropped when the array is full.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` for a rank outside
    /// `[0, min(len, k-1)]`.
    pub fn insert_and_move_sum2(&mut self, rank: usize, value: f64) -> Result<()> {
        if rank >= self.k || rank > self.entry.sum2.len() {
            return Err(self.bad_rank(rank));
        }
        self.entry.sum2.insert(rank, value);
        self.entry.sum2.truncate(self.k);
        Ok(())
    }

    /// Value-only replace: the occupant at `rank` is unchanged, its `sum1` moved.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` for a rank outside the array.
    pub fn set_sum2(&mut self, rank: usize, value: f64) -> Result<()> {
        if rank >= self.entry.sum2.len() {
            return Err(self.bad_rank(rank));
        }
        self.entry.sum2[rank] = value;
        Ok(())
    }

    fn bad_rank(&self, rank: usize) -> Error {
        Error::structural(format!(
            "sum2 rank {rank} out of range for object {} (len {}, k {})",
            self.id,
            self.entry.sum2.len(),
            self.k
        ))
    }
}
