//! Bidirectional k-nearest-neighbor graph.
//!
//! Forward direction: one [`NeighborList`] per object. Reverse direction: for
//! every object, the set of slots `(owner, rank)` it currently occupies in
//! other objects' lists. Every mutation of a forward list re-links the
//! reverse entries of all slots it moves, inside the same call, so the two
//! directions never drift apart.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::neighbors::{Neighbor, NeighborList, NeighborRef, ObjectId};

/// Forward neighbor lists plus reverse adjacency.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    k: usize,
    lists: FxHashMap<ObjectId, NeighborList>,
    reverse: FxHashMap<ObjectId, BTreeSet<NeighborRef>>,
}

impl NeighborIndex {
    /// Creates an empty index for lists of capacity `k`.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self::with_capacity(k, 0)
    }

    /// Creates an empty index with room for `capacity` objects.
    #[must_use]
    pub fn with_capacity(k: usize, capacity: usize) -> Self {
        let mut lists = FxHashMap::default();
        lists.reserve(capacity);
        let mut reverse = FxHashMap::default();
        reverse.reserve(capacity);
        Self { k, lists, reverse }
    }

    /// List capacity.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of objects with a seeded list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Returns true if no object has been seeded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Returns true if `id` has a seeded list.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.lists.contains_key(&id)
    }

    /// Identifiers of all seeded objects, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.lists.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Neighbor list of `id`.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if `id` was never seeded.
    pub fn neighbors_of(&self, id: ObjectId) -> Result<&NeighborList> {
        self.lists
            .get(&id)
            .ok_or_else(|| Error::structural(format!("no neighbor list for object {id}")))
    }

    /// Entry referenced by `slot`.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` for an unknown owner or a rank
    /// outside the owner's list.
    pub fn neighbor_at(&self, slot: NeighborRef) -> Result<&Neighbor> {
        self.neighbors_of(slot.owner)?.get(slot.rank).ok_or_else(|| {
            Error::structural(format!(
                "rank {} out of range in list of object {}",
                slot.rank, slot.owner
            ))
        })
    }

    /// Seeds the list of a newly inserted object.
    ///
    /// `neighbors` must already be ordered; ranks and owners are taken from
    /// their position. Back-links are registered for every entry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateObject` if `id` already has a list, and
    /// `StructuralInconsistency` if `neighbors` exceeds `k`, is unsorted,
    /// or names `id` itself.
    pub fn insert_initial(&mut self, id: ObjectId, neighbors: Vec<Neighbor>) -> Result<()> {
        if self.lists.contains_key(&id) {
            return Err(Error::DuplicateObject(id));
        }
        if neighbors.len() > self.k {
            return Err(Error::structural(format!(
                "initial list of object {id} has {} entries, capacity is {}",
                neighbors.len(),
                self.k
            )));
        }

        let slots: Vec<Neighbor> = neighbors
            .into_iter()
            .enumerate()
            .map(|(rank, mut n)| {
                n.owner = id;
                n.rank = rank;
                n
            })
            .collect();

        let list = NeighborList::from_sorted(self.k, slots);
        if !list.is_sorted() {
            return Err(Error::structural(format!(
                "initial list of object {id} is not ordered by (distance, id)"
            )));
        }
        if list.iter().any(|n| n.neighbor == id) {
            return Err(Error::structural(format!(
                "object {id} cannot be its own neighbor"
            )));
        }

        for n in &list {
            self.reverse.entry(n.neighbor).or_default().insert(n.slot());
        }
        self.reverse.entry(id).or_default();
        self.lists.insert(id, list);
        Ok(())
    }

    /// Inserts `neighbor` at `rank` in the list of `owner`, shifting the tail.
    ///
    /// When the list is full its last entry is dropped and returned. Reverse
    /// adjacency is updated for the new entry, every shifted entry and the
    /// evicted one.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` for an unknown owner, a rank outside
    /// `[0, min(len, k-1)]`, or a neighbor already present in the list.
    pub fn insert_and_move(
        &mut self,
        owner: ObjectId,
        rank: usize,
        neighbor: Neighbor,
    ) -> Result<Option<Neighbor>> {
        let k = self.k;
        let list = self
            .lists
            .get_mut(&owner)
            .ok_or_else(|| Error::structural(format!("no neighbor list for object {owner}")))?;

        if rank >= k || rank > list.len() {
            return Err(Error::structural(format!(
                "insertion rank {rank} out of range for object {owner} (len {}, k {k})",
                list.len()
            )));
        }
        if neighbor.neighbor == owner || list.iter().any(|n| n.neighbor == neighbor.neighbor) {
            return Err(Error::structural(format!(
                "object {} is already a neighbor of {owner}",
                neighbor.neighbor
            )));
        }

        // Unlink every slot that is about to move or fall off.
        for n in list.iter().skip(rank) {
            unlink(&mut self.reverse, n.neighbor, n.slot())?;
        }

        let mut entry = neighbor;
        entry.owner = owner;
        let evicted = list.splice(rank, entry);

        for n in list.iter().skip(rank) {
            self.reverse.entry(n.neighbor).or_default().insert(n.slot());
        }

        Ok(evicted)
    }

    /// Snapshot of the slots `id` occupies in other objects' lists.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if `id` was never seeded.
    pub fn reverse_neighbors_of(&self, id: ObjectId) -> Result<Vec<NeighborRef>> {
        Ok(self.reverse_set(id)?.iter().copied().collect())
    }

    /// Live view of the slots `id` occupies, in `(owner, rank)` order.
    ///
    /// The borrow pins the index, so the set cannot change structurally
    /// while the view is iterated.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if `id` was never seeded.
    pub fn reverse_neighbors_for_update(
        &self,
        id: ObjectId,
    ) -> Result<impl Iterator<Item = NeighborRef> + '_> {
        Ok(self.reverse_set(id)?.iter().copied())
    }

    /// Overwrites the reachability distance stored at `slot`.
    ///
    /// Valid only when the raw distance is unchanged, so the list order is
    /// preserved and nothing is re-sorted. Returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` for an unknown owner or rank.
    pub fn set_reachability_distance_only(&mut self, slot: NeighborRef, value: f64) -> Result<f64> {
        let entry = self
            .lists
            .get_mut(&slot.owner)
            .and_then(|list| list.get_mut(slot.rank))
            .ok_or_else(|| {
                Error::structural(format!(
                    "no slot at rank {} for object {}",
                    slot.rank, slot.owner
                ))
            })?;
        Ok(std::mem::replace(&mut entry.reachability_distance, value))
    }

    /// Iterates all `(id, list)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &NeighborList)> + '_ {
        self.lists.iter().map(|(id, list)| (*id, list))
    }

    fn reverse_set(&self, id: ObjectId) -> Result<&BTreeSet<NeighborRef>> {
        self.reverse
            .get(&id)
            .ok_or_else(|| Error::structural(format!("no reverse adjacency for object {id}")))
    }
}

fn unlink(
    reverse: &mut FxHashMap<ObjectId, BTreeSet<NeighborRef>>,
    neighbor: ObjectId,
    slot: NeighborRef,
) -> Result<()> {
    let removed = reverse
        .get_mut(&neighbor)
        .is_some_and(|links| links.remove(&slot));
    if removed {
        Ok(())
    } else {
        Err(Error::structural(format!(
            "missing back-link ({}, {}) for object {neighbor}",
            slot.owner, slot.rank
        )))
    }
}
