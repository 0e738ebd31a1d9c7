//! Neighbor entries and fixed-capacity neighbor lists.

use serde::{Deserialize, Serialize};

use crate::ordered_float::precedes;

/// Stable identifier of an inserted object.
pub type ObjectId = u64;

/// `neighbor` is the `rank`-th (0-indexed) nearest neighbor of `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Object whose list holds this entry.
    pub owner: ObjectId,
    /// Position in the owner's list.
    pub rank: usize,
    /// The neighboring object.
    pub neighbor: ObjectId,
    /// `max(distance, k_distance(neighbor))`.
    pub reachability_distance: f64,
    /// Raw distance between owner and neighbor.
    pub distance: f64,
}

impl Neighbor {
    /// Creates a new neighbor entry.
    #[must_use]
    pub fn new(
        owner: ObjectId,
        rank: usize,
        neighbor: ObjectId,
        reachability_distance: f64,
        distance: f64,
    ) -> Self {
        Self {
            owner,
            rank,
            neighbor,
            reachability_distance,
            distance,
        }
    }

    /// Returns the back-reference to this slot.
    #[must_use]
    pub fn slot(&self) -> NeighborRef {
        NeighborRef::new(self.owner, self.rank)
    }

    /// Bitwise equality, including the float fields.
    #[must_use]
    pub fn same_bits(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.rank == other.rank
            && self.neighbor == other.neighbor
            && self.reachability_distance.to_bits() == other.reachability_distance.to_bits()
            && self.distance.to_bits() == other.distance.to_bits()
    }
}

/// A slot in some object's neighbor list: `(owner, rank)`.
///
/// Reverse adjacency stores these; they are only valid until the owner's
/// list is next spliced, which is why the index never hands out references
/// into its lists across mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeighborRef {
    /// Owner of the list.
    pub owner: ObjectId,
    /// Rank within the owner's list.
    pub rank: usize,
}

impl NeighborRef {
    /// Creates a new back-reference.
    #[must_use]
    pub const fn new(owner: ObjectId, rank: usize) -> Self {
        Self { owner, rank }
    }
}

/// Ordered neighbors of one object, at most `capacity` (= k) slots.
///
/// Sorted ascending by `(distance, neighbor)`. Slot `i` always has rank `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborList {
    capacity: usize,
    slots: Vec<Neighbor>,
}

impl NeighborList {
    /// Creates an empty list.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of slots (k).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if all `capacity` slots are occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Entry at `rank`.
    #[must_use]
    pub fn get(&self, rank: usize) -> Option<&Neighbor> {
        self.slots.get(rank)
    }

    /// Last (k-th) entry.
    #[must_use]
    pub fn last(&self) -> Option<&Neighbor> {
        self.slots.last()
    }

    /// Iterates entries in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, Neighbor> {
        self.slots.iter()
    }

    /// Entries as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Neighbor] {
        &self.slots
    }

    /// Identifiers of the neighbors in rank order.
    #[must_use]
    pub fn neighbor_ids(&self) -> Vec<ObjectId> {
        self.slots.iter().map(|n| n.neighbor).collect()
    }

    /// Raw distance of the last entry; 0 for an object without neighbors.
    #[must_use]
    pub fn k_distance(&self) -> f64 {
        self.slots.last().map_or(0.0, |n| n.distance)
    }

    /// Sum of the stored reachability distances.
    #[must_use]
    pub fn sum_of_reachability_distances(&self) -> f64 {
        self.slots.iter().map(|n| n.reachability_distance).sum()
    }

    /// First rank at which `(distance, id)` precedes the current occupant.
    ///
    /// Returns `len()` when the candidate sorts after every entry. A result
    /// equal to `capacity` means the candidate does not belong in the list.
    #[must_use]
    pub fn insertion_rank(&self, distance: f64, id: ObjectId) -> usize {
        self.slots
            .iter()
            .position(|n| precedes(distance, id, n.distance, n.neighbor))
            .unwrap_or(self.slots.len())
    }

    /// Returns true if entries are strictly ascending by `(distance, neighbor)`.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.slots
            .windows(2)
            .all(|w| precedes(w[0].distance, w[0].neighbor, w[1].distance, w[1].neighbor))
    }

    /// Splices `neighbor` in at `rank` and renumbers the tail.
    ///
    /// Returns the entry pushed out of the last slot, if the list was full.
    /// Caller guarantees `rank <= len() && rank < capacity`.
    pub(crate) fn splice(&mut self, rank: usize, mut neighbor: Neighbor) -> Option<Neighbor> {
        neighbor.rank = rank;
        self.slots.insert(rank, neighbor);
        let evicted = if self.slots.len() > self.capacity {
            self.slots.pop()
        } else {
            None
        };
        for (i, slot) in self.slots.iter_mut().enumerate().skip(rank + 1) {
            slot.rank = i;
        }
        evicted
    }

    pub(crate) fn get_mut(&mut self, rank: usize) -> Option<&mut Neighbor> {
        self.slots.get_mut(rank)
    }

    pub(crate) fn from_sorted(capacity: usize, slots: Vec<Neighbor>) -> Self {
        Self { capacity, slots }
    }
}

impl<'a> IntoIterator for &'a NeighborList {
    type Item = &'a Neighbor;
    type IntoIter = std::slice::Iter<'a, Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}
