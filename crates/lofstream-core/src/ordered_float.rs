//! Total ordering for `(distance, id)` keys.
//!
//! Neighbor lists, oracle answers and rank searches all order candidates by
//! raw distance with the object identifier as tie-break. Distances are
//! compared with `f64::total_cmp`, so the order stays total even if a custom
//! distance function produces NaN.

use std::cmp::Ordering;

use crate::neighbors::ObjectId;

/// Wrapper for f64 implementing `Ord` via IEEE 754 total ordering.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Candidate key: ascending by distance, then by lower identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct DistanceKey {
    pub distance: OrderedFloat,
    pub id: ObjectId,
}

impl DistanceKey {
    pub(crate) fn new(distance: f64, id: ObjectId) -> Self {
        Self {
            distance: OrderedFloat(distance),
            id,
        }
    }
}

/// Returns true when `(distance, id)` strictly precedes `(other_distance, other_id)`.
///
/// Plain `<` / `==` on the raw values, so `0.0` and `-0.0` compare equal.
#[inline]
pub(crate) fn precedes(distance: f64, id: ObjectId, other_distance: f64, other_id: ObjectId) -> bool {
    distance < other_distance || (distance == other_distance && id < other_id)
}
