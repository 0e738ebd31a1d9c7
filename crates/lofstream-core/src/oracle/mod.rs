//! Distance oracle: the spatial collaborator of the engine.
//!
//! The engine asks the oracle three things about a freshly inserted object:
//! its k nearest neighbors, the objects that now count it among *their* k
//! nearest, and pairwise distances. Answers must be exact and deterministic,
//! ordered by `(distance, id)`.
//!
//! # Module Organization
//!
//! - `linear_scan`: exact in-memory reference implementation

mod linear_scan;


pub use linear_scan::LinearScanOracle;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::neighbors::ObjectId;

/// Result type for oracle queries.
pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// One answer of a kNN or reverse-kNN query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Object identifier.
    pub id: ObjectId,
    /// Distance to the query object.
    pub distance: f64,
}

impl QueryResult {
    /// Creates a new query result.
    #[must_use]
    pub const fn new(id: ObjectId, distance: f64) -> Self {
        Self { id, distance }
    }
}

/// Answers nearest-neighbor questions over the live dataset.
///
/// Synchronous and single-writer: `insert` is only ever called by the
/// engine, one object at a time.
pub trait DistanceOracle {
    /// Registers a feature vector and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty, non-finite or wrongly sized vector.
    fn insert(&mut self, vector: Vec<f64>) -> OracleResult<ObjectId>;

    /// Distance between two registered objects.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if either id is not registered.
    fn distance(&self, a: ObjectId, b: ObjectId) -> OracleResult<f64>;

    /// The `k` objects closest to `id`, ascending by `(distance, id)`.
    ///
    /// `id` itself is part of the answer (distance 0).
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `id` is not registered.
    fn k_nearest(&self, id: ObjectId, k: usize) -> OracleResult<Vec<QueryResult>>;

    /// Every other object `p` such that `id` is among the `k` nearest
    /// neighbors of `p` (not counting `p` itself). Order unspecified.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `id` is not registered.
    fn reverse_k_nearest(&self, id: ObjectId, k: usize) -> OracleResult<Vec<QueryResult>>;

    /// Number of registered objects.
    fn len(&self) -> usize;

    /// Returns true if nothing is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension fixed by the first insertion.
    fn dimension(&self) -> Option<usize>;
}
