//! Local outlier factor derived from cached sums.
//!
//! With `m` neighbors, the local reachability density of an object is
//! `lrd(o) = m / sum1(o)`, and
//!
//! ```text
//! LOF(o) = mean_i lrd(N(o)[i]) / lrd(o)
//!        = (sum1(o) / m) · (1/m) · Σ_i m / sum2(o)[i]
//! ```
//!
//! A zero sum (duplicate points) means infinite density. Following the usual
//! convention, an object whose own density is infinite gets LOF 1.0; a finite
//! object next to an infinitely dense neighbor gets LOF +∞.

use serde::{Deserialize, Serialize};

use crate::neighbors::ObjectId;

/// Final score of one object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LofScore {
    /// Object identifier.
    pub id: ObjectId,
    /// Local outlier factor.
    pub lof: f64,
}

/// Computes LOF from `sum1` of an object and the `sum1` values of its neighbors.
///
/// An object without neighbors is not an outlier of anything: 1.0.
#[must_use]
pub fn local_outlier_factor(sum1: f64, sum2: &[f64]) -> f64 {
    if sum2.is_empty() {
        return 1.0;
    }
    let m = sum2.len() as f64;

    let own = density(m, sum1);
    if own.is_infinite() {
        return 1.0;
    }

    let mut total = 0.0;
    for &s in sum2 {
        let d = density(m, s);
        if d.is_infinite() {
            return f64::INFINITY;
        }
        total += d;
    }
    (total / m) / own
}

/// Local reachability density of an object with `m` neighbors.
#[must_use]
pub fn density(m: f64, sum_of_reachability_distances: f64) -> f64 {
    if sum_of_reachability_distances > 0.0 {
        m / sum_of_reachability_distances
    } else {
        f64::INFINITY
    }
}
