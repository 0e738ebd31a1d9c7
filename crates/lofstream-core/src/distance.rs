//! Distance functions over real-valued feature vectors.
//!
//! The engine never computes distances itself: it receives them from a
//! [`DistanceOracle`](crate::oracle::DistanceOracle), which in turn is
//! parameterized by a [`DistanceFunction`]. Any type implementing the trait
//! can be injected; [`DistanceMetric`] covers the Minkowski family.

use serde::{Deserialize, Serialize};

/// A metric distance between two vectors of equal dimension.
///
/// Implementations must be symmetric and deterministic: the incremental
/// algorithm compares stored distances for exact equality when breaking ties.
pub trait DistanceFunction {
    /// Computes the distance between `a` and `b`.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Short human-readable name, used in logs.
    fn name(&self) -> &str;
}

/// Distance metrics of the Minkowski (Lp norm) family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance (L2 norm).
    #[default]
    Euclidean,

    /// Manhattan distance (L1 norm).
    Manhattan,

    /// Chebyshev distance (maximum norm, L∞).
    Chebyshev,

    /// Minkowski distance with integer exponent `p >= 1`.
    ///
    /// `p = 1` and `p = 2` are computed exactly like [`Self::Manhattan`] and
    /// [`Self::Euclidean`].
    Minkowski {
        /// Exponent of the norm.
        p: u32,
    },
}

impl DistanceMetric {
    /// Calculates the distance between two vectors using the specified metric.
    ///
    /// Components beyond the shorter vector are ignored; the oracle rejects
    /// mismatched dimensions before this is ever called.
    #[must_use]
    #[inline]
    pub fn calculate(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Euclidean | Self::Minkowski { p: 2 } => euclidean(a, b),
            Self::Manhattan | Self::Minkowski { p: 1 } => manhattan(a, b),
            Self::Chebyshev => chebyshev(a, b),
            Self::Minkowski { p } => minkowski(a, b, *p),
        }
    }

    /// Returns the canonical form of this metric.
    ///
    /// `Minkowski { p: 1 }` becomes `Manhattan`, `Minkowski { p: 2 }` becomes
    /// `Euclidean`; everything else is returned unchanged.
    #[must_use]
    pub const fn normalized(self) -> Self {
        match self {
            Self::Minkowski { p: 1 } => Self::Manhattan,
            Self::Minkowski { p: 2 } => Self::Euclidean,
            other => other,
        }
    }

    /// Returns the metric name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Chebyshev => "chebyshev",
            Self::Minkowski { .. } => "minkowski",
        }
    }
}

impl DistanceFunction for DistanceMetric {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.calculate(a, b)
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}

impl<D: DistanceFunction + ?Sized> DistanceFunction for &D {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        (**self).distance(a, b)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<D: DistanceFunction + ?Sized> DistanceFunction for Box<D> {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        (**self).distance(a, b)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[inline]
fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[inline]
fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[inline]
fn chebyshev(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn minkowski(a: &[f64], b: &[f64], p: u32) -> f64 {
    // p == 0 is rejected by config validation; treat it as the max norm.
    if p == 0 {
        return chebyshev(a, b);
    }
    let exponent = i32::try_from(p).unwrap_or(i32::MAX);
    let agg: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs().powi(exponent))
        .sum();
    agg.powf(1.0 / f64::from(p))
}
