//! # `lofstream` Core
//!
//! Incremental Local Outlier Factor (LOF) over a growing dataset.
//!
//! Every inserted object keeps a sorted list of its k nearest neighbors and
//! two cached sums (`sum1`, `sum2`) from which its LOF is a constant-time
//! read. A new object only disturbs the objects that now count it among
//! their k nearest neighbors plus at most two hops of reverse neighbors, so
//! insertion never recomputes scores from scratch.
//!
//! ## Features
//!
//! - **Exact**: after any insertion sequence the scores equal a full
//!   recomputation over the final dataset
//! - **Bidirectional kNN graph**: reverse adjacency kept in lock-step with
//!   every list splice
//! - **Pluggable oracle**: bring your own kNN / reverse-kNN index via
//!   [`DistanceOracle`]; [`LinearScanOracle`] is the exact reference
//! - **Fail-fast**: a broken invariant poisons the engine instead of
//!   producing silently wrong scores
//!
//! ## Quick Start
//!
//! ```rust
//! use lofstream_core::{score_batch, DistanceMetric, IncrementalLof, LinearScanOracle};
//!
//! let oracle = LinearScanOracle::new(DistanceMetric::Euclidean, 2);
//! let mut engine = IncrementalLof::new(oracle, 2)?;
//!
//! let points = [0.0, 1.0, 2.0, 3.0, 10.0].map(|x| vec![x]);
//! let scores = score_batch(&mut engine, points)?;
//!
//! assert!((scores[4].lof - 5.0).abs() < 1e-9);
//! engine.verify()?;
//! # Ok::<(), lofstream_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Object ids are u64 and list positions usize; conversions between them and
// f64 neighbor counts are bounded by k and the dataset size.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
// Exact float comparison is intentional: stored distances and reachability
// distances are compared bit-for-bit against their recomputed values.
#![allow(clippy::float_cmp)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::wildcard_imports)]

pub mod batch;
#[cfg(test)]
mod batch_tests;
pub mod config;
pub mod consistency;
pub mod distance;
pub mod error;
pub mod inserter;
#[cfg(test)]
mod inserter_tests;
pub mod lof;
pub mod neighbor_index;
pub mod neighbors;
pub mod oracle;
pub(crate) mod ordered_float;
pub mod score_cache;

pub use batch::{score_batch, BatchStats, LofBatch};
pub use config::{ConfigError, LofConfig};
pub use consistency::verify_tables;
pub use distance::{DistanceFunction, DistanceMetric};
pub use error::{Error, OracleError, Result};
pub use inserter::{IncrementalLof, InsertReport};
pub use lof::{local_outlier_factor, LofScore};
pub use neighbor_index::NeighborIndex;
pub use neighbors::{Neighbor, NeighborList, NeighborRef, ObjectId};
pub use oracle::{DistanceOracle, LinearScanOracle, OracleResult, QueryResult};
pub use score_cache::{ScoreCache, ScoreEntry, ScoreEntryMut};
