//! Batch entrypoint: feed a sequence of vectors, read back every score.

use serde::Serialize;
use tracing::info;

use crate::config::LofConfig;
use crate::error::Result;
use crate::inserter::{IncrementalLof, InsertReport};
use crate::lof::LofScore;
use crate::oracle::{DistanceOracle, LinearScanOracle};

/// Inserts `vectors` in order and returns the LOF of every object.
///
/// Scores are ascending by id, which is also insertion order for oracles that
/// number objects sequentially. The first failure aborts the run.
///
/// # Errors
///
/// Propagates the first insertion error.
pub fn score_batch<O, I>(engine: &mut IncrementalLof<O>, vectors: I) -> Result<Vec<LofScore>>
where
    O: DistanceOracle,
    I: IntoIterator<Item = Vec<f64>>,
{
    for vector in vectors {
        engine.insert(vector)?;
    }
    engine.lof_scores()
}

/// Totals over all insertions of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Objects inserted.
    pub inserted: usize,
    /// Neighbors evicted from full lists.
    pub evictions: usize,
    /// `sum2` refreshes.
    pub sum2_updates: usize,
    /// Reachability distances rewritten.
    pub reachability_updates: usize,
}

impl BatchStats {
    fn record(&mut self, report: &InsertReport) {
        self.inserted += 1;
        self.evictions += report.evictions;
        self.sum2_updates += report.sum2_updates;
        self.reachability_updates += report.reachability_updates;
    }
}

/// Configuration-driven batch run over a [`LinearScanOracle`].
#[derive(Debug)]
pub struct LofBatch {
    engine: IncrementalLof<LinearScanOracle>,
    stats: BatchStats,
}

impl LofBatch {
    /// Builds the engine described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration does not validate.
    pub fn from_config(config: &LofConfig) -> Result<Self> {
        let engine = IncrementalLof::from_config(config)?;
        info!(
            k = config.lof.k,
            metric = config.distance.as_str(),
            "batch engine ready"
        );
        Ok(Self {
            engine,
            stats: BatchStats::default(),
        })
    }

    /// Inserts one vector.
    ///
    /// # Errors
    ///
    /// Propagates the insertion error.
    pub fn push(&mut self, vector: Vec<f64>) -> Result<InsertReport> {
        let report = self.engine.insert(vector)?;
        self.stats.record(&report);
        Ok(report)
    }

    /// Inserts every vector, calling `on_insert` after each one.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first insertion error.
    pub fn extend_with<I, F>(&mut self, vectors: I, mut on_insert: F) -> Result<()>
    where
        I: IntoIterator<Item = Vec<f64>>,
        F: FnMut(&InsertReport),
    {
        for vector in vectors {
            let report = self.push(vector)?;
            on_insert(&report);
        }
        Ok(())
    }

    /// Running totals.
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &IncrementalLof<LinearScanOracle> {
        &self.engine
    }

    /// Current LOF of every inserted object, ascending by id.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInconsistency` if the tables disagree on membership.
    pub fn scores(&self) -> Result<Vec<LofScore>> {
        self.engine.lof_scores()
    }

    /// Inserts every vector and returns the final scores.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first insertion error.
    pub fn run<I>(mut self, vectors: I) -> Result<Vec<LofScore>>
    where
        I: IntoIterator<Item = Vec<f64>>,
    {
        self.extend_with(vectors, |_| {})?;
        info!(
            inserted = self.stats.inserted,
            evictions = self.stats.evictions,
            "batch run complete"
        );
        self.scores()
    }
}
