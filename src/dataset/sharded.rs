// src/dataset/sharded.rs

use crate::config::DatasetConfig;
use crate::error::{FeedError, Result};

use super::chain::PaddedChain;
use super::traits::{CollateFn, RecordSource, SliceSpec, SourceFactory};

/// Per-worker iteration count that keeps all replicas in step.
///
/// Every worker of every replica performs this many pulls, so replicas
/// with shorter slices restart their sources rather than finishing early
/// and stalling collective communication.
pub fn padded_iterations(total_len: u64, num_workers: u32, world: u32) -> u64 {
    let slices = num_workers as u64 * world as u64;
    total_len.div_ceil(slices)
}

/// A dataset that hands out one record iterator per worker context.
///
/// Each call to [`iter`](Self::iter) produces a fresh iterator for one
/// worker process: either a [`PaddedChain`] that pads the worker's slice
/// to a common step count (when padding is enabled and more than one
/// replica participates), or the raw underlying source. The decision is
/// made per iteration-context entry, so the same dataset value serves
/// every epoch.
pub struct ShardedDataset<F: SourceFactory> {
    config: DatasetConfig,
    factory: F,
}

impl<F: SourceFactory> ShardedDataset<F> {
    /// Create a dataset from validated configuration and a source factory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (zero workers,
    /// zero world size, or rank out of range).
    pub fn new(config: DatasetConfig, factory: F) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, factory })
    }

    /// The dataset configuration.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// The collation function of the underlying source, unchanged.
    pub fn collate_fn(&self) -> CollateFn<F::Item, F::Batch> {
        self.factory.collate_fn()
    }
}

impl<F: SourceFactory + Clone> ShardedDataset<F> {
    /// Enter an iteration context for the given worker process.
    ///
    /// With padding enabled and `world > 1`, the returned iterator yields
    /// exactly `ceil(total_len / (num_workers * world))` records,
    /// restarting the underlying source as needed. Otherwise the worker
    /// iterates its raw slice to natural exhaustion. Either way the source
    /// receives the full slice identity explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if `worker_id` is out of range or the underlying
    /// source cannot be opened.
    pub fn iter(&self, worker_id: u32) -> Result<ShardIter<F>> {
        if worker_id >= self.config.num_workers {
            return Err(FeedError::dataset(format!(
                "worker_id {} out of range (num_workers: {})",
                worker_id, self.config.num_workers
            )));
        }

        let slice = SliceSpec::new(
            self.config.rank,
            self.config.world,
            worker_id,
            self.config.num_workers,
        );

        if self.config.pad_to_world && self.config.world > 1 {
            let per_worker = padded_iterations(
                self.config.total_len,
                self.config.num_workers,
                self.config.world,
            );
            Ok(ShardIter::Padded(PaddedChain::new(
                per_worker,
                self.factory.clone(),
                slice,
            )?))
        } else {
            Ok(ShardIter::Direct(DirectIter::new(
                self.factory.open(slice)?,
            )))
        }
    }
}

/// Iterator handed out by [`ShardedDataset::iter`].
pub enum ShardIter<F: SourceFactory> {
    /// Padded to a common step count across replicas.
    Padded(PaddedChain<F>),
    /// The raw slice, iterated to natural exhaustion.
    Direct(DirectIter<F::Source>),
}

impl<F: SourceFactory> Iterator for ShardIter<F> {
    type Item = Result<F::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ShardIter::Padded(chain) => chain.next(),
            ShardIter::Direct(direct) => direct.next(),
        }
    }
}

/// Adapts a [`RecordSource`] to the `Iterator` interface.
pub struct DirectIter<S: RecordSource> {
    source: S,
    fused: bool,
}

impl<S: RecordSource> DirectIter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            fused: false,
        }
    }
}

impl<S: RecordSource> Iterator for DirectIter<S> {
    type Item = Result<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.source.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.fused = true;
                None
            }
            Err(e) => {
                self.fused = true;
                Some(Err(e))
            }
        }
    }
}
