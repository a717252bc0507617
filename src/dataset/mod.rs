// src/dataset/mod.rs

//! Sharded record iteration for distributed training loops.
//!
//! This module adapts a distributed table-reading client to a pull-based
//! training loop. A [`ShardedDataset`] hands each worker process either
//! its raw table slice or a [`PaddedChain`] that restarts the slice until
//! a common per-worker step count is reached, so uneven slices never
//! leave replicas waiting on each other in collective communication.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tablefeed::config::DatasetConfig;
//! use tablefeed::dataset::{ShardedDataset, TableSourceFactory};
//!
//! let factory = TableSourceFactory::new(client, "proj/features", "image,label", 1024, collate)?;
//! let dataset = ShardedDataset::new(
//!     DatasetConfig { total_len: 100_000, num_workers: 4, rank, world, pad_to_world: true },
//!     factory,
//! )?;
//!
//! for record in dataset.iter(worker_id)? {
//!     let record = record?;
//!     // feed the training step
//! }
//! ```

mod chain;
mod sharded;
mod table;
mod traits;

pub use chain::PaddedChain;
pub use sharded::{padded_iterations, DirectIter, ShardIter, ShardedDataset};
pub use table::{TableClient, TableReadSpec, TableReader, TableSource, TableSourceFactory};
pub use traits::{CollateFn, RecordSource, SliceSpec, SourceFactory};
