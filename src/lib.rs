// src/lib.rs

//! tablefeed - Training Data Feed Shims
//!
//! This crate provides two thin integration layers for distributed
//! training jobs: sharded, optionally step-padded iteration over a
//! distributed table (see [`dataset`]), and synchronous access to an
//! S3-compatible object bucket (see [`store`]).

pub mod config;
pub mod error;

// Re-export commonly used types for convenience
pub use config::{DatasetConfig, FeedConfig, ReaderConfig, StoreConfig};
pub use error::{FeedError, Result};

pub mod dataset;
pub use dataset::{
    padded_iterations, CollateFn, PaddedChain, RecordSource, ShardIter, ShardedDataset,
    SliceSpec, SourceFactory, TableClient, TableReadSpec, TableReader, TableSourceFactory,
};

pub mod store;
pub use store::BucketStore;
