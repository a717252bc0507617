// src/dataset/traits.rs

use std::sync::Arc;

use crate::error::Result;

/// Iteration context for one worker process of one replica.
///
/// Carries the identity a record source needs to select its slice of the
/// table. Passed explicitly into every source construction; sources never
/// read worker identity from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSpec {
    /// This replica's rank within the process group.
    pub rank: u32,
    /// Total replica count.
    pub world: u32,
    /// This worker process's index within the replica.
    pub worker_id: u32,
    /// Worker processes per replica.
    pub num_workers: u32,
}

impl SliceSpec {
    pub fn new(rank: u32, world: u32, worker_id: u32, num_workers: u32) -> Self {
        Self {
            rank,
            world,
            worker_id,
            num_workers,
        }
    }

    /// Global index of this worker's slice across all replicas.
    pub fn slice_id(&self) -> u32 {
        self.rank * self.num_workers + self.worker_id
    }

    /// Total number of slices the table is divided into.
    pub fn slice_count(&self) -> u32 {
        self.num_workers * self.world
    }
}

/// Batch-collation function, assembling individual records into the batch
/// structure the surrounding training loop consumes.
pub type CollateFn<T, B> = Arc<dyn Fn(Vec<T>) -> B + Send + Sync>;

/// A lazy, finite sequence of records for one slice of a dataset.
///
/// `Ok(None)` is the explicit end-of-sequence sentinel: the slice range is
/// exhausted and any held resources (handles, connections) have been
/// released. Exhaustion is a normal termination signal, not an error.
pub trait RecordSource {
    type Item;

    /// Pull the next record from this source's slice.
    fn next_record(&mut self) -> Result<Option<Self::Item>>;
}

/// Produces fresh record-source instances for a given iteration context.
///
/// A factory carries everything needed to open a source except the slice
/// identity, so the same factory can be reused across workers and across
/// restarts of an exhausted slice.
pub trait SourceFactory {
    type Item;
    type Batch;
    type Source: RecordSource<Item = Self::Item>;

    /// Open a fresh source for the given slice.
    ///
    /// Opening may be expensive (network or file handles) and happens
    /// synchronously; construction failures are fatal to the caller.
    fn open(&self, slice: SliceSpec) -> Result<Self::Source>;

    /// The collation function of the underlying source, returned unchanged
    /// for use by the surrounding batching layer.
    fn collate_fn(&self) -> CollateFn<Self::Item, Self::Batch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_arithmetic() {
        // rank 1 of 3, worker 2 of 4: slice 1*4+2 = 6 of 4*3 = 12
        let slice = SliceSpec::new(1, 3, 2, 4);
        assert_eq!(slice.slice_id(), 6);
        assert_eq!(slice.slice_count(), 12);
    }

    #[test]
    fn test_slice_single_replica_single_worker() {
        let slice = SliceSpec::new(0, 1, 0, 1);
        assert_eq!(slice.slice_id(), 0);
        assert_eq!(slice.slice_count(), 1);
    }

    #[test]
    fn test_slice_ids_are_disjoint() {
        // Every (rank, worker) pair maps to a distinct slice id
        let world = 3;
        let num_workers = 4;
        let mut seen = std::collections::HashSet::new();
        for rank in 0..world {
            for worker_id in 0..num_workers {
                let slice = SliceSpec::new(rank, world, worker_id, num_workers);
                assert!(seen.insert(slice.slice_id()));
                assert!(slice.slice_id() < slice.slice_count());
            }
        }
        assert_eq!(seen.len(), (world * num_workers) as usize);
    }
}
