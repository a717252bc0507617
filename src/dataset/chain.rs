// src/dataset/chain.rs

use tracing::{debug, warn};

use crate::error::{FeedError, Result};

use super::traits::{RecordSource, SliceSpec, SourceFactory};

/// An iterator presenting a fixed number of records by chaining repeated
/// runs of an underlying, possibly shorter, restartable record source.
///
/// When the underlying source exhausts before the target count is reached,
/// it is discarded and a fresh instance is opened through the factory, so
/// the chain keeps producing records until exactly `num_iterations` have
/// been yielded. In synchronous distributed training this keeps every
/// replica performing the same number of steps even when slice sizes are
/// uneven.
///
/// The chain is not restartable: once exhausted, construct a new instance
/// to iterate again. One instance per epoch per worker context.
pub struct PaddedChain<F: SourceFactory> {
    factory: F,
    slice: SliceSpec,
    num_iterations: u64,
    yielded: u64,
    source: F::Source,
    fused: bool,
}

impl<F: SourceFactory> PaddedChain<F> {
    /// Create a new padded chain over `factory`'s sources.
    ///
    /// The first underlying source is opened eagerly; open failures
    /// propagate to the caller.
    ///
    /// # Arguments
    ///
    /// * `num_iterations` - Total records to yield before signaling end
    /// * `factory` - Produces fresh source instances for `slice`
    /// * `slice` - The iteration context passed to every source opened
    pub fn new(num_iterations: u64, factory: F, slice: SliceSpec) -> Result<Self> {
        let source = factory.open(slice)?;
        Ok(Self {
            factory,
            slice,
            num_iterations,
            yielded: 0,
            source,
            fused: false,
        })
    }

    /// The fixed logical length of this chain.
    pub fn num_iterations(&self) -> u64 {
        self.num_iterations
    }

    /// Records still to be yielded before end-of-sequence.
    pub fn remaining(&self) -> u64 {
        if self.fused {
            return 0;
        }
        self.num_iterations - self.yielded
    }

    /// Discard the exhausted source, open a fresh one, and pull once.
    ///
    /// Happens at most once per pull. A fresh source that is itself
    /// immediately empty is a fatal `EmptySlice` error: restarting again
    /// could loop forever on a slice that has gone empty upstream.
    fn restart_and_pull(&mut self) -> Result<F::Item> {
        debug!(
            slice_id = self.slice.slice_id(),
            yielded = self.yielded,
            target = self.num_iterations,
            "source exhausted, reopening"
        );
        self.source = self.factory.open(self.slice)?;
        match self.source.next_record()? {
            Some(record) => Ok(record),
            None => {
                warn!(
                    slice_id = self.slice.slice_id(),
                    slice_count = self.slice.slice_count(),
                    "freshly opened source produced no records"
                );
                Err(FeedError::empty_slice(
                    self.slice.slice_id(),
                    self.slice.slice_count(),
                ))
            }
        }
    }
}

impl<F: SourceFactory> Iterator for PaddedChain<F> {
    type Item = Result<F::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused || self.yielded >= self.num_iterations {
            return None;
        }

        let pulled = match self.source.next_record() {
            Ok(Some(record)) => Ok(record),
            Ok(None) => self.restart_and_pull(),
            Err(e) => Err(e),
        };

        match pulled {
            Ok(record) => {
                self.yielded += 1;
                Some(Ok(record))
            }
            Err(e) => {
                // Failure is fatal to the consuming loop; stop yielding.
                self.fused = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::dataset::traits::CollateFn;

    /// Source yielding `remaining` sequential values starting at 0.
    struct MockSource {
        remaining: usize,
        next_value: u32,
    }

    impl RecordSource for MockSource {
        type Item = u32;

        fn next_record(&mut self) -> Result<Option<u32>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let value = self.next_value;
            self.next_value += 1;
            Ok(Some(value))
        }
    }

    /// Factory producing sources whose run lengths follow `runs`; once
    /// `runs` is used up, the last entry repeats. Counts every open.
    #[derive(Clone)]
    struct MockFactory {
        runs: Vec<usize>,
        opens: Arc<AtomicUsize>,
        fail_open_at: Option<usize>,
    }

    impl MockFactory {
        fn with_run_len(len: usize) -> Self {
            Self {
                runs: vec![len],
                opens: Arc::new(AtomicUsize::new(0)),
                fail_open_at: None,
            }
        }

        fn with_runs(runs: Vec<usize>) -> Self {
            Self {
                runs,
                opens: Arc::new(AtomicUsize::new(0)),
                fail_open_at: None,
            }
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    impl SourceFactory for MockFactory {
        type Item = u32;
        type Batch = Vec<u32>;
        type Source = MockSource;

        fn open(&self, _slice: SliceSpec) -> Result<MockSource> {
            let opened = self.opens.fetch_add(1, Ordering::SeqCst);
            if Some(opened) == self.fail_open_at {
                return Err(FeedError::table("reader unavailable"));
            }
            let run = *self.runs.get(opened).or(self.runs.last()).unwrap_or(&0);
            Ok(MockSource {
                remaining: run,
                next_value: 0,
            })
        }

        fn collate_fn(&self) -> CollateFn<u32, Vec<u32>> {
            Arc::new(|records| records)
        }
    }

    fn test_slice() -> SliceSpec {
        SliceSpec::new(0, 2, 0, 1)
    }

    #[test]
    fn test_yields_exactly_n_with_restarts() {
        let factory = MockFactory::with_run_len(3);
        let chain = PaddedChain::new(10, factory.clone(), test_slice()).unwrap();

        let records: Vec<u32> = chain.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 10);

        // ceil(10 / 3) - 1 = 3 restarts, plus the initial open
        assert_eq!(factory.opens(), 4);
    }

    #[test]
    fn test_no_restart_when_source_suffices() {
        let factory = MockFactory::with_run_len(5);
        let mut chain = PaddedChain::new(3, factory.clone(), test_slice()).unwrap();

        let records: Vec<u32> = chain.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(records, vec![0, 1, 2]);
        assert_eq!(factory.opens(), 1);

        // Exhausted chain keeps returning None
        assert!(chain.next().is_none());
        assert!(chain.next().is_none());
    }

    #[test]
    fn test_exact_fit_needs_no_restart() {
        let factory = MockFactory::with_run_len(4);
        let chain = PaddedChain::new(4, factory.clone(), test_slice()).unwrap();

        let records: Vec<u32> = chain.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 4);
        assert_eq!(factory.opens(), 1);
    }

    #[test]
    fn test_records_repeat_from_slice_start() {
        let factory = MockFactory::with_run_len(2);
        let chain = PaddedChain::new(5, factory, test_slice()).unwrap();

        let records: Vec<u32> = chain.map(|r| r.unwrap()).collect();
        assert_eq!(records, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_zero_iterations_is_empty() {
        let factory = MockFactory::with_run_len(3);
        let mut chain = PaddedChain::new(0, factory, test_slice()).unwrap();
        assert!(chain.next().is_none());
    }

    #[test]
    fn test_empty_fresh_source_is_fatal() {
        // First run has records; every later run is empty
        let factory = MockFactory::with_runs(vec![2, 0]);
        let mut chain = PaddedChain::new(5, factory, test_slice()).unwrap();

        assert_eq!(chain.next().unwrap().unwrap(), 0);
        assert_eq!(chain.next().unwrap().unwrap(), 1);

        let err = chain.next().unwrap().unwrap_err();
        assert!(matches!(err, FeedError::EmptySlice { .. }));

        // Fused after the fatal error
        assert!(chain.next().is_none());
        assert_eq!(chain.remaining(), 0);
    }

    #[test]
    fn test_empty_first_source_restarts_once_then_fails() {
        let factory = MockFactory::with_runs(vec![0, 0]);
        let mut chain = PaddedChain::new(3, factory.clone(), test_slice()).unwrap();

        let err = chain.next().unwrap().unwrap_err();
        assert!(matches!(err, FeedError::EmptySlice { .. }));
        // One initial open plus exactly one restart, no silent looping
        assert_eq!(factory.opens(), 2);
    }

    #[test]
    fn test_open_failure_at_construction_propagates() {
        let mut factory = MockFactory::with_run_len(3);
        factory.fail_open_at = Some(0);
        assert!(PaddedChain::new(5, factory, test_slice()).is_err());
    }

    #[test]
    fn test_open_failure_on_restart_is_yielded_and_fuses() {
        let mut factory = MockFactory::with_run_len(2);
        factory.fail_open_at = Some(1);
        let mut chain = PaddedChain::new(5, factory, test_slice()).unwrap();

        assert_eq!(chain.next().unwrap().unwrap(), 0);
        assert_eq!(chain.next().unwrap().unwrap(), 1);

        let err = chain.next().unwrap().unwrap_err();
        assert!(matches!(err, FeedError::Table { .. }));
        assert!(chain.next().is_none());
    }

    #[test]
    fn test_len_and_size_hint() {
        let factory = MockFactory::with_run_len(2);
        let mut chain = PaddedChain::new(5, factory, test_slice()).unwrap();

        assert_eq!(chain.num_iterations(), 5);
        assert_eq!(chain.remaining(), 5);
        assert_eq!(chain.size_hint(), (5, Some(5)));

        chain.next().unwrap().unwrap();
        chain.next().unwrap().unwrap();
        assert_eq!(chain.remaining(), 3);
        assert_eq!(chain.size_hint(), (3, Some(3)));
    }
}
