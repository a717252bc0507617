// src/dataset/table.rs

//! Record source backed by a distributed table-reading client.
//!
//! The table client owns all sharding, prefetching, and range-exhaustion
//! detection; this module only shapes arguments (mapping an iteration
//! context onto the client's slice addressing) and adapts the client's
//! read interface to [`RecordSource`]. Nothing here compensates for a
//! client that violates its contract.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::ReaderConfig;
use crate::error::{FeedError, Result};

use super::traits::{CollateFn, RecordSource, SliceSpec, SourceFactory};

/// Parameters for opening one slice of a distributed table read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReadSpec {
    /// Table identifier understood by the client.
    pub table: String,
    /// Column selection forwarded verbatim.
    pub selected_cols: String,
    /// Client-side prefetch depth.
    pub prefetch: usize,
    /// Index of the slice to read.
    pub slice_id: u32,
    /// Total number of slices the table is divided into.
    pub slice_count: u32,
}

/// A client-side handle reading one slice of a table.
///
/// Contract (owed by the implementor): `read` returns up to `num_records`
/// rows from the assigned range, and an empty vector once the range is
/// exhausted — distinctly from `Err`, which signals failure. `close`
/// releases held handles/connections and is called exactly once, after
/// exhaustion.
pub trait TableReader: Send {
    type Row;

    fn read(&mut self, num_records: usize) -> Result<Vec<Self::Row>>;

    fn close(&mut self) -> Result<()>;
}

/// Opens slice readers against a distributed table service.
pub trait TableClient: Send + Sync {
    type Row: Send;
    type Reader: TableReader<Row = Self::Row>;

    fn open_reader(&self, spec: &TableReadSpec) -> Result<Self::Reader>;
}

/// A [`RecordSource`] pulling rows one at a time from a table slice.
///
/// The reader is closed and dropped as soon as it reports range
/// exhaustion, so no handle outlives the records it produced. Further
/// pulls after exhaustion keep reporting end-of-sequence.
pub struct TableSource<C: TableClient> {
    reader: Option<C::Reader>,
    pending: VecDeque<C::Row>,
}

impl<C: TableClient> RecordSource for TableSource<C> {
    type Item = C::Row;

    fn next_record(&mut self) -> Result<Option<C::Row>> {
        if let Some(row) = self.pending.pop_front() {
            return Ok(Some(row));
        }

        let rows = match self.reader.as_mut() {
            Some(reader) => reader.read(1)?,
            None => return Ok(None),
        };

        if rows.is_empty() {
            // Range exhausted: release the handle before reporting the end
            if let Some(mut reader) = self.reader.take() {
                reader.close()?;
            }
            return Ok(None);
        }

        self.pending.extend(rows);
        Ok(self.pending.pop_front())
    }
}

/// Factory opening [`TableSource`]s for a fixed table and column selection.
///
/// Carries the source-specific parameters as named fields and maps each
/// [`SliceSpec`] onto the client's slice addressing at open time.
pub struct TableSourceFactory<C: TableClient, B> {
    client: Arc<C>,
    table: String,
    selected_cols: String,
    prefetch: usize,
    collate: CollateFn<C::Row, B>,
}

impl<C: TableClient, B> Clone for TableSourceFactory<C, B> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            table: self.table.clone(),
            selected_cols: self.selected_cols.clone(),
            prefetch: self.prefetch,
            collate: self.collate.clone(),
        }
    }
}

impl<C: TableClient, B> TableSourceFactory<C, B> {
    /// Create a factory reading `table` through `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if `table` is empty or `prefetch` is zero.
    pub fn new(
        client: Arc<C>,
        table: impl Into<String>,
        selected_cols: impl Into<String>,
        prefetch: usize,
        collate: CollateFn<C::Row, B>,
    ) -> Result<Self> {
        let table = table.into();
        if table.is_empty() {
            return Err(FeedError::dataset("table identifier must not be empty"));
        }
        if prefetch == 0 {
            return Err(FeedError::dataset("prefetch must be greater than 0"));
        }
        Ok(Self {
            client,
            table,
            selected_cols: selected_cols.into(),
            prefetch,
            collate,
        })
    }

    /// Create a factory from a [`ReaderConfig`] section.
    pub fn from_config(
        client: Arc<C>,
        config: &ReaderConfig,
        collate: CollateFn<C::Row, B>,
    ) -> Result<Self> {
        Self::new(
            client,
            config.table.clone(),
            config.selected_cols.clone(),
            config.prefetch,
            collate,
        )
    }

    fn read_spec(&self, slice: SliceSpec) -> TableReadSpec {
        TableReadSpec {
            table: self.table.clone(),
            selected_cols: self.selected_cols.clone(),
            prefetch: self.prefetch,
            slice_id: slice.slice_id(),
            slice_count: slice.slice_count(),
        }
    }
}

impl<C: TableClient, B> SourceFactory for TableSourceFactory<C, B> {
    type Item = C::Row;
    type Batch = B;
    type Source = TableSource<C>;

    fn open(&self, slice: SliceSpec) -> Result<TableSource<C>> {
        let reader = self.client.open_reader(&self.read_spec(slice))?;
        Ok(TableSource {
            reader: Some(reader),
            pending: VecDeque::new(),
        })
    }

    fn collate_fn(&self) -> CollateFn<C::Row, B> {
        self.collate.clone()
    }
}
