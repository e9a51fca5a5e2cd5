use std::path::Path;

use crate::config::IndexOptions;
use crate::dataset::{on_malformed, open_lines, Record};
use crate::error::Result;
use crate::similarity::{Comparison, Similarity, WordVectors};
use crate::stats::TableStats;
use crate::table::IndexShape;

/// A chained hash table holding every record of a dataset.
#[derive(Debug)]
pub struct MemoryIndex {
    shape: IndexShape,
    buckets: Vec<Vec<Record>>,
    skipped: usize,
}

impl MemoryIndex {
    pub fn load(path: &Path, options: &IndexOptions) -> Result<Self> {
        let shape = IndexShape::detect(path, options)?;
        let mut index = Self::with_shape(shape);
        tracing::info!(
            path = %path.display(),
            buckets = shape.table_size,
            "loading vectors into memory"
        );
        for (line_idx, line) in open_lines(path)?.enumerate() {
            let line = line?;
            match Record::parse(&line, shape.vector_size, line_idx + 1) {
                Ok(record) => index.insert(record),
                Err(err) => {
                    on_malformed(options.on_malformed, err)?;
                    index.skipped += 1;
                }
            }
        }
        tracing::info!(
            records = shape.record_count - index.skipped,
            skipped = index.skipped,
            "vectors loaded"
        );
        Ok(index)
    }

    /// An empty table; buckets allocate on their first insert.
    pub fn with_shape(shape: IndexShape) -> Self {
        let mut buckets = Vec::with_capacity(shape.table_size);
        buckets.resize_with(shape.table_size, Vec::new);
        Self {
            shape,
            buckets,
            skipped: 0,
        }
    }

    /// Appends `record` to the tail of its bucket's chain.
    pub fn insert(&mut self, record: Record) {
        let bucket = self.shape.bucket_for(record.key());
        self.buckets[bucket].push(record);
    }

    /// First record stored under `key`, if any. An all-zero vector is a
    /// valid result.
    pub fn lookup(&self, key: &str) -> Option<&[f32]> {
        self.bucket(self.shape.bucket_for(key))
            .iter()
            .find(|record| record.key() == key)
            .map(Record::vector)
    }

    pub fn bucket(&self, index: usize) -> &[Record] {
        self.buckets.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn compare_keys(&self, first: &str, second: &str) -> Comparison {
        let Some(a) = self.lookup(first) else {
            return Comparison::NotFound(first.to_string());
        };
        let Some(b) = self.lookup(second) else {
            return Comparison::NotFound(second.to_string());
        };
        Comparison::Similar(Similarity::between(a, b))
    }

    /// Full scan over the buckets; nothing is tracked incrementally.
    pub fn stats(&self) -> TableStats {
        TableStats::from_chain_lengths(&self.shape, self.buckets.iter().map(Vec::len))
    }

    pub fn shape(&self) -> IndexShape {
        self.shape
    }

    /// Lines dropped under [`MalformedPolicy::Skip`](crate::MalformedPolicy::Skip).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

impl WordVectors for MemoryIndex {
    fn shape(&self) -> IndexShape {
        self.shape
    }

    fn compare(&mut self, first: &str, second: &str) -> Result<Comparison> {
        Ok(self.compare_keys(first, second))
    }
}
