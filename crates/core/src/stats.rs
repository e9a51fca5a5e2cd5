use serde::{Deserialize, Serialize};

use crate::table::IndexShape;

/// Bucket occupancy of a built table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub vector_size: usize,
    pub record_count: usize,
    pub table_size: usize,
    pub load_factor: f64,
    pub empty_buckets: usize,
    pub empty_bucket_pct: f64,
    pub max_chain: usize,
    pub max_chain_pct: f64,
}

impl TableStats {
    /// Folds per-bucket record counts into summary figures.
    pub fn from_chain_lengths(shape: &IndexShape, chains: impl IntoIterator<Item = usize>) -> Self {
        let mut empty_buckets = 0usize;
        let mut max_chain = 0usize;
        for len in chains {
            if len == 0 {
                empty_buckets += 1;
            }
            max_chain = max_chain.max(len);
        }
        Self::new(shape, empty_buckets, max_chain)
    }

    pub fn new(shape: &IndexShape, empty_buckets: usize, max_chain: usize) -> Self {
        Self {
            vector_size: shape.vector_size,
            record_count: shape.record_count,
            table_size: shape.table_size,
            load_factor: shape.load_factor(),
            empty_buckets,
            empty_bucket_pct: percent(empty_buckets, shape.table_size),
            max_chain,
            max_chain_pct: percent(max_chain, shape.record_count),
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}
