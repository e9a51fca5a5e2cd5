//! Hash-table index over word-vector datasets.
//!
//! A dataset is a text file with one `key v1 … vN` record per line. It can be
//! loaded into a [`MemoryIndex`] for a single session, or serialized once by
//! [`IndexBuilder`] into a bucket-per-line file that [`IndexReader`] queries
//! by scanning only the prefix it needs.

mod builder;
mod config;
mod dataset;
mod error;
mod memory;
mod reader;
mod similarity;
mod stats;
mod table;
mod visited;

pub use builder::{BuildReport, IndexBuilder};
pub use config::{
    BuildOptions, BuildStrategy, IndexOptions, MalformedPolicy, TableSizing,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_LOAD_DIVISOR, DEFAULT_SPILL_PARTITIONS,
};
pub use dataset::{line_key, Record};
pub use error::{Result, WvhtError};
pub use memory::MemoryIndex;
pub use reader::{IndexReader, PairLookup};
pub use similarity::{
    cosine_similarity, dot, euclidean_distance, euclidean_norm, Comparison, Similarity,
    WordVectors,
};
pub use stats::TableStats;
pub use table::{bucket_for, IndexShape, PRIMES};
pub use visited::VisitedLines;
