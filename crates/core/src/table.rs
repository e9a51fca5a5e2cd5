use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use wvht_index::IndexHeader;

use crate::config::{IndexOptions, TableSizing};
use crate::error::{Result, WvhtError};

/// Multipliers cycled over the key's bytes, restarting every ten bytes.
pub const PRIMES: [i64; 10] = [179, 181, 191, 193, 197, 199, 211, 223, 227, 229];

/// Dimensions of an index, fixed once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexShape {
    pub vector_size: usize,
    pub record_count: usize,
    pub table_size: usize,
}

impl IndexShape {
    /// Reads the vector size off the first line and counts every line of the
    /// dataset.
    pub fn detect(path: &Path, options: &IndexOptions) -> Result<Self> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();
        let vector_size = match lines.next() {
            Some(first) => first?.split_whitespace().count().saturating_sub(1),
            None => 0,
        };
        let mut record_count = if vector_size > 0 { 1 } else { 0 };
        if vector_size > 0 {
            for line in lines {
                line?;
                record_count += 1;
            }
        }
        if vector_size < 1 || record_count < 1 {
            return Err(WvhtError::InvalidShape {
                path: path.to_path_buf(),
                vector_size,
                record_count,
            });
        }
        let table_size = options.table_sizing.table_size(record_count)?;
        tracing::debug!(
            path = %path.display(),
            vector_size,
            record_count,
            table_size,
            "detected dataset shape"
        );
        Ok(Self {
            vector_size,
            record_count,
            table_size,
        })
    }

    pub fn bucket_for(&self, key: &str) -> usize {
        bucket_for(key, self.table_size)
    }

    pub fn load_factor(&self) -> f64 {
        self.record_count as f64 / self.table_size as f64
    }

    pub fn header(&self) -> IndexHeader {
        IndexHeader {
            vector_size: self.vector_size,
            record_count: self.record_count,
            table_size: self.table_size,
        }
    }
}

impl From<IndexHeader> for IndexShape {
    fn from(header: IndexHeader) -> Self {
        Self {
            vector_size: header.vector_size,
            record_count: header.record_count,
            table_size: header.table_size,
        }
    }
}

impl TableSizing {
    pub fn table_size(&self, record_count: usize) -> Result<usize> {
        match *self {
            TableSizing::LoadFactor(0) => Err(WvhtError::InvalidTableSize(
                "load factor divisor must be at least 1".to_string(),
            )),
            TableSizing::LoadFactor(divisor) => Ok((record_count / divisor).max(1)),
            TableSizing::Fixed(0) => Err(WvhtError::InvalidTableSize(
                "a table needs at least one bucket".to_string(),
            )),
            TableSizing::Fixed(size) => Ok(size),
        }
    }
}

/// Maps `key` to a bucket in `[0, table_size)`.
///
/// Bytes are weighed as signed codes, so keys with non-ASCII bytes can
/// accumulate a negative sum; those land in bucket 0.
pub fn bucket_for(key: &str, table_size: usize) -> usize {
    if table_size == 0 {
        return 0;
    }
    let mut hash: i64 = 0;
    for (i, byte) in key.bytes().enumerate() {
        let code = byte as i8 as i64;
        hash = hash.wrapping_add(code.wrapping_mul(PRIMES[i % PRIMES.len()]));
    }
    let table = table_size as i64;
    let index = hash % table;
    if index < 0 {
        0
    } else if index > table - 1 {
        table_size - 1
    } else {
        index as usize
    }
}
