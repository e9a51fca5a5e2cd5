use serde::{Deserialize, Serialize};

pub const DEFAULT_LOAD_DIVISOR: usize = 20;
pub const DEFAULT_FLUSH_INTERVAL: usize = 500;
pub const DEFAULT_SPILL_PARTITIONS: usize = 64;

/// How many buckets a table gets for a given record count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableSizing {
    /// `record_count / divisor` buckets, never fewer than one.
    LoadFactor(usize),
    Fixed(usize),
}

impl Default for TableSizing {
    fn default() -> Self {
        TableSizing::LoadFactor(DEFAULT_LOAD_DIVISOR)
    }
}

/// What to do with a dataset line that does not parse as a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    #[default]
    Strict,
    Skip,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IndexOptions {
    #[serde(default)]
    pub table_sizing: TableSizing,
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
}

impl IndexOptions {
    pub fn with_table_size(mut self, table_size: usize) -> Self {
        self.table_sizing = TableSizing::Fixed(table_size);
        self
    }

    pub fn with_malformed(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildStrategy {
    #[default]
    /// Rescan the dataset once per bucket, skipping already placed lines.
    Rescan,
    /// Hash every line once into temporary partition files, then group each
    /// partition in memory.
    Spill { partitions: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOptions {
    #[serde(default)]
    pub strategy: BuildStrategy,
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            strategy: BuildStrategy::Rescan,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

fn default_flush_interval() -> usize {
    DEFAULT_FLUSH_INTERVAL
}
