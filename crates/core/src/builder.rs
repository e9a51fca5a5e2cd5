use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use wvht_index::{
    record_key, split_bucket_line, BucketLineWriter, FIELD_SEPARATOR, RECORD_SEPARATOR,
};

use crate::config::{BuildOptions, BuildStrategy, IndexOptions};
use crate::dataset::{line_key, on_malformed, open_lines, Record};
use crate::error::{Result, WvhtError};
use crate::stats::TableStats;
use crate::table::IndexShape;
use crate::visited::VisitedLines;

/// Serializes a dataset into a persisted bucket-per-line index.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    dataset: PathBuf,
    shape: IndexShape,
    options: IndexOptions,
    build: BuildOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub output: PathBuf,
    pub stats: TableStats,
    pub buckets_written: usize,
    pub skipped: usize,
}

impl IndexBuilder {
    pub fn new(dataset: impl Into<PathBuf>, options: IndexOptions, build: BuildOptions) -> Result<Self> {
        let dataset = dataset.into();
        let shape = IndexShape::detect(&dataset, &options)?;
        Ok(Self {
            dataset,
            shape,
            options,
            build,
        })
    }

    /// Writes the index to `output`, replacing any existing file.
    pub fn build(&self, output: &Path) -> Result<BuildReport> {
        let file = File::create(output)?;
        let mut sink = BucketSink::new(BufWriter::new(file), self.build.flush_interval);
        sink.writer.write_header(&self.shape.header())?;
        tracing::info!(
            output = %output.display(),
            buckets = self.shape.table_size,
            strategy = ?self.build.strategy,
            "creating index file"
        );
        let skipped = match self.build.strategy {
            BuildStrategy::Rescan => self.build_rescan(&mut sink)?,
            BuildStrategy::Spill { partitions } => self.build_spill(&mut sink, partitions)?,
        };
        sink.writer.flush()?;
        let stats = TableStats::new(&self.shape, sink.empty_buckets, sink.max_chain);
        tracing::info!(
            output = %output.display(),
            empty_buckets = stats.empty_buckets,
            max_chain = stats.max_chain,
            skipped,
            "index file written"
        );
        Ok(BuildReport {
            output: output.to_path_buf(),
            buckets_written: sink.writer.buckets_written(),
            stats,
            skipped,
        })
    }

    /// One dataset pass per bucket. Lines are validated during the first
    /// pass; later passes only hash the keys of lines not yet placed.
    fn build_rescan<W: Write>(&self, sink: &mut BucketSink<W>) -> Result<usize> {
        if u32::try_from(self.shape.record_count).is_err() {
            return Err(WvhtError::Format(format!(
                "{} lines exceed the rescan limit; use the spill strategy",
                self.shape.record_count
            )));
        }
        let mut visited = VisitedLines::new();
        let mut skipped = 0usize;
        for bucket in 0..self.shape.table_size {
            if visited.len() as usize >= self.shape.record_count {
                // every line is placed; the rest of the table is empty
                for rest in bucket..self.shape.table_size {
                    sink.emit(rest, &[])?;
                }
                break;
            }
            let mut chain = Vec::new();
            for (line_idx, line) in open_lines(&self.dataset)?.enumerate() {
                let line = line?;
                let Ok(line_no) = u32::try_from(line_idx) else {
                    break;
                };
                if visited.contains(line_no) {
                    continue;
                }
                if bucket == 0 && self.admit(&line, line_idx + 1)?.is_none() {
                    visited.insert(line_no);
                    skipped += 1;
                    continue;
                }
                if self.shape.bucket_for(line_key(&line)) == bucket {
                    chain.push(normalize(&line));
                    visited.insert(line_no);
                }
            }
            sink.emit(bucket, &chain)?;
        }
        Ok(skipped)
    }

    /// One hashing pass that spills `bucket,line` entries into temporary
    /// files covering contiguous bucket ranges, then one grouping pass per
    /// file.
    fn build_spill<W: Write>(&self, sink: &mut BucketSink<W>, partitions: usize) -> Result<usize> {
        let table_size = self.shape.table_size;
        let partitions = partitions.clamp(1, table_size);
        let span = table_size.div_ceil(partitions);
        let mut spills = Vec::with_capacity(partitions);
        for _ in 0..partitions {
            spills.push(BufWriter::new(tempfile::tempfile()?));
        }

        let mut skipped = 0usize;
        for (line_idx, line) in open_lines(&self.dataset)?.enumerate() {
            let line = line?;
            let Some(record) = self.admit(&line, line_idx + 1)? else {
                skipped += 1;
                continue;
            };
            let bucket = self.shape.bucket_for(record_key(&record));
            writeln!(spills[bucket / span], "{bucket}{FIELD_SEPARATOR}{record}")?;
        }
        tracing::debug!(partitions, span, "dataset spilled");

        for (partition, spill) in spills.into_iter().enumerate() {
            let mut file = spill.into_inner().map_err(|err| err.into_error())?;
            file.seek(SeekFrom::Start(0))?;
            let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
            for entry in BufReader::new(file).lines() {
                let entry = entry?;
                let (bucket, record) = split_bucket_line(&entry).ok_or_else(|| {
                    WvhtError::Format(format!("corrupt spill entry '{entry}'"))
                })?;
                groups.entry(bucket).or_default().push(record.to_string());
            }
            let start = partition * span;
            let end = ((partition + 1) * span).min(table_size);
            for bucket in start..end {
                let chain = groups.remove(&bucket).unwrap_or_default();
                sink.emit(bucket, &chain)?;
            }
        }
        Ok(skipped)
    }

    /// Validates `line` for serialization, returning it in stored form, or
    /// `None` if it was skipped.
    fn admit(&self, line: &str, line_no: usize) -> Result<Option<String>> {
        match self.validate(line, line_no) {
            Ok(()) => Ok(Some(normalize(line))),
            Err(err) => {
                on_malformed(self.options.on_malformed, err)?;
                Ok(None)
            }
        }
    }

    fn validate(&self, line: &str, line_no: usize) -> Result<()> {
        Record::parse(line, self.shape.vector_size, line_no)?;
        if line.contains(FIELD_SEPARATOR) {
            return Err(WvhtError::MalformedRecord {
                line: line_no,
                reason: format!("'{FIELD_SEPARATOR}' cannot be stored in an index file"),
            });
        }
        Ok(())
    }
}

/// Rejoins a dataset line's tokens with single spaces. Token text is kept
/// as written.
fn normalize(line: &str) -> String {
    let mut record = String::with_capacity(line.len());
    for (i, token) in line.split_whitespace().enumerate() {
        if i > 0 {
            record.push(RECORD_SEPARATOR);
        }
        record.push_str(token);
    }
    record
}

struct BucketSink<W: Write> {
    writer: BucketLineWriter<W>,
    flush_interval: usize,
    empty_buckets: usize,
    max_chain: usize,
}

impl<W: Write> BucketSink<W> {
    fn new(writer: W, flush_interval: usize) -> Self {
        Self {
            writer: BucketLineWriter::new(writer),
            flush_interval,
            empty_buckets: 0,
            max_chain: 0,
        }
    }

    fn emit(&mut self, bucket: usize, chain: &[String]) -> Result<()> {
        if chain.is_empty() {
            self.empty_buckets += 1;
        } else {
            self.writer.write_bucket(bucket, chain)?;
            self.max_chain = self.max_chain.max(chain.len());
        }
        if self.flush_interval > 0 && (bucket + 1) % self.flush_interval == 0 {
            self.writer.flush()?;
            tracing::info!(buckets_ready = bucket + 1, "flushed index file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MalformedPolicy;
    use crate::memory::MemoryIndex;
    use crate::reader::IndexReader;

    fn dataset(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn single_bucket_chains_every_record() {
        let (dir, path) = dataset("cat 1.0 2.0\ndog 3.0 4.0\nbird 0.0 0.0\n");
        let options = IndexOptions::default().with_table_size(1);
        let builder = IndexBuilder::new(&path, options, BuildOptions::default()).unwrap();
        let out = dir.path().join("table.csv");
        let report = builder.build(&out).unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "2,3,1\n0,cat 1.0 2.0,dog 3.0 4.0,bird 0.0 0.0\n"
        );
        assert_eq!(report.buckets_written, 1);
        assert_eq!(report.stats.empty_buckets, 0);
        assert_eq!(report.stats.max_chain, 3);
    }

    #[test]
    fn empty_buckets_produce_no_lines() {
        let (dir, path) = dataset("a 1\nb 2\n");
        let options = IndexOptions::default().with_table_size(1000);
        let builder = IndexBuilder::new(&path, options, BuildOptions::default()).unwrap();
        let out = dir.path().join("table.csv");
        let report = builder.build(&out).unwrap();
        // 'a' * 179 = 17363, 'b' * 179 = 17542
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "1,2,1000\n363,a 1\n542,b 2\n"
        );
        assert_eq!(report.stats.empty_buckets, 998);
    }

    #[test]
    fn rebuild_replaces_existing_output() {
        let (dir, path) = dataset("cat 1.0 2.0\n");
        let out = dir.path().join("table.csv");
        std::fs::write(&out, "stale contents\n").unwrap();
        let builder =
            IndexBuilder::new(&path, IndexOptions::default(), BuildOptions::default()).unwrap();
        builder.build(&out).unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "2,1,1\n0,cat 1.0 2.0\n"
        );
    }

    #[test]
    fn strict_build_rejects_commas_and_bad_rows() {
        let (dir, path) = dataset("cat 1.0 2.0\na,b 3.0 4.0\n");
        let builder =
            IndexBuilder::new(&path, IndexOptions::default(), BuildOptions::default()).unwrap();
        let err = builder.build(&dir.path().join("table.csv")).unwrap_err();
        assert!(matches!(err, WvhtError::MalformedRecord { line: 2, .. }));

        let (dir, path) = dataset("cat 1.0 2.0\ndog 3.0 four\n");
        let builder =
            IndexBuilder::new(&path, IndexOptions::default(), BuildOptions::default()).unwrap();
        assert!(builder.build(&dir.path().join("table.csv")).is_err());
    }

    #[test]
    fn tab_separated_rows_are_stored_with_single_spaces() {
        let (dir, path) = dataset("cat\t1.0 2.0\ndog\t3.0  4.0\n");
        let options = IndexOptions::default().with_table_size(1);
        for strategy in [BuildStrategy::Rescan, BuildStrategy::Spill { partitions: 1 }] {
            let build = BuildOptions {
                strategy,
                ..BuildOptions::default()
            };
            let out = dir.path().join("table.csv");
            IndexBuilder::new(&path, options, build)
                .unwrap()
                .build(&out)
                .unwrap();
            assert_eq!(
                std::fs::read_to_string(&out).unwrap(),
                "2,2,1\n0,cat 1.0 2.0,dog 3.0 4.0\n"
            );
            let reader = IndexReader::open(&out).unwrap();
            let memory = MemoryIndex::load(&path, &options).unwrap();
            assert_eq!(
                reader.compare_keys("cat", "dog").unwrap(),
                memory.compare_keys("cat", "dog")
            );
        }
    }

    #[derive(Default)]
    struct FlushCounter {
        bytes: Vec<u8>,
        flushes: usize,
    }

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn emit_buckets(flush_interval: usize, buckets: usize) -> FlushCounter {
        let mut sink = BucketSink::new(FlushCounter::default(), flush_interval);
        sink.writer
            .write_header(&IndexShape {
                vector_size: 1,
                record_count: buckets,
                table_size: buckets,
            }
            .header())
            .unwrap();
        for bucket in 0..buckets {
            let chain = if bucket % 3 == 0 {
                vec![format!("k{bucket} 1")]
            } else {
                Vec::new()
            };
            sink.emit(bucket, &chain).unwrap();
        }
        sink.writer.into_inner()
    }

    #[test]
    fn flushes_once_per_interval() {
        let out = emit_buckets(10, 25);
        assert_eq!(out.flushes, 2);
        assert!(String::from_utf8(out.bytes).unwrap().contains("24,k24 1\n"));
    }

    #[test]
    fn zero_interval_never_flushes() {
        assert_eq!(emit_buckets(0, 25).flushes, 0);
    }

    #[test]
    fn skip_policy_drops_bad_rows_in_both_strategies() {
        let (dir, path) = dataset("cat 1.0 2.0\ndog 3.0\nbird 0.0 0.0\n");
        let options = IndexOptions::default()
            .with_table_size(2)
            .with_malformed(MalformedPolicy::Skip);
        for strategy in [BuildStrategy::Rescan, BuildStrategy::Spill { partitions: 2 }] {
            let build = BuildOptions {
                strategy,
                ..BuildOptions::default()
            };
            let builder = IndexBuilder::new(&path, options, build).unwrap();
            let out = dir.path().join("table.csv");
            let report = builder.build(&out).unwrap();
            assert_eq!(report.skipped, 1);
            let contents = std::fs::read_to_string(&out).unwrap();
            assert!(contents.starts_with("2,3,2\n"));
            assert!(!contents.contains("dog"));
            assert!(contents.contains("bird 0.0 0.0"));
        }
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        let (dir, path) = dataset("cat 1.0 2.0 \r\n");
        let builder =
            IndexBuilder::new(&path, IndexOptions::default(), BuildOptions::default()).unwrap();
        let out = dir.path().join("table.csv");
        builder.build(&out).unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "2,1,1\n0,cat 1.0 2.0\n"
        );
    }
}
