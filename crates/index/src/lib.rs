use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Separates the header fields, the bucket index from its records, and the
/// records of one bucket from each other.
pub const FIELD_SEPARATOR: char = ',';

/// Separates a record's key from its vector components.
pub const RECORD_SEPARATOR: char = ' ';

/// First line of a persisted index: `vectorSize,recordCount,tableSize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub vector_size: usize,
    pub record_count: usize,
    pub table_size: usize,
}

impl IndexHeader {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != 3 {
            bail!(
                "expected 3 comma-separated header fields, found {} in '{line}'",
                fields.len()
            );
        }
        let header = Self {
            vector_size: parse_field("vector size", fields[0])?,
            record_count: parse_field("record count", fields[1])?,
            table_size: parse_field("table size", fields[2])?,
        };
        if header.table_size == 0 {
            bail!("header declares an empty table");
        }
        if header.vector_size == 0 {
            bail!("header declares zero-dimensional vectors");
        }
        Ok(header)
    }
}

impl fmt::Display for IndexHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.vector_size,
            self.record_count,
            self.table_size,
            sep = FIELD_SEPARATOR
        )
    }
}

fn parse_field(name: &str, raw: &str) -> Result<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid {name} '{raw}'");
    }
    raw.parse::<usize>()
        .with_context(|| format!("{name} '{raw}' out of range"))
}

/// True when `line` is exactly three comma-separated decimal integers.
pub fn is_header_line(line: &str) -> bool {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut count = 0;
    for field in line.split(FIELD_SEPARATOR) {
        count += 1;
        if count > 3 || field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    count == 3
}

/// Classifies `path` as a persisted index by looking at its first line only.
pub fn is_index_file(path: &Path) -> Result<bool> {
    Ok(read_first_line(path)?
        .map(|line| is_header_line(&line))
        .unwrap_or(false))
}

fn read_first_line(path: &Path) -> Result<Option<String>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Splits a bucket line into its bucket index and the comma-joined records.
///
/// Returns `None` when the line has no numeric `bucketIndex,` prefix.
pub fn split_bucket_line(line: &str) -> Option<(usize, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (index, body) = line.split_once(FIELD_SEPARATOR)?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((index.parse().ok()?, body))
}

pub fn bucket_records(body: &str) -> impl Iterator<Item = &str> {
    body.split(FIELD_SEPARATOR).filter(|record| !record.is_empty())
}

/// The key of a serialized record: everything before the first separator.
pub fn record_key(record: &str) -> &str {
    record
        .split_once(RECORD_SEPARATOR)
        .map(|(key, _)| key)
        .unwrap_or(record)
}

/// Finds the record whose key equals `key` exactly.
pub fn find_record<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    bucket_records(body).find(|record| record_key(record) == key)
}

/// Writes a persisted index line by line, enforcing ascending bucket order.
pub struct BucketLineWriter<W> {
    writer: W,
    header_written: bool,
    last_bucket: Option<usize>,
    buckets_written: usize,
}

impl<W: Write> BucketLineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            last_bucket: None,
            buckets_written: 0,
        }
    }

    pub fn write_header(&mut self, header: &IndexHeader) -> Result<()> {
        if self.header_written {
            bail!("header already written");
        }
        writeln!(self.writer, "{header}")?;
        self.header_written = true;
        Ok(())
    }

    pub fn write_bucket<I, S>(&mut self, bucket: usize, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.header_written {
            bail!("bucket {bucket} written before the header");
        }
        if let Some(last) = self.last_bucket {
            if bucket <= last {
                bail!("bucket {bucket} written after bucket {last}");
            }
        }
        let mut line = bucket.to_string();
        let mut count = 0usize;
        for record in records {
            let record = record.as_ref();
            if record.is_empty() {
                bail!("empty record in bucket {bucket}");
            }
            if record.contains([FIELD_SEPARATOR, '\n', '\r']) {
                bail!("record '{record}' contains a reserved separator");
            }
            line.push(FIELD_SEPARATOR);
            line.push_str(record);
            count += 1;
        }
        if count == 0 {
            bail!("bucket {bucket} has no records");
        }
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.last_bucket = Some(bucket);
        self.buckets_written += 1;
        Ok(count)
    }

    pub fn buckets_written(&self) -> usize {
        self.buckets_written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
