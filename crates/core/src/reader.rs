use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;

use wvht_index::{bucket_records, find_record, record_key, split_bucket_line, IndexHeader};

use crate::dataset::Record;
use crate::error::{Result, WvhtError};
use crate::similarity::{Comparison, Similarity, WordVectors};
use crate::table::IndexShape;

/// Queries a persisted index without loading it.
#[derive(Debug, Clone)]
pub struct IndexReader {
    path: PathBuf,
    shape: IndexShape,
}

/// Vectors for a pair of keys, or the first key, in argument order, that
/// could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum PairLookup {
    Found(Vec<f32>, Vec<f32>),
    NotFound(String),
}

impl IndexReader {
    /// Reads the header line only.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut lines = BufReader::new(File::open(&path)?).lines();
        let first = lines
            .next()
            .transpose()?
            .ok_or_else(|| WvhtError::MalformedHeader(format!("{} is empty", path.display())))?;
        let header = IndexHeader::parse(&first)
            .map_err(|err| WvhtError::MalformedHeader(format!("{err:#}")))?;
        tracing::debug!(path = %path.display(), %header, "opened index file");
        Ok(Self {
            path,
            shape: header.into(),
        })
    }

    pub fn shape(&self) -> IndexShape {
        self.shape
    }

    /// Locates both keys in one forward pass, visiting the lower bucket
    /// first. The scan stops as soon as the result is known.
    pub fn lookup_pair(&self, first: &str, second: &str) -> Result<PairLookup> {
        let keys = [first, second];
        let buckets = [self.shape.bucket_for(first), self.shape.bucket_for(second)];
        let mut scan = self.scan()?;
        let mut found: [Option<Vec<f32>>; 2] = [None, None];

        if buckets[0] == buckets[1] {
            let Some((line_no, body)) = scan.seek(buckets[0])? else {
                return Ok(PairLookup::NotFound(first.to_string()));
            };
            for record in bucket_records(&body) {
                let key = record_key(record);
                for slot in 0..2 {
                    if found[slot].is_none() && key == keys[slot] {
                        found[slot] = Some(self.parse(record, line_no)?);
                    }
                }
                if found.iter().all(Option::is_some) {
                    break;
                }
            }
        } else {
            let order = if buckets[0] < buckets[1] { [0, 1] } else { [1, 0] };
            for slot in order {
                let vector = match scan.seek(buckets[slot])? {
                    Some((line_no, body)) => find_record(&body, keys[slot])
                        .map(|record| self.parse(record, line_no))
                        .transpose()?,
                    None => None,
                };
                match vector {
                    Some(vector) => found[slot] = Some(vector),
                    None if slot == 0 => return Ok(PairLookup::NotFound(first.to_string())),
                    // a missing second key is only reported once the first is found
                    None => {}
                }
            }
        }
        tracing::debug!(lines_read = scan.line_no, "pair lookup finished");

        match found {
            [Some(a), Some(b)] => Ok(PairLookup::Found(a, b)),
            [None, _] => Ok(PairLookup::NotFound(first.to_string())),
            [_, None] => Ok(PairLookup::NotFound(second.to_string())),
        }
    }

    pub fn lookup(&self, key: &str) -> Result<Option<Vec<f32>>> {
        let mut scan = self.scan()?;
        let Some((line_no, body)) = scan.seek(self.shape.bucket_for(key))? else {
            return Ok(None);
        };
        find_record(&body, key)
            .map(|record| self.parse(record, line_no))
            .transpose()
    }

    pub fn compare_keys(&self, first: &str, second: &str) -> Result<Comparison> {
        Ok(match self.lookup_pair(first, second)? {
            PairLookup::Found(a, b) => Comparison::Similar(Similarity::between(&a, &b)),
            PairLookup::NotFound(key) => Comparison::NotFound(key),
        })
    }

    fn scan(&self) -> Result<BucketScan> {
        let mut lines = BufReader::new(File::open(&self.path)?).lines();
        // header
        lines.next().transpose()?;
        Ok(BucketScan {
            lines,
            line_no: 1,
            pending: None,
        })
    }

    fn parse(&self, record: &str, line_no: usize) -> Result<Vec<f32>> {
        Ok(Record::parse(record, self.shape.vector_size, line_no)?.into_vector())
    }
}

impl WordVectors for IndexReader {
    fn shape(&self) -> IndexShape {
        self.shape
    }

    fn compare(&mut self, first: &str, second: &str) -> Result<Comparison> {
        self.compare_keys(first, second)
    }
}

/// Forward-only cursor over the bucket lines of an index file.
struct BucketScan {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    /// Line that ended the previous seek by passing its target.
    pending: Option<String>,
}

impl BucketScan {
    /// Advances to the line of `bucket` and returns its line number and
    /// records. `None` once a later bucket or the end of file is reached.
    fn seek(&mut self, bucket: usize) -> Result<Option<(usize, String)>> {
        loop {
            let line = match self.pending.take() {
                Some(line) => line,
                None => match self.lines.next() {
                    Some(line) => {
                        self.line_no += 1;
                        line?
                    }
                    None => return Ok(None),
                },
            };
            let (index, body) = split_bucket_line(&line).ok_or_else(|| {
                WvhtError::Format(format!("line {} is not a bucket line", self.line_no))
            })?;
            if index == bucket {
                return Ok(Some((self.line_no, body.to_string())));
            }
            if index > bucket {
                self.pending = Some(line);
                return Ok(None);
            }
        }
    }
}
