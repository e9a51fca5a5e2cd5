use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::config::MalformedPolicy;
use crate::error::{Result, WvhtError};

/// One key and its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    key: String,
    vector: Vec<f32>,
}

impl Record {
    pub fn new(key: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            key: key.into(),
            vector,
        }
    }

    /// Parses `key v1 … vN`; `line_no` is 1-based and only used in errors.
    pub fn parse(line: &str, vector_size: usize, line_no: usize) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let key = tokens.next().ok_or_else(|| WvhtError::MalformedRecord {
            line: line_no,
            reason: "blank line".to_string(),
        })?;
        let vector = parse_values(tokens, vector_size, line_no)?;
        Ok(Self::new(key, vector))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn into_vector(self) -> Vec<f32> {
        self.vector
    }
}

fn parse_values<'a>(
    tokens: impl Iterator<Item = &'a str>,
    vector_size: usize,
    line_no: usize,
) -> Result<Vec<f32>> {
    let mut vector = Vec::with_capacity(vector_size);
    for token in tokens {
        let value = token
            .parse::<f32>()
            .map_err(|_| WvhtError::MalformedRecord {
                line: line_no,
                reason: format!("'{token}' is not a number"),
            })?;
        vector.push(value);
    }
    if vector.len() != vector_size {
        return Err(WvhtError::MalformedRecord {
            line: line_no,
            reason: format!("expected {vector_size} values, found {}", vector.len()),
        });
    }
    Ok(vector)
}

/// The key of a raw dataset line, without parsing its values.
pub fn line_key(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

/// Applies `policy` to a parse failure: strict mode propagates it, skip mode
/// logs and swallows it.
pub(crate) fn on_malformed(policy: MalformedPolicy, err: WvhtError) -> Result<()> {
    match policy {
        MalformedPolicy::Strict => Err(err),
        MalformedPolicy::Skip => {
            tracing::warn!("skipping line: {err}");
            Ok(())
        }
    }
}

pub(crate) fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(BufReader::new(file).lines())
}
