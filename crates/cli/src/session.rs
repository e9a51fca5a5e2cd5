use std::collections::VecDeque;
use std::io::{BufRead, Write};

use anyhow::Result;
use wvht_core::WordVectors;

use crate::report;

/// Typing this word ends the session.
pub const QUIT_WORD: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub lowercase: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { lowercase: true }
    }
}

/// Prompts for word pairs until the quit word or end of input, printing one
/// comparison per pair. Returns the number of pairs compared.
pub fn run<V, R, W>(index: &mut V, input: R, out: &mut W, options: SessionOptions) -> Result<usize>
where
    V: WordVectors,
    R: BufRead,
    W: Write,
{
    let mut words = Words::new(input);
    let mut compared = 0usize;
    loop {
        writeln!(
            out,
            "Enter a word you want to compare to another (enter '{QUIT_WORD}' to quit):"
        )?;
        out.flush()?;
        let Some(first) = next_word(&mut words, options)? else {
            break;
        };
        writeln!(
            out,
            "Enter a word you want to compare to \"{first}\" (enter '{QUIT_WORD}' to quit):"
        )?;
        out.flush()?;
        let Some(second) = next_word(&mut words, options)? else {
            break;
        };
        let comparison = index.compare(&first, &second)?;
        tracing::debug!(%first, %second, ?comparison, "compared");
        writeln!(out, "{}", report::comparison(&first, &second, &comparison))?;
        compared += 1;
    }
    Ok(compared)
}

fn next_word<R: BufRead>(words: &mut Words<R>, options: SessionOptions) -> Result<Option<String>> {
    let Some(word) = words.next_word()? else {
        return Ok(None);
    };
    let word = if options.lowercase {
        word.to_lowercase()
    } else {
        word
    };
    if word == QUIT_WORD {
        return Ok(None);
    }
    Ok(Some(word))
}

/// Whitespace-separated words across input lines.
struct Words<R> {
    input: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> Words<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            pending: VecDeque::new(),
        }
    }

    fn next_word(&mut self) -> Result<Option<String>> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
        Ok(self.pending.pop_front())
    }
}
