use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// With one file: query it interactively (an index file is detected by its
/// header, anything else is loaded into memory). With two files: build an
/// index file from the first and write it to the second.
#[derive(Parser, Debug)]
#[command(name = "wvht", version, about = "Word vector similarity through a hash-table index")]
pub struct Cli {
    /// Word vector file, or an index file written by a previous build
    pub input: PathBuf,
    /// Where to write the index file built from INPUT
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long = "table-size")]
    pub table_size: Option<usize>,
    #[arg(long = "load-divisor", conflicts_with = "table_size")]
    pub load_divisor: Option<usize>,
    /// rescan | spill
    #[arg(long)]
    pub strategy: Option<String>,
    #[arg(long)]
    pub partitions: Option<usize>,
    #[arg(long = "flush-interval")]
    pub flush_interval: Option<usize>,
    #[arg(long = "skip-malformed", action = ArgAction::SetTrue)]
    pub skip_malformed: bool,
    #[arg(long = "keep-case", action = ArgAction::SetTrue)]
    pub keep_case: bool,
    /// Print bucket statistics after loading a word vector file
    #[arg(long, action = ArgAction::SetTrue)]
    pub info: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}
