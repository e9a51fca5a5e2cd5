mod cli;
mod config;
mod report;
mod session;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wvht_core::{IndexBuilder, IndexReader, MemoryIndex, WordVectors};

use crate::cli::Cli;
use crate::config::{load_config, Settings, DEFAULT_CONFIG};

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let file_config = load_config(&config_path)?;
    let settings = Settings::resolve(&cli, &file_config)?;

    match &cli.output {
        Some(output) => build_index(&cli.input, output, &settings, cli.json),
        None if wvht_index::is_index_file(&cli.input)? => query_index_file(&cli.input, &settings),
        None => query_in_memory(&cli.input, &settings, cli.info, cli.json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn build_index(input: &Path, output: &Path, settings: &Settings, json: bool) -> Result<()> {
    let builder = IndexBuilder::new(input, settings.index, settings.build)
        .with_context(|| format!("cannot index {}", input.display()))?;
    let report = builder
        .build(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    let mut stdout = io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(stdout, "{}", report::build(&report))?;
    }
    Ok(())
}

fn query_index_file(path: &Path, settings: &Settings) -> Result<()> {
    let mut reader = IndexReader::open(path)
        .with_context(|| format!("cannot open index file {}", path.display()))?;
    print!("{}", report::shape(&reader.shape()));
    interact(&mut reader, settings)
}

fn query_in_memory(path: &Path, settings: &Settings, info: bool, json: bool) -> Result<()> {
    let mut index = MemoryIndex::load(path, &settings.index)
        .with_context(|| format!("cannot load {}", path.display()))?;
    if index.is_empty() {
        bail!("no word vectors could be loaded from {}", path.display());
    }
    tracing::info!(records = index.len(), skipped = index.skipped(), "index ready");
    if info {
        let stats = index.stats();
        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print!("{}", report::stats(&stats));
        }
    }
    interact(&mut index, settings)
}

fn interact<V: WordVectors>(index: &mut V, settings: &Settings) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let compared = session::run(index, stdin.lock(), &mut stdout, settings.session)?;
    tracing::info!(compared, "session finished");
    Ok(())
}
