use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use wvht_core::{
    BuildOptions, BuildStrategy, IndexOptions, MalformedPolicy, TableSizing,
    DEFAULT_SPILL_PARTITIONS,
};

use crate::cli::Cli;
use crate::session::SessionOptions;

pub const DEFAULT_CONFIG: &str = "wvht.toml";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub index: IndexSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexSection {
    pub table_size: Option<usize>,
    pub load_divisor: Option<usize>,
    pub skip_malformed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BuildSection {
    pub strategy: Option<String>,
    pub partitions: Option<usize>,
    pub flush_interval: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    pub lowercase: Option<bool>,
}

/// Options after layering command-line flags over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub index: IndexOptions,
    pub build: BuildOptions,
    pub session: SessionOptions,
}

impl Settings {
    pub fn resolve(cli: &Cli, file: &AppConfig) -> Result<Self> {
        let table_sizing = match (cli.table_size, cli.load_divisor) {
            (Some(size), _) => TableSizing::Fixed(size),
            (None, Some(divisor)) => TableSizing::LoadFactor(divisor),
            (None, None) => match (file.index.table_size, file.index.load_divisor) {
                (Some(size), _) => TableSizing::Fixed(size),
                (None, Some(divisor)) => TableSizing::LoadFactor(divisor),
                (None, None) => TableSizing::default(),
            },
        };
        let skip = cli.skip_malformed || file.index.skip_malformed.unwrap_or(false);
        let index = IndexOptions {
            table_sizing,
            on_malformed: if skip {
                MalformedPolicy::Skip
            } else {
                MalformedPolicy::Strict
            },
        };

        let strategy_name = cli
            .strategy
            .as_deref()
            .or(file.build.strategy.as_deref())
            .unwrap_or("rescan");
        let partitions = cli
            .partitions
            .or(file.build.partitions)
            .unwrap_or(DEFAULT_SPILL_PARTITIONS);
        let mut build = BuildOptions {
            strategy: parse_strategy(strategy_name, partitions)?,
            ..BuildOptions::default()
        };
        if let Some(interval) = cli.flush_interval.or(file.build.flush_interval) {
            build.flush_interval = interval;
        }

        let lowercase = !cli.keep_case && file.session.lowercase.unwrap_or(true);
        Ok(Self {
            index,
            build,
            session: SessionOptions { lowercase },
        })
    }
}

fn parse_strategy(value: &str, partitions: usize) -> Result<BuildStrategy> {
    match value.to_lowercase().as_str() {
        "rescan" => Ok(BuildStrategy::Rescan),
        "spill" => {
            if partitions == 0 {
                return Err(anyhow!("spill strategy needs at least one partition"));
            }
            Ok(BuildStrategy::Spill { partitions })
        }
        other => Err(anyhow!("unknown build strategy '{other}'. choose rescan|spill")),
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).map_err(|e| anyhow!("invalid config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["wvht", "vectors.txt"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_config() {
        let settings = Settings::resolve(&cli(&[]), &AppConfig::default()).unwrap();
        assert_eq!(settings.index, IndexOptions::default());
        assert_eq!(settings.build, BuildOptions::default());
        assert!(settings.session.lowercase);
    }

    #[test]
    fn flags_override_file() {
        let file: AppConfig = toml::from_str(
            r#"
            [index]
            table_size = 50
            skip_malformed = true

            [build]
            strategy = "spill"
            partitions = 8
            flush_interval = 100

            [session]
            lowercase = false
            "#,
        )
        .unwrap();
        let settings = Settings::resolve(&cli(&[]), &file).unwrap();
        assert_eq!(settings.index.table_sizing, TableSizing::Fixed(50));
        assert_eq!(settings.index.on_malformed, MalformedPolicy::Skip);
        assert_eq!(settings.build.strategy, BuildStrategy::Spill { partitions: 8 });
        assert_eq!(settings.build.flush_interval, 100);
        assert!(!settings.session.lowercase);

        let settings = Settings::resolve(
            &cli(&["--load-divisor", "10", "--strategy", "rescan"]),
            &file,
        )
        .unwrap();
        assert_eq!(settings.index.table_sizing, TableSizing::LoadFactor(10));
        assert_eq!(settings.build.strategy, BuildStrategy::Rescan);
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(Settings::resolve(&cli(&["--strategy", "magic"]), &AppConfig::default()).is_err());
        assert!(Settings::resolve(
            &cli(&["--strategy", "spill", "--partitions", "0"]),
            &AppConfig::default()
        )
        .is_err());
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("wvht.toml")).unwrap();
        assert!(config.index.table_size.is_none());

        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[index\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
