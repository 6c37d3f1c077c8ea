//! Parses config file
use std::{
    env,
    path::{Path, PathBuf},
};

use eyre::eyre;
use serde::Deserialize;
use tama::ScanOptions;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scan: ScanOptions,
    /// Blocks with fewer pixels are not extracted.
    pub min_pixels: usize,
}

pub static CONFIG_FILE_NAME: &str = "tamaed.toml";

/// Parse `tamaed.toml` in the same folder as the binary, if there is one.
pub fn parse_config() -> eyre::Result<Config> {
    let path = match env::current_exe() {
        Ok(path) => path
            .parent()
            .map(|parent| parent.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
        Err(_) => PathBuf::from(CONFIG_FILE_NAME),
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    parse_config_from_file(&path)
}

pub fn parse_config_from_file(path: &Path) -> eyre::Result<Config> {
    let buffer = std::fs::read_to_string(path)
        .map_err(|op| eyre!("cannot read config `{}`: {op}", path.display()))?;

    parse_config_from_str(&buffer)
}

pub fn parse_config_from_str(s: &str) -> eyre::Result<Config> {
    let config: Config = toml::from_str(s)?;

    if config.scan.max_dimension == 0 {
        return Err(eyre!("max_dimension must be at least 1"));
    }

    if config.scan.partition_size == 0 {
        return Err(eyre!("partition_size must be at least 1"));
    }

    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(parse_config_from_str("").unwrap(), Config::default());
    }

    #[test]
    fn legacy_variant() {
        let config = parse_config_from_str(
            "\
min_pixels = 64

[scan]
max_dimension = 128
parallel = true
",
        )
        .unwrap();

        assert_eq!(config.min_pixels, 64);
        assert_eq!(config.scan.max_dimension, 128);
        assert!(config.scan.parallel);
        assert_eq!(
            config.scan.partition_size,
            ScanOptions::default().partition_size
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_config_from_str("[scan]\nmax_dimension = 0").is_err());
        assert!(parse_config_from_str("[scan]\nmax_dimension = 300").is_err());
        assert!(parse_config_from_str("[scan]\npartition_size = 0").is_err());
    }
}
