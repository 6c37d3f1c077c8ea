mod batch;
mod extract;
mod inspect;
mod patch;
mod prepare;
mod scan;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tama::{Firmware, ScanOptions};

use crate::{
    config::{parse_config, parse_config_from_file, Config},
    utils::parse_offset,
};

#[derive(Debug, Parser)]
#[command(version, about = "Find, extract and patch sprites in firmware dumps", long_about = None)]
pub struct TamaedCli {
    /// Path to a config file. Defaults to `tamaed.toml` next to the binary
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Largest sprite width and height to accept (128 for older dumps)
    #[arg(long, global = true)]
    max_dimension: Option<u8>,
    /// Scan partitions of the firmware in parallel
    #[arg(long, global = true)]
    parallel: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every sprite block
    Scan {
        firmware: PathBuf,
        /// Also write the block map as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Report the header found at one offset
    Inspect {
        firmware: PathBuf,
        #[arg(long, value_parser = offset_arg)]
        offset: usize,
    },
    /// Write every sprite as PNG
    Extract {
        firmware: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        /// Skip sprites with fewer pixels than this
        #[arg(long)]
        min_pixels: Option<usize>,
        /// Also write the packed pixel bytes
        #[arg(long)]
        raw: bool,
    },
    /// Convert an edited image to packed pixel bytes using the block's palette
    PngToRaw {
        firmware: PathBuf,
        #[arg(long, value_parser = offset_arg)]
        offset: usize,
        #[arg(long)]
        png: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Splice packed pixel bytes into a copy of the firmware
    PatchRaw {
        firmware: PathBuf,
        #[arg(long, value_parser = offset_arg)]
        offset: usize,
        #[arg(long)]
        raw: PathBuf,
        #[arg(long, default_value = "patched.bin")]
        out: PathBuf,
    },
    /// Quantize an edited image and splice it into a copy of the firmware
    Patch {
        firmware: PathBuf,
        #[arg(long, value_parser = offset_arg)]
        offset: usize,
        #[arg(long)]
        png: PathBuf,
        #[arg(long, default_value = "patched.bin")]
        out: PathBuf,
    },
    /// Write a batch manifest for listed offsets, or for every block
    Prepare {
        firmware: PathBuf,
        /// File with one offset per line (first column)
        #[arg(long)]
        offsets: Option<PathBuf>,
        /// Folder of edited RAW files to point the tasks at
        #[arg(long)]
        edited_dir: Option<PathBuf>,
        /// Folder of edited PNGs, relative to the manifest
        #[arg(long, default_value = "imgs")]
        png_dir: PathBuf,
        #[arg(long, default_value = "tasks.toml")]
        out: PathBuf,
    },
    /// Apply every task of a TOML manifest
    Batch {
        firmware: PathBuf,
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long, default_value = "patched_fw.bin")]
        out: PathBuf,
    },
}

fn offset_arg(s: &str) -> Result<usize, String> {
    parse_offset(s).map_err(|op| op.to_string())
}

pub enum CliRes {
    Ok,
    Err,
}

impl TamaedCli {
    fn config(&self) -> eyre::Result<Config> {
        let mut config = match &self.config {
            Some(path) => parse_config_from_file(path)?,
            None => parse_config()?,
        };

        if let Some(max_dimension) = self.max_dimension {
            config.scan.max_dimension = max_dimension;
        }

        if self.parallel {
            config.scan.parallel = true;
        }

        Ok(config)
    }

    fn run(self) -> eyre::Result<()> {
        let config = self.config()?;

        match self.command {
            Commands::Scan { firmware, json } => {
                scan::scan(&open(&firmware, &config.scan)?, json.as_deref())
            }
            Commands::Inspect { firmware, offset } => {
                inspect::inspect(&open(&firmware, &config.scan)?, offset)
            }
            Commands::Extract {
                firmware,
                out_dir,
                min_pixels,
                raw,
            } => extract::extract(
                &open(&firmware, &config.scan)?,
                &out_dir,
                min_pixels.unwrap_or(config.min_pixels),
                raw,
            ),
            Commands::PngToRaw {
                firmware,
                offset,
                png,
                out,
            } => patch::png_to_raw(&open(&firmware, &config.scan)?, offset, &png, &out),
            Commands::PatchRaw {
                firmware,
                offset,
                raw,
                out,
            } => patch::patch_raw(&open(&firmware, &config.scan)?, offset, &raw, &out),
            Commands::Patch {
                firmware,
                offset,
                png,
                out,
            } => patch::patch_png(&open(&firmware, &config.scan)?, offset, &png, &out),
            Commands::Prepare {
                firmware,
                offsets,
                edited_dir,
                png_dir,
                out,
            } => prepare::prepare(
                &open(&firmware, &config.scan)?,
                offsets.as_deref(),
                edited_dir.as_deref(),
                &png_dir,
                &out,
            ),
            Commands::Batch {
                firmware,
                manifest,
                out,
            } => batch::batch(&open(&firmware, &config.scan)?, &manifest, &out),
        }
    }
}

fn open(path: &std::path::Path, options: &ScanOptions) -> eyre::Result<Firmware> {
    let firmware = Firmware::open_from_file(path, options.clone())?;

    log::info!(
        "loaded {} ({} bytes)",
        path.display(),
        firmware.bytes().len()
    );

    Ok(firmware)
}

pub fn cli() -> CliRes {
    let cli = TamaedCli::parse();

    match cli.run() {
        Ok(_) => CliRes::Ok,
        Err(err) => {
            println!("{}", err);
            CliRes::Err
        }
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition() {
        TamaedCli::command().debug_assert();
    }

    #[test]
    fn hex_offset_flag() {
        let cli = TamaedCli::try_parse_from([
            "tamaed",
            "patch-raw",
            "fw.bin",
            "--offset",
            "0x45C040",
            "--raw",
            "img.raw",
            "--max-dimension",
            "128",
        ])
        .unwrap();

        assert_eq!(cli.max_dimension, Some(128));
        assert!(matches!(
            cli.command,
            Commands::PatchRaw {
                offset: 0x45C040,
                ..
            }
        ));
    }

    #[test]
    fn prepare_defaults() {
        let cli = TamaedCli::try_parse_from([
            "tamaed",
            "prepare",
            "fw.bin",
            "--edited-dir",
            "images/edited",
        ])
        .unwrap();

        let Commands::Prepare {
            offsets,
            edited_dir,
            png_dir,
            out,
            ..
        } = cli.command
        else {
            panic!("expected prepare");
        };

        assert_eq!(offsets, None);
        assert_eq!(edited_dir, Some(PathBuf::from("images/edited")));
        assert_eq!(png_dir, PathBuf::from("imgs"));
        assert_eq!(out, PathBuf::from("tasks.toml"));
    }

    #[test]
    fn bad_offset_flag() {
        let res = TamaedCli::try_parse_from([
            "tamaed", "inspect", "fw.bin", "--offset", "0xZZ",
        ]);

        assert!(res.is_err());
    }
}
