//! Batch patching from a TOML manifest.
//!
//! ```toml
//! [[task]]
//! offset = "0x45C040"
//! png = "edited/img_45C040.png"
//! name = "title screen"
//!
//! [[task]]
//! offset = 4571200
//! raw = "edited/45c040.raw"
//! ```
//!
//! Paths are relative to the manifest.
use std::path::{Path, PathBuf};

use eyre::eyre;
use serde::Deserialize;
use tama::{Firmware, PatchJob, PatchSource};

use crate::{
    err,
    utils::{load_rgba, parse_offset},
};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
enum Offset {
    Number(usize),
    Text(String),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub(super) struct Task {
    offset: Offset,
    pub(super) png: Option<PathBuf>,
    pub(super) raw: Option<PathBuf>,
    name: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub(super) struct Manifest {
    #[serde(rename = "task", default)]
    pub(super) tasks: Vec<Task>,
}

pub(super) fn parse_manifest(s: &str) -> eyre::Result<Manifest> {
    let manifest: Manifest = toml::from_str(s)?;

    Ok(manifest)
}

impl Task {
    pub(super) fn offset(&self) -> eyre::Result<usize> {
        match &self.offset {
            Offset::Number(offset) => Ok(*offset),
            Offset::Text(s) => parse_offset(s),
        }
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| {
                self.png
                    .as_ref()
                    .or(self.raw.as_ref())
                    .map(|path| path.display().to_string())
            })
            .unwrap_or_default()
    }

    fn to_job(&self, root: &Path) -> eyre::Result<PatchJob> {
        let offset = self.offset()?;

        let source = match (&self.png, &self.raw) {
            (Some(png), None) => {
                let (rgba, (width, height)) = load_rgba(&root.join(png))?;

                PatchSource::Rgba {
                    rgba,
                    width,
                    height,
                }
            }
            (None, Some(raw)) => {
                let path = root.join(raw);
                let bytes = std::fs::read(&path)
                    .map_err(|op| eyre!("cannot read `{}`: {op}", path.display()))?;

                PatchSource::Raw(bytes)
            }
            _ => return err!("task must have exactly one of `png` or `raw`"),
        };

        Ok(PatchJob {
            offset,
            source,
            name: Some(self.label()),
        })
    }
}

pub fn batch(firmware: &Firmware, manifest_path: &Path, out: &Path) -> eyre::Result<()> {
    let s = std::fs::read_to_string(manifest_path)
        .map_err(|op| eyre!("cannot read manifest `{}`: {op}", manifest_path.display()))?;
    let manifest = parse_manifest(&s)?;

    if manifest.tasks.is_empty() {
        return err!("No tasks found in manifest.");
    }

    let root = manifest_path.parent().unwrap_or(Path::new("."));
    let total = manifest.tasks.len();

    println!("Patching {total} item(s) into {} ...", out.display());

    let mut jobs = vec![];

    for (i, task) in manifest.tasks.iter().enumerate() {
        match task.to_job(root) {
            Ok(job) => jobs.push(job),
            Err(op) => println!("  [{}/{total}] {}: ERROR: {op}", i + 1, task.label()),
        }
    }

    let outcome = firmware.patch_batch(&jobs);

    for (job, res) in jobs.iter().zip(&outcome.results) {
        let name = job.name.as_deref().unwrap_or_default();

        match res {
            Ok(report) => println!(
                "  {name}: wrote {} bytes at 0x{:X}",
                report.data_len, report.data_start
            ),
            Err(op) => println!("  {name}: ERROR: {op}"),
        }
    }

    std::fs::write(out, &outcome.firmware)
        .map_err(|op| eyre!("cannot write `{}`: {op}", out.display()))?;

    println!(
        "Done. Patched {}/{total} images -> {}",
        outcome.patched_count(),
        out.display()
    );

    Ok(())
}
