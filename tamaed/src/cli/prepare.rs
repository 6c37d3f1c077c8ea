//! Writes a `[[task]]` manifest for `batch`.
//!
//! Offsets come from a list file (first comma separated column, hex or
//! decimal, an unparsable first line is taken as a header) or from the scan
//! map. With `--edited-dir` every task points at the edited RAW found for
//! its offset, trying `<dec>.raw`, `<hex>.raw`, `img_<hex>.raw` and the
//! `img_<HEX>.raw` names `extract --raw` writes. Offsets without one are
//! written to `<out>.missing.txt`. Without it, tasks point at the PNGs
//! `extract` names under `--png-dir`.
use std::path::{Path, PathBuf};

use eyre::eyre;
use serde::Serialize;
use tama::Firmware;

use super::inspect::HeaderReport;
use crate::{
    err,
    utils::{block_file_name, parse_offset},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
struct TaskEntry {
    offset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    png: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<PathBuf>,
    // informational, `batch` ignores these
    width: u8,
    height: u8,
    colors: u8,
    magic_ok: bool,
    header_size: usize,
    data_start: String,
    data_len: usize,
    block_size: usize,
}

#[derive(Debug, Serialize)]
struct PreparedManifest {
    task: Vec<TaskEntry>,
}

impl TaskEntry {
    fn new(report: &HeaderReport) -> Self {
        Self {
            offset: format!("0x{:X}", report.offset),
            png: None,
            raw: None,
            width: report.width,
            height: report.height,
            colors: report.colors,
            magic_ok: report.magic_ok,
            header_size: report.header_size,
            data_start: format!("0x{:X}", report.data_start),
            data_len: report.data_len,
            block_size: report.block_size,
        }
    }
}

/// Where the task files live.
enum Sources<'a> {
    /// Existing edited RAWs, written relative to the manifest folder.
    Edited { dir: &'a Path, base: &'a Path },
    /// PNGs that `extract` writes, already relative to the manifest.
    Png(&'a Path),
}

fn parse_offsets_list(s: &str) -> Vec<usize> {
    let mut res = vec![];

    for (i, line) in s.lines().enumerate() {
        let field = line.split(',').next().unwrap_or_default().trim();

        if field.is_empty() || field.starts_with('#') {
            continue;
        }

        match parse_offset(field) {
            Ok(offset) => res.push(offset),
            // header row
            Err(_) if i == 0 => (),
            Err(op) => println!("  line {}: skipped: {op}", i + 1),
        }
    }

    res
}

fn edited_raw_names(offset: usize) -> [String; 4] {
    [
        format!("{offset}.raw"),
        format!("{offset:x}.raw"),
        format!("img_{offset:x}.raw"),
        block_file_name(offset, "raw"),
    ]
}

fn find_edited_raw(dir: &Path, offset: usize) -> Option<PathBuf> {
    edited_raw_names(offset)
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Makes `path` relative to `base` when it lives under it, else absolute.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let (Ok(path), Ok(base)) = (std::fs::canonicalize(path), std::fs::canonicalize(base)) else {
        return path.to_path_buf();
    };

    path.strip_prefix(&base)
        .map(Path::to_path_buf)
        .unwrap_or(path)
}

/// Returns the tasks and the offsets that have no edited file.
fn build_tasks(bytes: &[u8], offsets: &[usize], sources: &Sources) -> (Vec<TaskEntry>, Vec<usize>) {
    let mut tasks = vec![];
    let mut missing = vec![];

    for &offset in offsets {
        let report = match HeaderReport::read(bytes, offset) {
            Ok(report) => report,
            Err(op) => {
                println!("  0x{offset:X}: skipped: {op}");
                continue;
            }
        };

        if !report.magic_ok {
            println!("  0x{offset:X}: header magic does not match");
        }

        let mut task = TaskEntry::new(&report);

        match sources {
            Sources::Edited { dir, base } => match find_edited_raw(dir, offset) {
                Some(path) => task.raw = Some(relative_to(&path, base)),
                None => {
                    missing.push(offset);
                    continue;
                }
            },
            Sources::Png(dir) => task.png = Some(dir.join(block_file_name(offset, "png"))),
        }

        tasks.push(task);
    }

    (tasks, missing)
}

fn missing_file(out: &Path) -> PathBuf {
    out.with_extension("missing.txt")
}

pub fn prepare(
    firmware: &Firmware,
    offsets: Option<&Path>,
    edited_dir: Option<&Path>,
    png_dir: &Path,
    out: &Path,
) -> eyre::Result<()> {
    let offsets = match offsets {
        Some(path) => {
            let s = std::fs::read_to_string(path)
                .map_err(|op| eyre!("cannot read offsets `{}`: {op}", path.display()))?;

            parse_offsets_list(&s)
        }
        None => firmware.map().iter().map(|block| block.offset()).collect(),
    };

    if offsets.is_empty() {
        return err!("No offsets to prepare.");
    }

    let base = out
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    if let Some(dir) = edited_dir {
        if !dir.is_dir() {
            println!(
                "Edited directory not found: {} (every offset will be missing)",
                dir.display()
            );
        }
    }

    let sources = match edited_dir {
        Some(dir) => Sources::Edited { dir, base },
        None => Sources::Png(png_dir),
    };

    let (tasks, missing) = build_tasks(firmware.bytes(), &offsets, &sources);
    let count = tasks.len();

    let s = toml::to_string(&PreparedManifest { task: tasks })?;

    std::fs::write(out, s).map_err(|op| eyre!("cannot write `{}`: {op}", out.display()))?;

    println!("Wrote {count} task(s) to {}", out.display());

    if missing.is_empty() {
        if edited_dir.is_some() {
            println!("All edited RAWs present.");
        }

        return Ok(());
    }

    let path = missing_file(out);
    let list = missing
        .iter()
        .map(|offset| format!("0x{offset:x}"))
        .collect::<Vec<_>>()
        .join("\n");

    std::fs::write(&path, list)
        .map_err(|op| eyre!("cannot write `{}`: {op}", path.display()))?;

    println!(
        "{} edited RAW(s) missing. List saved to {}",
        missing.len(),
        path.display()
    );

    Ok(())
}
