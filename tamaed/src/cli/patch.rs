use std::path::Path;

use eyre::eyre;
use tama::{patch::encode_image, Firmware};

use crate::utils::load_rgba;

fn write_output(path: &Path, bytes: &[u8]) -> eyre::Result<()> {
    std::fs::write(path, bytes).map_err(|op| eyre!("cannot write `{}`: {op}", path.display()))
}

pub fn png_to_raw(firmware: &Firmware, offset: usize, png: &Path, out: &Path) -> eyre::Result<()> {
    let block = firmware.block_at(offset)?;
    let (rgba, dimensions) = load_rgba(png)?;

    let raw = encode_image(&block, &rgba, dimensions)?;

    write_output(out, &raw)?;

    println!("Wrote RAW pixel data to {}", out.display());
    println!("   bytes: {} (expected {})", raw.len(), block.data_len());

    Ok(())
}

pub fn patch_raw(firmware: &Firmware, offset: usize, raw: &Path, out: &Path) -> eyre::Result<()> {
    let block = firmware.block_at(offset)?;
    let raw = std::fs::read(raw).map_err(|op| eyre!("cannot read `{}`: {op}", raw.display()))?;

    let patched = firmware.raw_patch(&block, &raw)?;

    write_output(out, &patched)?;

    println!(
        "Patched {} bytes at 0x{:X} -> {}",
        raw.len(),
        block.data_start(),
        out.display()
    );

    Ok(())
}

pub fn patch_png(firmware: &Firmware, offset: usize, png: &Path, out: &Path) -> eyre::Result<()> {
    let block = firmware.block_at(offset)?;
    let (rgba, dimensions) = load_rgba(png)?;

    let patched = firmware.quantize_and_patch(&block, &rgba, dimensions)?;

    write_output(out, &patched)?;

    println!(
        "Patched {} bytes at 0x{:X} -> {}",
        block.data_len(),
        block.data_start(),
        out.display()
    );

    Ok(())
}
