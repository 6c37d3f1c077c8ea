use std::path::Path;

use eyre::eyre;
use rayon::prelude::*;
use tama::{Firmware, SpriteBlock};

use crate::utils::block_file_name;

fn extract_block(block: &SpriteBlock, out_dir: &Path, raw: bool) -> eyre::Result<()> {
    let image = block.decode_image()?.into_rgba_image()?;

    image.save(out_dir.join(block_file_name(block.offset(), "png")))?;

    if raw {
        std::fs::write(
            out_dir.join(block_file_name(block.offset(), "raw")),
            block.pixel_bytes(),
        )?;
    }

    Ok(())
}

pub fn extract(
    firmware: &Firmware,
    out_dir: &Path,
    min_pixels: usize,
    raw: bool,
) -> eyre::Result<()> {
    std::fs::create_dir_all(out_dir)?;

    let blocks = firmware
        .map()
        .iter()
        .filter(|block| block.pixel_count() >= min_pixels)
        .collect::<Vec<&SpriteBlock>>();

    let err: Vec<eyre::Error> = blocks
        .par_iter()
        .filter_map(|block| {
            extract_block(block, out_dir, raw)
                .map_err(|op| eyre!("block 0x{:06X}: {op}", block.offset()))
                .err()
        })
        .collect();

    println!(
        "Exported {} of {} blocks to {}",
        blocks.len() - err.len(),
        firmware.map().len(),
        out_dir.display()
    );

    if !err.is_empty() {
        let err_str = err
            .iter()
            .fold(String::new(), |acc, e| format!("{}\n{}", acc, e));

        return Err(eyre!(err_str));
    }

    Ok(())
}
