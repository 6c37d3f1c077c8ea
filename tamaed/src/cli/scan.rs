use std::path::Path;

use eyre::eyre;
use tama::Firmware;

pub fn scan(firmware: &Firmware, json: Option<&Path>) -> eyre::Result<()> {
    let infos = firmware.list_blocks();

    for info in &infos {
        println!(
            "0x{:06X}  {:>3}x{:<3}  {:>3} colors  {}bpp  {} bytes",
            info.offset, info.width, info.height, info.color_count, info.bits_per_pixel, info.size
        );
    }

    println!("Found {} image blocks", infos.len());

    if let Some(path) = json {
        let s = serde_json::to_string_pretty(&infos)?;

        std::fs::write(path, s)
            .map_err(|op| eyre!("cannot write `{}`: {op}", path.display()))?;

        println!("Wrote {}", path.display());
    }

    Ok(())
}
