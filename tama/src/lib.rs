//! Sprite blocks inside firmware images.
//!
//! A sprite block is a 6 byte header (`width`, `height`, `color_count`,
//! `00 01 FF`), a BGR565 palette of `color_count` big-endian words, then
//! indexed pixels packed at 4 bits per pixel for palettes of up to 16
//! colors and 8 bits per pixel otherwise.
pub mod constants;
pub mod error;
mod firmware;
pub mod palette;
pub mod parser;
pub mod patch;
pub mod pixel;
pub mod quantize;
pub mod scanner;
mod types;
pub mod writer;

pub use firmware::Firmware;
pub use patch::{patch_batch, quantize_and_patch, raw_patch, BatchOutcome, PatchJob, PatchSource};
pub use scanner::ScanOptions;
pub use types::*;

use error::TamaError;

/// Scans `bytes` with the default options.
pub fn load_firmware(bytes: &[u8]) -> FirmwareMap {
    scanner::scan(bytes, &ScanOptions::default())
}

pub fn decode_image(block: &SpriteBlock) -> Result<DecodedImage, TamaError> {
    block.decode_image()
}

pub fn list_blocks(map: &FirmwareMap) -> Vec<BlockInfo> {
    map.infos()
}
