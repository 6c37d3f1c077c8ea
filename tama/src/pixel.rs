//! Indexed pixel packing.
//!
//! At 4 bits per pixel the low nibble holds the earlier pixel. An odd pixel
//! count leaves the last high nibble as zero padding.
use crate::{
    error::TamaError,
    types::{BitDepth, Palette, Rgba},
};

/// Unpacks every index stored in `bytes`, padding nibble included.
pub fn unpack_indices(bytes: &[u8], depth: BitDepth) -> Vec<u8> {
    match depth {
        BitDepth::Four => bytes
            .iter()
            .flat_map(|&byte| [byte & 0x0F, byte >> 4])
            .collect(),
        BitDepth::Eight => bytes.to_vec(),
    }
}

pub fn encode(indices: &[u8], depth: BitDepth) -> Result<Vec<u8>, TamaError> {
    if let Some(&index) = indices.iter().find(|&&index| index > depth.max_index()) {
        return Err(TamaError::IndexExceedsDepth {
            index,
            bits: depth.bits(),
        });
    }

    let res = match depth {
        BitDepth::Four => indices
            .chunks(2)
            .map(|pair| match pair {
                [first, second] => (second << 4) | first,
                [first] => *first,
                _ => unreachable!(),
            })
            .collect(),
        BitDepth::Eight => indices.to_vec(),
    };

    Ok(res)
}

pub fn indices_to_rgba(indices: &[u8], palette: &Palette) -> Result<Vec<u8>, TamaError> {
    let mut rgba = Vec::with_capacity(indices.len() * 4);

    for &index in indices {
        let color: Rgba = palette
            .get(index)
            .ok_or(TamaError::PaletteIndexOutOfRange {
                index,
                palette_len: palette.len(),
            })?;

        rgba.extend_from_slice(&color);
    }

    Ok(rgba)
}

/// Decodes the first `pixel_count` pixels of `bytes`.
///
/// Depth follows the palette size.
pub fn decode_pixels(
    bytes: &[u8],
    palette: &Palette,
    pixel_count: usize,
) -> Result<Vec<u8>, TamaError> {
    let mut indices = unpack_indices(bytes, palette.bit_depth());
    indices.truncate(pixel_count);

    indices_to_rgba(&indices, palette)
}

/// Decodes every pixel stored in `bytes`.
pub fn decode(bytes: &[u8], palette: &Palette) -> Result<Vec<u8>, TamaError> {
    let pixel_count = bytes.len() * palette.bit_depth().pixels_per_byte();

    decode_pixels(bytes, palette, pixel_count)
}
