//! BGR565 palette words.
//!
//! Each entry is a big-endian `u16`: blue in bits 15..11, green in 10..5,
//! red in 4..0. Channels are rescaled to 8 bits with rounding and alpha is
//! always opaque.
use byte_writer::ByteWriter;

use crate::{
    constants::PALETTE_ENTRY_LENGTH,
    error::TamaError,
    types::{Palette, Rgba},
};

const FIVE_BIT_MAX: u16 = 0x1F;
const SIX_BIT_MAX: u16 = 0x3F;

fn expand(component: u16, max: u16) -> u8 {
    ((component as u32 * 255 + max as u32 / 2) / max as u32) as u8
}

fn compress(channel: u8, max: u16) -> u16 {
    ((channel as u32 * max as u32 + 127) / 255) as u16
}

pub fn decode_entry(word: u16) -> Rgba {
    let blue = (word >> 11) & FIVE_BIT_MAX;
    let green = (word >> 5) & SIX_BIT_MAX;
    let red = word & FIVE_BIT_MAX;

    [
        expand(red, FIVE_BIT_MAX),
        expand(green, SIX_BIT_MAX),
        expand(blue, FIVE_BIT_MAX),
        255,
    ]
}

/// Alpha is dropped.
pub fn encode_entry([red, green, blue, _]: Rgba) -> u16 {
    (compress(blue, FIVE_BIT_MAX) << 11)
        | (compress(green, SIX_BIT_MAX) << 5)
        | compress(red, FIVE_BIT_MAX)
}

pub fn decode(bytes: &[u8]) -> Result<Palette, TamaError> {
    if bytes.len() % PALETTE_ENTRY_LENGTH != 0 {
        return Err(TamaError::MalformedPalette {
            length: bytes.len(),
        });
    }

    Ok(decode_words(bytes))
}

/// Caller guarantees an even length. A trailing odd byte is ignored.
pub(crate) fn decode_words(bytes: &[u8]) -> Palette {
    Palette::new(
        bytes
            .chunks_exact(PALETTE_ENTRY_LENGTH)
            .map(|word| decode_entry(u16::from_be_bytes([word[0], word[1]])))
            .collect::<Vec<Rgba>>(),
    )
}

pub fn encode(palette: &Palette) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(palette.len() * PALETTE_ENTRY_LENGTH);

    palette
        .colors()
        .iter()
        .for_each(|&color| writer.append_be_u16(encode_entry(color)));

    writer.data
}
