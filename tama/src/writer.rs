use byte_writer::ByteWriter;

use crate::{
    constants::{HEADER_LENGTH, HEADER_MAGIC},
    error::TamaError,
    palette, pixel,
    types::{Palette, SpriteBlock, SpriteHeader},
};

trait WriteToWriter {
    fn write_to_bytes(&self, writer: &mut ByteWriter);
}

impl WriteToWriter for SpriteHeader {
    fn write_to_bytes(&self, writer: &mut ByteWriter) {
        let Self {
            width,
            height,
            color_count,
        } = self;

        writer.append_u8(*width);
        writer.append_u8(*height);
        writer.append_u8(*color_count);
        writer.append_u8_slice(&HEADER_MAGIC);
    }
}

/// Lays out header, palette bytes and packed pixels back to back.
///
/// The slices are written as given. Use [`build_block`] to get lengths
/// checked against the header.
pub fn write_block(header: &SpriteHeader, palette_bytes: &[u8], pixel_bytes: &[u8]) -> Vec<u8> {
    let mut writer =
        ByteWriter::with_capacity(HEADER_LENGTH + palette_bytes.len() + pixel_bytes.len());

    header.write_to_bytes(&mut writer);
    writer.append_u8_slice(palette_bytes);
    writer.append_u8_slice(pixel_bytes);

    writer.data
}

/// Builds a complete block from a decoded palette and one index per pixel.
pub fn build_block(
    width: u8,
    height: u8,
    palette: &Palette,
    indices: &[u8],
) -> Result<Vec<u8>, TamaError> {
    if palette.is_empty() || palette.len() > u8::MAX as usize {
        return Err(TamaError::InvalidPaletteSize { len: palette.len() });
    }

    let header = SpriteHeader {
        width,
        height,
        color_count: palette.len() as u8,
    };

    if indices.len() != header.pixel_count() {
        return Err(TamaError::SizeMismatch {
            expected: header.pixel_count(),
            actual: indices.len(),
        });
    }

    if let Some(&index) = indices.iter().find(|&&index| index as usize >= palette.len()) {
        return Err(TamaError::PaletteIndexOutOfRange {
            index,
            palette_len: palette.len(),
        });
    }

    let palette_bytes = palette::encode(palette);
    let pixel_bytes = pixel::encode(indices, header.bit_depth())?;

    Ok(write_block(&header, &palette_bytes, &pixel_bytes))
}

impl SpriteBlock {
    /// The block's bytes exactly as they appear in the firmware.
    pub fn write_to_bytes(&self) -> Vec<u8> {
        write_block(self.header(), self.palette_bytes(), self.pixel_bytes())
    }
}
