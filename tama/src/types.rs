use std::sync::OnceLock;

use image::RgbaImage;
use serde::Serialize;

use crate::{
    constants::{FOUR_BPP_MAX_COLORS, HEADER_LENGTH, PALETTE_ENTRY_LENGTH},
    error::TamaError,
    palette, pixel,
};

pub type Rgba = [u8; 4];

/// Pixel storage is picked by palette size alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Four,
    Eight,
}

impl BitDepth {
    pub fn from_color_count(color_count: usize) -> Self {
        if color_count <= FOUR_BPP_MAX_COLORS {
            Self::Four
        } else {
            Self::Eight
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    pub fn pixels_per_byte(&self) -> usize {
        match self {
            Self::Four => 2,
            Self::Eight => 1,
        }
    }

    /// Largest index a single pixel can hold.
    pub fn max_index(&self) -> u8 {
        match self {
            Self::Four => 0x0F,
            Self::Eight => 0xFF,
        }
    }

    pub fn packed_len(&self, pixel_count: usize) -> usize {
        pixel_count.div_ceil(self.pixels_per_byte())
    }
}

/// Decoded palette. Entry index is the pixel value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette(pub Vec<Rgba>);

impl Palette {
    pub fn new(s: impl Into<Vec<Rgba>>) -> Self {
        Self(s.into())
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.0
    }

    pub fn get(&self, index: u8) -> Option<Rgba> {
        self.0.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bit_depth(&self) -> BitDepth {
        BitDepth::from_color_count(self.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteHeader {
    pub width: u8,
    pub height: u8,
    pub color_count: u8,
}

impl SpriteHeader {
    pub fn bit_depth(&self) -> BitDepth {
        BitDepth::from_color_count(self.color_count as usize)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn palette_len(&self) -> usize {
        self.color_count as usize * PALETTE_ENTRY_LENGTH
    }

    pub fn data_len(&self) -> usize {
        self.bit_depth().packed_len(self.pixel_count())
    }

    /// Header, palette and pixel data together.
    pub fn block_size(&self) -> usize {
        HEADER_LENGTH + self.palette_len() + self.data_len()
    }
}

/// One sprite found inside a firmware image.
///
/// The block owns a copy of its palette and pixel bytes so it stays valid
/// after the firmware buffer it came from is dropped. Decoded palette and
/// pixels are computed on first use and kept.
#[derive(Debug, Clone)]
pub struct SpriteBlock {
    offset: usize,
    header: SpriteHeader,
    palette_bytes: Vec<u8>,
    pixel_bytes: Vec<u8>,
    palette: OnceLock<Palette>,
    rgba: OnceLock<Vec<u8>>,
}

impl PartialEq for SpriteBlock {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
            && self.header == other.header
            && self.palette_bytes == other.palette_bytes
            && self.pixel_bytes == other.pixel_bytes
    }
}

impl Eq for SpriteBlock {}

impl SpriteBlock {
    pub(crate) fn from_parts(
        offset: usize,
        header: SpriteHeader,
        palette_bytes: &[u8],
        pixel_bytes: &[u8],
    ) -> Self {
        debug_assert_eq!(palette_bytes.len(), header.palette_len());
        debug_assert_eq!(pixel_bytes.len(), header.data_len());

        Self {
            offset,
            header,
            palette_bytes: palette_bytes.to_vec(),
            pixel_bytes: pixel_bytes.to_vec(),
            palette: OnceLock::new(),
            rgba: OnceLock::new(),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn header(&self) -> &SpriteHeader {
        &self.header
    }

    pub fn width(&self) -> u8 {
        self.header.width
    }

    pub fn height(&self) -> u8 {
        self.header.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.header.width as u32, self.header.height as u32)
    }

    pub fn color_count(&self) -> u8 {
        self.header.color_count
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.header.bit_depth()
    }

    pub fn pixel_count(&self) -> usize {
        self.header.pixel_count()
    }

    pub fn palette_bytes(&self) -> &[u8] {
        &self.palette_bytes
    }

    pub fn pixel_bytes(&self) -> &[u8] {
        &self.pixel_bytes
    }

    /// Absolute position of the first pixel byte.
    pub fn data_start(&self) -> usize {
        self.offset + HEADER_LENGTH + self.palette_bytes.len()
    }

    pub fn data_len(&self) -> usize {
        self.pixel_bytes.len()
    }

    pub fn size(&self) -> usize {
        HEADER_LENGTH + self.palette_bytes.len() + self.pixel_bytes.len()
    }

    /// One past the last byte of the block.
    pub fn end(&self) -> usize {
        self.offset + self.size()
    }

    pub fn palette(&self) -> &Palette {
        self.palette
            .get_or_init(|| palette::decode_words(&self.palette_bytes))
    }

    /// Decoded RGBA pixels in row-major order, four bytes per pixel.
    pub fn rgba(&self) -> Result<&[u8], TamaError> {
        if let Some(rgba) = self.rgba.get() {
            return Ok(rgba);
        }

        let rgba = pixel::decode_pixels(&self.pixel_bytes, self.palette(), self.pixel_count())?;

        Ok(self.rgba.get_or_init(|| rgba))
    }

    pub fn decode_image(&self) -> Result<DecodedImage, TamaError> {
        let (width, height) = self.dimensions();

        Ok(DecodedImage {
            width,
            height,
            rgba: self.rgba()?.to_vec(),
        })
    }

    pub fn info(&self) -> BlockInfo {
        BlockInfo {
            offset: self.offset,
            size: self.size(),
            kind: BlockKind::Image,
            width: self.header.width,
            height: self.header.height,
            color_count: self.header.color_count,
            bits_per_pixel: self.bit_depth().bits(),
            data_start: self.data_start(),
            data_len: self.data_len(),
        }
    }
}

/// Every block found by one scan, ordered by offset and never overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareMap {
    blocks: Vec<SpriteBlock>,
}

impl FirmwareMap {
    pub(crate) fn new(blocks: Vec<SpriteBlock>) -> Self {
        debug_assert!(blocks.windows(2).all(|w| w[0].end() <= w[1].offset()));

        Self { blocks }
    }

    pub fn blocks(&self) -> &[SpriteBlock] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpriteBlock> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block whose header starts exactly at `offset`.
    pub fn get(&self, offset: usize) -> Option<&SpriteBlock> {
        self.blocks
            .binary_search_by_key(&offset, |block| block.offset())
            .ok()
            .map(|index| &self.blocks[index])
    }

    pub fn infos(&self) -> Vec<BlockInfo> {
        self.blocks.iter().map(SpriteBlock::info).collect()
    }
}

impl<'a> IntoIterator for &'a FirmwareMap {
    type Item = &'a SpriteBlock;
    type IntoIter = std::slice::Iter<'a, SpriteBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Image,
}

/// Flat metadata for listing and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub offset: usize,
    pub size: usize,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub width: u8,
    pub height: u8,
    #[serde(rename = "colorsCount")]
    pub color_count: u8,
    pub bits_per_pixel: u8,
    pub data_start: usize,
    pub data_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn into_rgba_image(self) -> Result<RgbaImage, TamaError> {
        let expected = self.width as usize * self.height as usize * 4;
        let actual = self.rgba.len();

        RgbaImage::from_raw(self.width, self.height, self.rgba)
            .ok_or(TamaError::MalformedImage { expected, actual })
    }
}
