#[derive(Debug, thiserror::Error)]
pub enum TamaError {
    #[error("Palette must have an even number of bytes. Have ({length})")]
    MalformedPalette { length: usize },
    #[error("Pixel index {index} is out of range for a palette of {palette_len} colors")]
    PaletteIndexOutOfRange { index: u8, palette_len: usize },
    #[error("Pixel index {index} does not fit in {bits} bits")]
    IndexExceedsDepth { index: u8, bits: u8 },
    #[error("Block at {offset:#X} needs {size} bytes but only {available} remain")]
    TruncatedBlock {
        offset: usize,
        size: usize,
        available: usize,
    },
    #[error("No sprite header at {offset:#X}")]
    NotABlock { offset: usize },
    #[error("Image is {}x{}, expected {}x{}", .actual.0, .actual.1, .expected.0, .expected.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("RGBA buffer has {actual} bytes, expected {expected}")]
    MalformedImage { expected: usize, actual: usize },
    #[error("Mismatched pixel data length. Expect ({expected}). Have ({actual})")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Range {start:#X}..{end:#X} is outside of a {len} byte firmware")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("Palette must have 1 to 255 colors. Have ({len})")]
    InvalidPaletteSize { len: usize },
    #[error("IOError: {source}")]
    IOError {
        #[from]
        source: std::io::Error,
    },
}
