/// Width, height, color count, then three magic bytes.
pub const HEADER_LENGTH: usize = 6;
pub const HEADER_MAGIC: [u8; 3] = [0x00, 0x01, 0xFF];

/// A probe needs this many bytes left in the buffer before it looks at a header.
pub const MIN_PROBE_LENGTH: usize = 10;

pub const MAX_DIMENSION: u8 = 255;
/// Older dumps cap sprites at 128 pixels per side.
pub const LEGACY_MAX_DIMENSION: u8 = 128;

/// Palettes up to this size store two pixels per byte.
pub const FOUR_BPP_MAX_COLORS: usize = 16;

pub const PALETTE_ENTRY_LENGTH: usize = 2;

/// Default partition length for the parallel scan.
pub const DEFAULT_PARTITION_SIZE: usize = 1 << 20;
