use nom::{
    bytes::complete::{tag, take},
    combinator::map,
    number::complete::le_u8,
    IResult as _IResult, Parser,
};

use crate::{
    constants::{HEADER_MAGIC, MIN_PROBE_LENGTH},
    error::TamaError,
    scanner::ScanOptions,
    types::{SpriteBlock, SpriteHeader},
};

pub type IResult<'a, T> = _IResult<&'a [u8], T>;

pub fn parse_header(i: &'_ [u8]) -> IResult<'_, SpriteHeader> {
    map(
        (le_u8, le_u8, le_u8, tag(HEADER_MAGIC.as_slice())),
        |(width, height, color_count, _)| SpriteHeader {
            width,
            height,
            color_count,
        },
    )
    .parse(i)
}

/// Palette bytes then packed pixel bytes.
pub fn parse_body<'a>(i: &'a [u8], header: &SpriteHeader) -> IResult<'a, (&'a [u8], &'a [u8])> {
    (take(header.palette_len()), take(header.data_len())).parse(i)
}

fn header_is_plausible(header: &SpriteHeader, options: &ScanOptions) -> bool {
    let dimension = 1..=options.max_dimension;

    dimension.contains(&header.width)
        && dimension.contains(&header.height)
        && header.color_count > 0
}

/// Probes a single offset.
///
/// `Ok(None)` means the bytes there do not look like a sprite header.
/// A header that looks right but whose block runs past the end of `bytes`
/// is reported as [`TamaError::TruncatedBlock`].
pub fn probe(
    bytes: &[u8],
    offset: usize,
    options: &ScanOptions,
) -> Result<Option<SpriteBlock>, TamaError> {
    let available = bytes.len().saturating_sub(offset);

    if available < MIN_PROBE_LENGTH {
        return Ok(None);
    }

    let i = &bytes[offset..];

    let Ok((i, header)) = parse_header(i) else {
        return Ok(None);
    };

    if !header_is_plausible(&header, options) {
        return Ok(None);
    }

    let size = header.block_size();

    if size > available {
        return Err(TamaError::TruncatedBlock {
            offset,
            size,
            available,
        });
    }

    let (_, (palette_bytes, pixel_bytes)) =
        parse_body(i, &header).map_err(|_| TamaError::TruncatedBlock {
            offset,
            size,
            available,
        })?;

    Ok(Some(SpriteBlock::from_parts(
        offset,
        header,
        palette_bytes,
        pixel_bytes,
    )))
}

/// Reads the block at a known offset, failing if there is none.
pub fn read_block_at(
    bytes: &[u8],
    offset: usize,
    options: &ScanOptions,
) -> Result<SpriteBlock, TamaError> {
    probe(bytes, offset, options)?.ok_or(TamaError::NotABlock { offset })
}
