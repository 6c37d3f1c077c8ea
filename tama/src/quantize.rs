//! Nearest palette color matching, no dithering.
use crate::{
    error::TamaError,
    types::{Palette, Rgba, SpriteBlock},
};

fn distance(a: &Rgba, b: &Rgba) -> u32 {
    (0..3)
        .map(|channel| {
            let d = a[channel] as i32 - b[channel] as i32;
            (d * d) as u32
        })
        .sum()
}

/// Index of the closest palette entry over red, green and blue.
///
/// Ties go to the lowest index.
pub fn nearest_index(color: &Rgba, palette: &Palette) -> Result<u8, TamaError> {
    let colors = palette.colors();

    if colors.is_empty() || colors.len() > u8::MAX as usize {
        return Err(TamaError::InvalidPaletteSize { len: colors.len() });
    }

    let mut best = (0, distance(color, &colors[0]));

    for (index, entry) in colors.iter().enumerate().skip(1) {
        if best.1 == 0 {
            break;
        }

        let d = distance(color, entry);

        if d < best.1 {
            best = (index, d);
        }
    }

    Ok(best.0 as u8)
}

/// Maps every pixel of a row-major RGBA buffer to a palette index.
pub fn quantize(
    rgba: &[u8],
    (width, height): (u32, u32),
    palette: &Palette,
) -> Result<Vec<u8>, TamaError> {
    let expected = width as usize * height as usize * 4;

    if rgba.len() != expected {
        return Err(TamaError::MalformedImage {
            expected,
            actual: rgba.len(),
        });
    }

    rgba.chunks_exact(4)
        .map(|p| nearest_index(&[p[0], p[1], p[2], p[3]], palette))
        .collect()
}

/// Quantizes against the block's own palette.
///
/// The image must have the block's exact dimensions.
pub fn quantize_for_block(
    block: &SpriteBlock,
    rgba: &[u8],
    dimensions: (u32, u32),
) -> Result<Vec<u8>, TamaError> {
    if dimensions != block.dimensions() {
        return Err(TamaError::DimensionMismatch {
            expected: block.dimensions(),
            actual: dimensions,
        });
    }

    quantize(rgba, dimensions, block.palette())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        parser::read_block_at, pixel::indices_to_rgba, scanner::ScanOptions, writer::build_block,
    };

    fn palette() -> Palette {
        Palette::new(vec![
            [0, 0, 0, 255],
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
            [255, 255, 255, 255],
        ])
    }

    #[test]
    fn nearest_color() {
        let palette = palette();

        assert_eq!(nearest_index(&[200, 10, 10, 255], &palette).unwrap(), 1);
        assert_eq!(nearest_index(&[10, 10, 180, 0], &palette).unwrap(), 3);
        assert_eq!(nearest_index(&[240, 240, 250, 255], &palette).unwrap(), 4);
    }

    #[test]
    fn ties_pick_lowest_index() {
        let palette = Palette::new(vec![[10, 0, 0, 255], [30, 0, 0, 255], [10, 0, 0, 255]]);

        // equally far from entries 0 and 1
        assert_eq!(nearest_index(&[20, 0, 0, 255], &palette).unwrap(), 0);
        // exact match on a duplicated color
        assert_eq!(nearest_index(&[10, 0, 0, 255], &palette).unwrap(), 0);
    }

    #[test]
    fn alpha_is_ignored() {
        let palette = palette();

        assert_eq!(nearest_index(&[255, 0, 0, 0], &palette).unwrap(), 1);
    }

    #[test]
    fn decoded_pixels_quantize_to_same_indices() {
        let palette = palette();
        let indices = vec![4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 2, 2];

        let rgba = indices_to_rgba(&indices, &palette).unwrap();

        assert_eq!(quantize(&rgba, (4, 3), &palette).unwrap(), indices);
    }

    #[test]
    fn empty_palette_is_an_error() {
        assert!(matches!(
            nearest_index(&[0, 0, 0, 255], &Palette::default()),
            Err(TamaError::InvalidPaletteSize { len: 0 })
        ));
        assert!(matches!(
            quantize(&[0; 8], (2, 1), &Palette::default()),
            Err(TamaError::InvalidPaletteSize { len: 0 })
        ));
    }

    #[test]
    fn every_pixel_gets_an_index() {
        let palette = palette();
        let rgba = (0..=255u8).flat_map(|v| [v, 255 - v, v / 2, 255]).collect::<Vec<u8>>();

        let indices = quantize(&rgba, (16, 16), &palette).unwrap();

        assert_eq!(indices.len(), 256);
        assert!(indices.iter().all(|&index| (index as usize) < palette.len()));
    }

    #[test]
    fn buffer_must_match_dimensions() {
        let res = quantize(&[0; 12], (2, 2), &palette());

        assert!(matches!(
            res,
            Err(TamaError::MalformedImage {
                expected: 16,
                actual: 12
            })
        ));
    }

    #[test]
    fn block_dimensions_enforced() {
        let bytes = build_block(3, 2, &palette(), &[0; 6]).unwrap();
        let block = read_block_at(&bytes, 0, &ScanOptions::default()).unwrap();

        let res = quantize_for_block(&block, &[0; 6 * 4], (2, 3));

        assert!(matches!(
            res,
            Err(TamaError::DimensionMismatch {
                expected: (3, 2),
                actual: (2, 3)
            })
        ));

        let rgba = block.rgba().unwrap().to_vec();
        assert_eq!(quantize_for_block(&block, &rgba, (3, 2)).unwrap(), vec![0; 6]);
    }
}
