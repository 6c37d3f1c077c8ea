//! Splicing replacement pixel data into firmware.
//!
//! Only the pixel data of a block is ever written. Header and palette stay as
//! they are and the buffer never changes length. Checks run before the first
//! byte is copied, so a failed patch leaves the buffer untouched.
use rayon::prelude::*;

use crate::{
    error::TamaError,
    pixel,
    quantize::quantize_for_block,
    types::{FirmwareMap, SpriteBlock},
};

/// Writes `index_bytes` over the block's pixel data in `firmware`.
pub fn patch(
    firmware: &mut [u8],
    block: &SpriteBlock,
    index_bytes: &[u8],
) -> Result<(), TamaError> {
    let expected = block.data_len();

    if index_bytes.len() != expected {
        return Err(TamaError::SizeMismatch {
            expected,
            actual: index_bytes.len(),
        });
    }

    let start = block.data_start();
    let end = start + expected;

    let Some(target) = firmware.get_mut(start..end) else {
        return Err(TamaError::OutOfBounds {
            start,
            end,
            len: firmware.len(),
        });
    };

    target.copy_from_slice(index_bytes);

    log::info!("patched {expected} bytes at {start:#X}");

    Ok(())
}

/// Quantizes an RGBA image against the block's palette and packs it.
pub fn encode_image(
    block: &SpriteBlock,
    rgba: &[u8],
    dimensions: (u32, u32),
) -> Result<Vec<u8>, TamaError> {
    let indices = quantize_for_block(block, rgba, dimensions)?;

    pixel::encode(&indices, block.bit_depth())
}

/// Returns a patched copy of `firmware`.
pub fn raw_patch(
    firmware: &[u8],
    block: &SpriteBlock,
    index_bytes: &[u8],
) -> Result<Vec<u8>, TamaError> {
    let mut res = firmware.to_vec();

    patch(&mut res, block, index_bytes)?;

    Ok(res)
}

/// Returns a copy of `firmware` with the block's pixels replaced by `rgba`.
pub fn quantize_and_patch(
    firmware: &[u8],
    block: &SpriteBlock,
    rgba: &[u8],
    dimensions: (u32, u32),
) -> Result<Vec<u8>, TamaError> {
    let index_bytes = encode_image(block, rgba, dimensions)?;

    raw_patch(firmware, block, &index_bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource {
    /// Packed pixel bytes, used as is.
    Raw(Vec<u8>),
    /// Row-major RGBA pixels to quantize first.
    Rgba {
        rgba: Vec<u8>,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchJob {
    /// Offset of the target block's header.
    pub offset: usize,
    pub source: PatchSource,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub offset: usize,
    pub data_start: usize,
    pub data_len: usize,
}

pub struct BatchOutcome {
    pub firmware: Vec<u8>,
    /// One entry per job, in job order.
    pub results: Vec<Result<PatchReport, TamaError>>,
}

impl BatchOutcome {
    pub fn patched_count(&self) -> usize {
        self.results.iter().filter(|res| res.is_ok()).count()
    }
}

fn prepare_job<'a>(
    map: &'a FirmwareMap,
    job: &PatchJob,
) -> Result<(&'a SpriteBlock, Vec<u8>), TamaError> {
    let block = map
        .get(job.offset)
        .ok_or(TamaError::NotABlock { offset: job.offset })?;

    let index_bytes = match &job.source {
        PatchSource::Raw(bytes) => bytes.clone(),
        PatchSource::Rgba {
            rgba,
            width,
            height,
        } => encode_image(block, rgba, (*width, *height))?,
    };

    Ok((block, index_bytes))
}

/// Applies every job to one private copy of `firmware`.
///
/// Jobs are quantized in parallel and spliced in order. A job that fails is
/// reported and skipped; the others still apply.
pub fn patch_batch(firmware: &[u8], map: &FirmwareMap, jobs: &[PatchJob]) -> BatchOutcome {
    let prepared = jobs
        .par_iter()
        .map(|job| prepare_job(map, job))
        .collect::<Vec<_>>();

    let mut copy = firmware.to_vec();

    let results = jobs
        .iter()
        .zip(prepared)
        .map(|(job, prepared)| {
            let name = job.name.as_deref().unwrap_or("<unnamed>");

            let res = prepared.and_then(|(block, index_bytes)| {
                patch(&mut copy, block, &index_bytes)?;

                Ok(PatchReport {
                    offset: block.offset(),
                    data_start: block.data_start(),
                    data_len: block.data_len(),
                })
            });

            if let Err(err) = &res {
                log::warn!("{name} ({:#X}): {err}", job.offset);
            }

            res
        })
        .collect::<Vec<_>>();

    BatchOutcome {
        firmware: copy,
        results,
    }
}

#[cfg(test)]
mod test {
    use byte_writer::ByteWriter;

    use super::*;
    use crate::{
        pixel::indices_to_rgba,
        scanner::{scan, ScanOptions},
        types::Palette,
        writer::build_block,
    };

    fn palette(len: usize) -> Palette {
        Palette::new(
            (0..len)
                .map(|i| [(i * 8) as u8, 255 - (i * 8) as u8, 0, 255])
                .collect::<Vec<_>>(),
        )
    }

    /// 5x3 4bpp block at 32, 4x4 8bpp block at 128.
    fn firmware() -> Vec<u8> {
        let mut writer = ByteWriter::new();

        writer.pad_to(32, 0xEE);
        writer.append_u8_slice(&build_block(5, 3, &palette(16), &[1; 15]).unwrap());
        writer.pad_to(128, 0xEE);
        writer.append_u8_slice(&build_block(4, 4, &palette(30), &[2; 16]).unwrap());
        writer.pad_to(256, 0xEE);

        writer.data
    }

    fn assert_only_range_changed(before: &[u8], after: &[u8], start: usize, len: usize) {
        assert_eq!(before.len(), after.len());
        assert_eq!(before[..start], after[..start]);
        assert_eq!(before[start + len..], after[start + len..]);
    }

    #[test]
    fn raw_patch_touches_only_pixel_data() {
        let original = firmware();
        let map = scan(&original, &ScanOptions::default());
        let block = map.get(32).unwrap();

        assert_eq!(block.data_len(), 8);

        let patched = raw_patch(&original, block, &[0xAB; 8]).unwrap();

        assert_only_range_changed(&original, &patched, block.data_start(), 8);
        assert_eq!(&patched[block.data_start()..block.data_start() + 8], &[0xAB; 8]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let original = firmware();
        let map = scan(&original, &ScanOptions::default());
        let block = map.get(128).unwrap();

        let mut copy = original.clone();
        let res = patch(&mut copy, block, &[0; 15]);

        assert!(matches!(
            res,
            Err(TamaError::SizeMismatch {
                expected: 16,
                actual: 15
            })
        ));
        assert_eq!(copy, original);
    }

    #[test]
    fn short_firmware_is_out_of_bounds() {
        let original = firmware();
        let map = scan(&original, &ScanOptions::default());
        let block = map.get(128).unwrap();

        let mut short = original[..140].to_vec();
        let res = patch(&mut short, block, &[0; 16]);

        assert!(matches!(res, Err(TamaError::OutOfBounds { len: 140, .. })));
        assert_eq!(short, original[..140]);
    }

    #[test]
    fn quantize_and_patch_rescans_to_new_pixels() {
        let original = firmware();
        let map = scan(&original, &ScanOptions::default());
        let block = map.get(32).unwrap();

        let indices = (0..15).collect::<Vec<u8>>();
        let rgba = indices_to_rgba(&indices, block.palette()).unwrap();

        let patched = quantize_and_patch(&original, block, &rgba, (5, 3)).unwrap();
        assert_only_range_changed(&original, &patched, block.data_start(), block.data_len());

        let map = scan(&patched, &ScanOptions::default());
        assert_eq!(map.get(32).unwrap().rgba().unwrap(), rgba.as_slice());
    }

    #[test]
    fn quantize_and_patch_keeps_size() {
        let original = firmware();
        let map = scan(&original, &ScanOptions::default());
        let block = map.get(32).unwrap();

        let res = quantize_and_patch(&original, block, &[0; 4 * 4 * 4], (4, 4));

        assert!(matches!(res, Err(TamaError::DimensionMismatch { .. })));
    }

    #[test]
    fn batch_skips_failed_jobs() {
        let original = firmware();
        let map = scan(&original, &ScanOptions::default());
        let eight_bpp = map.get(128).unwrap();

        let jobs = vec![
            PatchJob {
                offset: 32,
                source: PatchSource::Raw(vec![0x33; 8]),
                name: Some("first".into()),
            },
            PatchJob {
                offset: 33,
                source: PatchSource::Raw(vec![0; 8]),
                name: None,
            },
            PatchJob {
                offset: 128,
                source: PatchSource::Rgba {
                    rgba: indices_to_rgba(&[7; 16], eight_bpp.palette()).unwrap(),
                    width: 4,
                    height: 4,
                },
                name: Some("second".into()),
            },
            PatchJob {
                offset: 128,
                source: PatchSource::Raw(vec![0; 3]),
                name: Some("too short".into()),
            },
        ];

        let outcome = patch_batch(&original, &map, &jobs);

        assert_eq!(outcome.patched_count(), 2);
        assert!(matches!(
            outcome.results[1],
            Err(TamaError::NotABlock { offset: 33 })
        ));
        assert!(matches!(
            outcome.results[3],
            Err(TamaError::SizeMismatch { .. })
        ));

        let first = map.get(32).unwrap();
        let patched = &outcome.firmware;
        assert_eq!(
            &patched[first.data_start()..first.data_start() + 8],
            &[0x33; 8]
        );
        assert_eq!(
            &patched[eight_bpp.data_start()..eight_bpp.data_start() + 16],
            &[7; 16]
        );
        assert_eq!(patched.len(), original.len());
    }
}
