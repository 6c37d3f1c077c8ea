//! Greedy sprite discovery over an arbitrary buffer.
//!
//! Every offset is probed left to right. A match moves the cursor past the
//! whole block so matches never overlap or nest. There is no checksum in the
//! format, so random bytes that happen to look like a header are accepted
//! too.
use rayon::prelude::*;
use serde::Deserialize;

use crate::{
    constants::{DEFAULT_PARTITION_SIZE, MAX_DIMENSION},
    error::TamaError,
    parser::probe,
    types::{FirmwareMap, SpriteBlock},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Largest accepted width and height.
    pub max_dimension: u8,
    pub parallel: bool,
    pub partition_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
            parallel: false,
            partition_size: DEFAULT_PARTITION_SIZE,
        }
    }
}

/// Same as [`probe`] but a truncated candidate is just a miss.
fn probe_or_skip(bytes: &[u8], offset: usize, options: &ScanOptions) -> Option<SpriteBlock> {
    match probe(bytes, offset, options) {
        Ok(block) => block,
        Err(TamaError::TruncatedBlock {
            offset,
            size,
            available,
        }) => {
            log::debug!("skipping truncated block at {offset:#X} ({size} > {available})");
            None
        }
        Err(err) => {
            log::debug!("probe at {offset:#X} failed: {err}");
            None
        }
    }
}

/// Scans the offsets in `start..end`. Blocks may extend past `end`.
fn scan_range(bytes: &[u8], start: usize, end: usize, options: &ScanOptions) -> Vec<SpriteBlock> {
    let mut blocks = vec![];
    let mut cursor = start;

    while cursor < end {
        match probe_or_skip(bytes, cursor, options) {
            Some(block) => {
                cursor = block.end();
                blocks.push(block);
            }
            None => cursor += 1,
        }
    }

    blocks
}

/// True when a serial scan of the partition could have stopped at `cursor`,
/// i.e. `cursor` is not strictly inside one of its blocks.
fn on_partition_path(found: &[SpriteBlock], cursor: usize) -> bool {
    let before = found.partition_point(|block| block.offset() < cursor);

    before == 0 || found[before - 1].end() <= cursor
}

fn scan_partitioned(bytes: &[u8], options: &ScanOptions) -> Vec<SpriteBlock> {
    let partition_size = options.partition_size.max(1);
    let partitions = (0..bytes.len())
        .step_by(partition_size)
        .map(|start| (start, (start + partition_size).min(bytes.len())))
        .collect::<Vec<(usize, usize)>>();

    let found = partitions
        .par_iter()
        .map(|&(start, end)| scan_range(bytes, start, end, options))
        .collect::<Vec<Vec<SpriteBlock>>>();

    let mut blocks = vec![];
    let mut cursor = 0;

    for ((_, end), found) in partitions.into_iter().zip(found) {
        // a block from an earlier partition can push the cursor past this
        // partition's own starting point, so walk serially until both agree
        while cursor < end {
            if on_partition_path(&found, cursor) {
                let from = cursor;
                let rest = found.into_iter().skip_while(|block| block.offset() < from);

                for block in rest {
                    cursor = block.end();
                    blocks.push(block);
                }

                break;
            }

            log::debug!("re-probing {cursor:#X} at partition boundary");

            match probe_or_skip(bytes, cursor, options) {
                Some(block) => {
                    cursor = block.end();
                    blocks.push(block);
                }
                None => cursor += 1,
            }
        }

        cursor = cursor.max(end);
    }

    blocks
}

/// Finds every sprite block in `bytes`.
pub fn scan(bytes: &[u8], options: &ScanOptions) -> FirmwareMap {
    let blocks = if options.parallel && bytes.len() > options.partition_size {
        scan_partitioned(bytes, options)
    } else {
        scan_range(bytes, 0, bytes.len(), options)
    };

    log::info!(
        "found {} sprite blocks in {} bytes",
        blocks.len(),
        bytes.len()
    );

    FirmwareMap::new(blocks)
}

#[cfg(test)]
mod test {
    use byte_writer::ByteWriter;

    use super::*;
    use crate::{types::SpriteHeader, writer::write_block};

    fn block_bytes(width: u8, height: u8, color_count: u8, fill: u8) -> Vec<u8> {
        let header = SpriteHeader {
            width,
            height,
            color_count,
        };
        let palette = vec![0x12; header.palette_len()];
        let pixels = vec![fill; header.data_len()];

        write_block(&header, &palette, &pixels)
    }

    /// Gaps are filled with 0xEE, which never completes a header.
    fn firmware(layout: &[(usize, Vec<u8>)], len: usize) -> Vec<u8> {
        let mut writer = ByteWriter::new();

        for (offset, block) in layout {
            writer.pad_to(*offset, 0xEE);
            writer.append_u8_slice(block);
        }

        writer.pad_to(len, 0xEE);
        writer.data
    }

    fn assert_non_overlapping(map: &FirmwareMap) {
        for pair in map.blocks().windows(2) {
            assert!(pair[0].end() <= pair[1].offset());
        }
    }

    #[test]
    fn block_at_offset_100() {
        let block = block_bytes(4, 2, 4, 0x10);
        assert_eq!(block.len(), 18);

        let bytes = firmware(&[(100, block)], 200);
        let map = scan(&bytes, &ScanOptions::default());

        assert_eq!(map.len(), 1);

        let block = &map.blocks()[0];
        assert_eq!(block.offset(), 100);
        assert_eq!(block.size(), 6 + 8 + 4);
        assert_eq!(block.data_start(), 114);
    }

    #[test]
    fn several_blocks_in_order() {
        let bytes = firmware(
            &[
                (3, block_bytes(4, 2, 4, 0x10)),
                (40, block_bytes(3, 3, 20, 0x01)),
                (120, block_bytes(1, 1, 1, 0x00)),
            ],
            160,
        );

        let map = scan(&bytes, &ScanOptions::default());
        let offsets = map.iter().map(|block| block.offset()).collect::<Vec<_>>();

        assert_eq!(offsets, vec![3, 40, 120]);
        assert_eq!(map.blocks()[1].data_len(), 9);
        assert_non_overlapping(&map);
    }

    #[test]
    fn header_hidden_inside_block_is_skipped() {
        // the pixel data of the outer block contains a complete inner block
        let inner = block_bytes(1, 1, 1, 0x00);
        let header = SpriteHeader {
            width: 64,
            height: 1,
            color_count: 200,
        };
        let mut pixels = vec![0u8; header.data_len()];
        pixels[10..10 + inner.len()].copy_from_slice(&inner);
        let outer = write_block(&header, &vec![0; header.palette_len()], &pixels);

        let bytes = firmware(&[(0, outer)], 600);
        let map = scan(&bytes, &ScanOptions::default());

        assert_eq!(map.len(), 1);
        assert_eq!(map.blocks()[0].offset(), 0);
    }

    #[test]
    fn truncated_candidate_does_not_stop_scan() {
        let mut bytes = firmware(&[(10, block_bytes(4, 2, 4, 0x10))], 40);
        // claims 200 colors near the end of the buffer
        bytes.extend([8, 8, 200, 0, 1, 255, 0, 0, 0, 0, 0, 0]);

        let map = scan(&bytes, &ScanOptions::default());

        assert_eq!(map.len(), 1);
        assert_eq!(map.blocks()[0].offset(), 10);
    }

    #[test]
    fn empty_and_tiny_buffers() {
        assert!(scan(&[], &ScanOptions::default()).is_empty());
        assert!(scan(&[4, 2, 4, 0, 1, 255], &ScanOptions::default()).is_empty());
    }

    #[test]
    fn parallel_matches_serial() {
        let layout = (0..40)
            .map(|i| {
                let width = (i % 7 + 1) as u8;
                let colors = if i % 3 == 0 { 40 } else { 9 };
                (i * 37 + (i % 5), block_bytes(width, 3, colors, 0x11))
            })
            .collect::<Vec<_>>();

        // blocks are packed so that many straddle partition edges
        let mut writer = ByteWriter::new();
        for (gap, block) in &layout {
            writer.append_u8_slice(&vec![0xEE; gap % 11]);
            writer.append_u8_slice(block);
        }
        let bytes = writer.data;

        let serial = scan(&bytes, &ScanOptions::default());
        assert_non_overlapping(&serial);
        assert_eq!(serial.len(), layout.len());

        for partition_size in [1, 7, 16, 33, 64, 500] {
            let options = ScanOptions {
                parallel: true,
                partition_size,
                ..Default::default()
            };

            assert_eq!(scan(&bytes, &options), serial, "partition {partition_size}");
        }
    }

    #[test]
    fn parallel_keeps_greedy_choice_over_nested_header() {
        let inner = block_bytes(1, 1, 1, 0x00);
        let header = SpriteHeader {
            width: 64,
            height: 1,
            color_count: 200,
        };
        let mut pixels = vec![0u8; header.data_len()];
        pixels[20..20 + inner.len()].copy_from_slice(&inner);
        let outer = write_block(&header, &vec![0; header.palette_len()], &pixels);
        let bytes = firmware(&[(5, outer)], 700);

        let options = ScanOptions {
            parallel: true,
            partition_size: 128,
            ..Default::default()
        };

        // the nested header is found by a partition that starts inside the
        // outer block and must be dropped when merging
        let map = scan(&bytes, &options);

        assert_eq!(map, scan(&bytes, &ScanOptions::default()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn parallel_reprobes_when_cursor_lands_inside_partition_block() {
        let header = SpriteHeader {
            width: 64,
            height: 1,
            color_count: 200,
        };
        let mut pixels = vec![0u8; header.data_len()];
        // a fake 1x1 header whose span crosses the end of the outer block
        pixels[60..64].copy_from_slice(&[1, 1, 1, 0]);
        let outer = write_block(&header, &vec![0; header.palette_len()], &pixels);
        assert_eq!(outer.len(), 470);

        let mut writer = ByteWriter::new();
        writer.pad_to(5, 0xEE);
        writer.append_u8_slice(&outer);
        writer.append_u8_slice(&[1, 255, 0x12, 0x12, 0x00]);
        writer.pad_to(700, 0xEE);
        let bytes = writer.data;

        let serial = scan(&bytes, &ScanOptions::default());
        assert_eq!(serial.len(), 1);

        let options = ScanOptions {
            parallel: true,
            partition_size: 128,
            ..Default::default()
        };

        assert_eq!(scan(&bytes, &options), serial);
    }

    /// xorshift, so failures reproduce.
    struct Rng(u64);

    impl Rng {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: usize) -> usize {
            (self.next() % n as u64) as usize
        }
    }

    /// Noise with many header magics dropped in, so candidates nest, overlap
    /// and run off the end.
    fn noisy_buffer(rng: &mut Rng) -> Vec<u8> {
        let len = rng.below(3000) + 1;
        let mut bytes = (0..len).map(|_| rng.next() as u8).collect::<Vec<u8>>();

        for _ in 0..rng.below(len / 8 + 1) {
            let at = rng.below(len);

            if at + 6 <= len {
                bytes[at] = rng.below(12) as u8 + 1;
                bytes[at + 1] = rng.below(12) as u8 + 1;
                bytes[at + 2] = rng.below(40) as u8;
                bytes[at + 3..at + 6].copy_from_slice(&[0, 1, 255]);
            }
        }

        bytes
    }

    #[test]
    fn parallel_matches_serial_on_noise() {
        let mut rng = Rng(0x9E37_79B9_7F4A_7C15);

        for round in 0..300 {
            let bytes = noisy_buffer(&mut rng);
            let serial = scan(&bytes, &ScanOptions::default());

            assert_non_overlapping(&serial);
            assert!(serial.iter().all(|block| block.end() <= bytes.len()));

            for partition_size in [1, 2, 3, 5, 17, 64, 257] {
                let options = ScanOptions {
                    parallel: true,
                    partition_size,
                    ..Default::default()
                };

                assert_eq!(
                    scan(&bytes, &options),
                    serial,
                    "round {round}, partition {partition_size}"
                );
            }
        }
    }
}
