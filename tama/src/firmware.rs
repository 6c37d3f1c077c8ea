use std::{ffi::OsStr, path::Path};

use crate::{
    error::TamaError,
    parser::read_block_at,
    patch::{patch_batch, quantize_and_patch, raw_patch, BatchOutcome, PatchJob},
    scanner::{scan, ScanOptions},
    types::{BlockInfo, FirmwareMap, SpriteBlock},
};

/// A loaded firmware image together with the blocks found in it.
///
/// The buffer is never modified. Patching returns new bytes, which can be
/// loaded again with [`Firmware::replace`].
#[derive(Debug, Clone)]
pub struct Firmware {
    bytes: Vec<u8>,
    map: FirmwareMap,
    options: ScanOptions,
}

impl Firmware {
    pub fn new(bytes: Vec<u8>, options: ScanOptions) -> Self {
        let map = scan(&bytes, &options);

        Self {
            bytes,
            map,
            options,
        }
    }

    pub fn open_from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec(), ScanOptions::default())
    }

    pub fn open_from_file(
        path: impl AsRef<OsStr> + AsRef<Path>,
        options: ScanOptions,
    ) -> Result<Self, TamaError> {
        let bytes = std::fs::read(path)?;

        Ok(Self::new(bytes, options))
    }

    /// Swaps in a new buffer and rescans it from scratch.
    pub fn replace(&mut self, bytes: Vec<u8>) {
        self.map = scan(&bytes, &self.options);
        self.bytes = bytes;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn map(&self) -> &FirmwareMap {
        &self.map
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn list_blocks(&self) -> Vec<BlockInfo> {
        self.map.infos()
    }

    /// Looks the offset up in the map, falling back to a direct read so that
    /// a block hidden by the greedy scan can still be addressed.
    pub fn block_at(&self, offset: usize) -> Result<SpriteBlock, TamaError> {
        match self.map.get(offset) {
            Some(block) => Ok(block.clone()),
            None => read_block_at(&self.bytes, offset, &self.options),
        }
    }

    pub fn raw_patch(&self, block: &SpriteBlock, index_bytes: &[u8]) -> Result<Vec<u8>, TamaError> {
        raw_patch(&self.bytes, block, index_bytes)
    }

    pub fn quantize_and_patch(
        &self,
        block: &SpriteBlock,
        rgba: &[u8],
        dimensions: (u32, u32),
    ) -> Result<Vec<u8>, TamaError> {
        quantize_and_patch(&self.bytes, block, rgba, dimensions)
    }

    pub fn patch_batch(&self, jobs: &[PatchJob]) -> BatchOutcome {
        patch_batch(&self.bytes, &self.map, jobs)
    }
}
