//! Free-space bitmap (§4.2). One bit per data block, 1 = free, bit 0 of
//! each byte is the most-significant bit (MSB-first numbering, per §3).
//!
//! `BitCursor` below is adapted from the teacher's
//! `crypto::iterators::BitIterator`, which scans LSB-first; this crate's bit
//! ordering requirement runs the other way, so the shift direction is
//! reversed rather than reusing that type unmodified.

use crate::device::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::FsError;
use crate::layout::{BITMAP_BLOCK_COUNT, BITMAP_BYTES, BITMAP_START_BLOCK, DATA_BLOCK_COUNT, DATA_START_BLOCK};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Bit {
    Zero,
    One,
}

/// Walks a byte slice MSB-first: bit 0 of byte 0 is `0x80`, bit 7 of byte 0
/// is `0x01`, bit 8 is `0x80` of byte 1, and so on.
struct BitCursor<'a> {
    bytes: &'a [u8],
    ordinal: usize,
}

impl<'a> BitCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, ordinal: 0 }
    }
}

impl<'a> Iterator for BitCursor<'a> {
    type Item = Bit;

    fn next(&mut self) -> Option<Bit> {
        let byte_idx = self.ordinal / 8;
        if byte_idx >= self.bytes.len() {
            return None;
        }
        let bit_idx = self.ordinal % 8;
        let mask = 0x80u8 >> bit_idx;
        self.ordinal += 1;
        Some(if self.bytes[byte_idx] & mask != 0 {
            Bit::One
        } else {
            Bit::Zero
        })
    }
}

fn set_bit(bytes: &mut [u8], ordinal: usize, value: Bit) {
    let byte_idx = ordinal / 8;
    let bit_idx = ordinal % 8;
    let mask = 0x80u8 >> bit_idx;
    match value {
        Bit::One => bytes[byte_idx] |= mask,
        Bit::Zero => bytes[byte_idx] &= !mask,
    }
}

/// In-memory mirror of the bitmap region, flushed back to the device on
/// every allocation and release.
pub struct Bitmap {
    bytes: [u8; BITMAP_BYTES],
}

impl Bitmap {
    /// Loads the bitmap region from disk. When the filesystem has no files
    /// yet (`files_exist == false`) the bitmap is instead (re)initialized
    /// to all-free, mirroring a fresh `init_fs`.
    pub fn load<D: BlockDevice>(device: &D, files_exist: bool) -> Result<Self, FsError> {
        let mut bitmap = Self {
            bytes: [0u8; BITMAP_BYTES],
        };
        if files_exist {
            bitmap.read_from(device)?;
        } else {
            bitmap.reset();
        }
        Ok(bitmap)
    }

    /// Sets every real data-block bit free and permanently marks the
    /// trailing padding bits (bits beyond `DATA_BLOCK_COUNT`, needed only to
    /// round the bitmap out to whole bytes/blocks) as used so `alloc` can
    /// never hand out an out-of-range block index.
    fn reset(&mut self) {
        self.bytes.fill(0xFF);
        for ordinal in DATA_BLOCK_COUNT..(BITMAP_BYTES * 8) {
            set_bit(&mut self.bytes, ordinal, Bit::Zero);
        }
    }

    fn read_from<D: BlockDevice>(&mut self, device: &D) -> Result<(), FsError> {
        let mut block = [0u8; BLOCK_SIZE];
        for i in 0..BITMAP_BLOCK_COUNT {
            device
                .read(BITMAP_START_BLOCK + i, &mut block)
                .map_err(FsError::io)?;
            self.bytes[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE].copy_from_slice(&block);
        }
        Ok(())
    }

    /// Writes the bitmap region back to the device.
    pub fn flush<D: BlockDevice>(&self, device: &mut D) -> Result<(), FsError> {
        let mut block: Block = [0u8; BLOCK_SIZE];
        for i in 0..BITMAP_BLOCK_COUNT {
            block.copy_from_slice(&self.bytes[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE]);
            device
                .write(BITMAP_START_BLOCK + i, &block)
                .map_err(FsError::io)?;
        }
        Ok(())
    }

    /// Scans for the first free bit in MSB-first order and claims it.
    /// Allocation is first-fit by bit order; there is no defragmentation.
    /// The returned block is zero-filled on the device before this returns,
    /// so stale data from a previously deleted file never becomes
    /// observable through a seek-extend gap or a freshly allocated
    /// indirect block (Design Notes §9).
    pub fn alloc<D: BlockDevice>(&mut self, device: &mut D) -> Result<usize, FsError> {
        let ordinal = BitCursor::new(&self.bytes)
            .position(|bit| bit == Bit::One)
            .ok_or(FsError::OutOfSpace)?;

        let block_index = DATA_START_BLOCK + ordinal;
        if block_index >= crate::layout::TOTAL_BLOCKS {
            return Err(FsError::OutOfSpace);
        }

        device
            .write(block_index, &[0u8; BLOCK_SIZE])
            .map_err(FsError::io)?;
        set_bit(&mut self.bytes, ordinal, Bit::Zero);
        log::trace!("bitmap: allocated block {block_index}");
        Ok(block_index)
    }

    /// Marks `block_index` free again. Out-of-range indices are ignored,
    /// matching the spec's "ignored" contract for `release`.
    pub fn release(&mut self, block_index: usize) {
        if block_index < DATA_START_BLOCK {
            return;
        }
        let ordinal = block_index - DATA_START_BLOCK;
        if ordinal >= DATA_BLOCK_COUNT {
            return;
        }
        set_bit(&mut self.bytes, ordinal, Bit::One);
        log::trace!("bitmap: released block {block_index}");
    }
}
