//! The core algorithm (§4.5): translates byte ranges on a single file into
//! block I/O via the direct/indirect index, extending the file on write or
//! seek. Free functions rather than methods on a type, since every call
//! needs simultaneous `&mut` access to the device, the bitmap and the
//! file's own metadata record -- bundling those into one receiver would
//! just be the `FileSystem` facade itself one layer early.

use crate::ascii::{decode_decimal, encode_decimal, pointer_fields, pointer_fields_mut};
use crate::bitmap::Bitmap;
use crate::device::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::FsError;
use crate::layout::{DIRECT_POINTERS, MAX_FILE_SIZE};
use crate::metadata::MetaRecord;

/// Resolves a logical block number to its physical block, through the
/// indirect block when `logical_block >= DIRECT_POINTERS`. Exposed to the
/// facade so `delete_file` can walk a record's pointers without
/// duplicating the direct/indirect resolution rule.
pub(crate) fn physical_block_for<D: BlockDevice>(
    device: &D,
    record: &MetaRecord,
    logical_block: usize,
) -> Result<u32, FsError> {
    if logical_block < DIRECT_POINTERS {
        return Ok(record.direct(logical_block));
    }
    let mut indirect: Block = [0u8; BLOCK_SIZE];
    device
        .read(record.indirect() as usize, &mut indirect)
        .map_err(FsError::io)?;
    let idx = logical_block - DIRECT_POINTERS;
    Ok(decode_decimal(&pointer_fields(&indirect)[idx]))
}

/// Reading never allocates and never mutates metadata.
pub fn read<D: BlockDevice>(
    device: &D,
    record: &MetaRecord,
    position: usize,
    buf: &mut [u8],
) -> Result<usize, FsError> {
    let size = record.size() as usize;
    if position >= size {
        return Ok(0);
    }
    let to_read = buf.len().min(size - position);
    if to_read == 0 {
        return Ok(0);
    }

    let first_lb = position / BLOCK_SIZE;
    let last_lb = (position + to_read - 1) / BLOCK_SIZE;
    let mut delivered = 0;
    let mut block: Block = [0u8; BLOCK_SIZE];

    for lb in first_lb..=last_lb {
        let phys = physical_block_for(device, record, lb)?;
        device.read(phys as usize, &mut block).map_err(FsError::io)?;

        let block_start = lb * BLOCK_SIZE;
        let start = if lb == first_lb { position - block_start } else { 0 };
        let end = if lb == last_lb {
            position + to_read - block_start
        } else {
            BLOCK_SIZE
        };
        let n = end - start;
        buf[delivered..delivered + n].copy_from_slice(&block[start..end]);
        delivered += n;
    }

    Ok(delivered)
}

pub struct WriteOutcome {
    pub bytes_written: usize,
    /// `ExceedsMaxFileSize` if the request was clamped to the file size
    /// ceiling, or `OutOfSpace` if allocation ran out mid-write. Either way
    /// `bytes_written` already reflects the clamp.
    pub soft_error: Option<FsError>,
}

/// Grows the file's direct/indirect pointers so every logical block in
/// `first_lb..=last_lb` is backed, starting from the file's current
/// `block_count`. Stops and reports `OutOfSpace` the moment an allocation
/// fails; already-acquired blocks are kept.
fn grow_to_cover<D: BlockDevice>(
    device: &mut D,
    bitmap: &mut Bitmap,
    record: &mut MetaRecord,
    last_lb: usize,
) -> Result<Option<FsError>, FsError> {
    let mut indirect_buf: Option<Block> = None;

    let target_blocks = last_lb + 1;
    while (record.block_count() as usize) < target_blocks {
        let lb = record.block_count() as usize;

        if lb >= DIRECT_POINTERS && record.indirect() == 0 {
            match bitmap.alloc(device) {
                Ok(blk) => {
                    record.set_indirect(blk as u32);
                    indirect_buf = Some([0u8; BLOCK_SIZE]);
                }
                Err(e) => return Ok(Some(e)),
            }
        }

        let blk = match bitmap.alloc(device) {
            Ok(blk) => blk,
            Err(e) => return flush_indirect(device, record, indirect_buf).map(|_| Some(e)),
        };

        if lb < DIRECT_POINTERS {
            record.set_direct(lb, blk as u32);
        } else {
            if indirect_buf.is_none() {
                let mut buf = [0u8; BLOCK_SIZE];
                device
                    .read(record.indirect() as usize, &mut buf)
                    .map_err(FsError::io)?;
                indirect_buf = Some(buf);
            }
            let idx = lb - DIRECT_POINTERS;
            let buf = indirect_buf.as_mut().expect("just populated");
            encode_decimal(blk as u32, &mut pointer_fields_mut(buf)[idx]);
        }
        record.set_block_count(record.block_count() + 1);
    }

    flush_indirect(device, record, indirect_buf).map(|_| None)
}

fn flush_indirect<D: BlockDevice>(
    device: &mut D,
    record: &MetaRecord,
    indirect_buf: Option<Block>,
) -> Result<(), FsError> {
    if let Some(buf) = indirect_buf {
        device
            .write(record.indirect() as usize, &buf)
            .map_err(FsError::io)?;
    }
    Ok(())
}

/// Write `buf` at `position`. `mode_is_read_write` must already have been
/// checked by the caller -- this function has no concept of access mode.
pub fn write<D: BlockDevice>(
    device: &mut D,
    bitmap: &mut Bitmap,
    record: &mut MetaRecord,
    position: usize,
    buf: &[u8],
) -> Result<WriteOutcome, FsError> {
    if position >= MAX_FILE_SIZE {
        return Ok(WriteOutcome {
            bytes_written: 0,
            soft_error: Some(FsError::ExceedsMaxFileSize),
        });
    }

    let mut bytes_to_write = buf.len();
    let mut soft_error = None;
    if position + bytes_to_write > MAX_FILE_SIZE {
        bytes_to_write = MAX_FILE_SIZE - position;
        soft_error = Some(FsError::ExceedsMaxFileSize);
    }
    if bytes_to_write == 0 {
        return Ok(WriteOutcome {
            bytes_written: 0,
            soft_error,
        });
    }

    let first_lb = position / BLOCK_SIZE;
    let mut last_lb = (position + bytes_to_write - 1) / BLOCK_SIZE;

    if let Some(alloc_err) = grow_to_cover(device, bitmap, record, last_lb)? {
        soft_error = Some(alloc_err);
        let reachable = record.block_count() as usize * BLOCK_SIZE;
        bytes_to_write = reachable.saturating_sub(position);
        if bytes_to_write == 0 {
            return Ok(WriteOutcome {
                bytes_written: 0,
                soft_error,
            });
        }
        last_lb = (position + bytes_to_write - 1) / BLOCK_SIZE;
    }

    let mut written = 0;
    for lb in first_lb..=last_lb {
        let phys = physical_block_for(device, record, lb)?;
        let block_start = lb * BLOCK_SIZE;
        let start = if lb == first_lb { position - block_start } else { 0 };
        let end = if lb == last_lb {
            position + bytes_to_write - block_start
        } else {
            BLOCK_SIZE
        };
        let n = end - start;

        let mut block: Block = [0u8; BLOCK_SIZE];
        if start == 0 && end == BLOCK_SIZE {
            block.copy_from_slice(&buf[written..written + n]);
        } else {
            device.read(phys as usize, &mut block).map_err(FsError::io)?;
            block[start..end].copy_from_slice(&buf[written..written + n]);
        }
        device.write(phys as usize, &block).map_err(FsError::io)?;
        written += n;
    }

    record.set_size(record.size().max((position + bytes_to_write) as u32));
    log::debug!(
        "file_io: wrote {written} bytes at offset {position}, size now {}",
        record.size()
    );

    Ok(WriteOutcome {
        bytes_written: bytes_to_write,
        soft_error,
    })
}

pub struct SeekOutcome {
    /// Position the handle should end up at -- *not* necessarily the
    /// requested target. An extending seek lands at `new_size - 1` per the
    /// specification's documented (if surprising) contract.
    pub position: usize,
    /// Set only when the file *was* extended but ran out of space partway;
    /// the handle and record still moved, just not as far as requested.
    pub error: Option<FsError>,
}

/// Seeks to `target`. When `target` is within the current file size this
/// is a pure position update; past it, the file is extended with
/// zero-filled blocks using the same allocation rule as `write`.
///
/// A `target` at or beyond the maximum file size is rejected outright --
/// `Err(ExceedsMaxFileSize)` -- without touching the record or the
/// caller's handle position, since nothing was attempted. Contrast this
/// with running out of space partway through an extension below, which
/// *did* mutate state and so is reported as a soft error alongside the
/// new (partial) position.
pub fn seek<D: BlockDevice>(
    device: &mut D,
    bitmap: &mut Bitmap,
    record: &mut MetaRecord,
    target: usize,
) -> Result<SeekOutcome, FsError> {
    if target >= MAX_FILE_SIZE {
        return Err(FsError::ExceedsMaxFileSize);
    }

    let size = record.size() as usize;
    if target <= size {
        return Ok(SeekOutcome {
            position: target,
            error: None,
        });
    }

    let needed_blocks = (target + 1).div_ceil(BLOCK_SIZE);
    if let Some(err) = grow_to_cover(device, bitmap, record, needed_blocks.saturating_sub(1))? {
        let size = record.block_count() as usize * BLOCK_SIZE;
        record.set_size(size as u32);
        log::debug!("file_io: seek-extend ran out of space at byte {size}");
        return Ok(SeekOutcome {
            position: size.saturating_sub(1),
            error: Some(err),
        });
    }

    record.set_size((target + 1) as u32);
    Ok(SeekOutcome {
        position: target,
        error: None,
    })
}
