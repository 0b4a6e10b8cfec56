//! The block device contract (§4.1): a fixed-capacity array of fixed-size
//! blocks with synchronous whole-block reads and writes.
//!
//! This is an external collaborator per the specification -- the filesystem
//! never assumes anything about the medium behind it. Two reference
//! implementations are provided for tests and the demo CLI: [`MemoryDisk`],
//! a pure in-process array, and [`FileBackedDisk`], which persists the same
//! layout to a host file so state survives a drop/reopen.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const BLOCK_SIZE: usize = 512;
pub const TOTAL_BLOCKS: usize = 5000;

/// A single fixed-size block.
pub type Block = [u8; BLOCK_SIZE];

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("block index {0} is out of range (device has {1} blocks)")]
    OutOfRange(usize, usize),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Read/write fixed-size blocks by index on a fixed-capacity backing store.
///
/// Reads and writes are synchronous and atomic at block granularity; the
/// filesystem never issues a partial-block device read or write.
pub trait BlockDevice {
    /// Zero-fill every block. Called once, by the medium's owner, before
    /// first use -- not by the filesystem itself.
    fn init(&mut self) -> Result<(), DeviceError>;

    /// Total number of addressable blocks (`N`).
    fn size(&self) -> usize;

    fn read(&self, index: usize, buf: &mut Block) -> Result<(), DeviceError>;
    fn write(&mut self, index: usize, buf: &Block) -> Result<(), DeviceError>;
}

fn check_range(index: usize, size: usize) -> Result<(), DeviceError> {
    if index >= size {
        Err(DeviceError::OutOfRange(index, size))
    } else {
        Ok(())
    }
}

/// An in-memory [`BlockDevice`]. The filesystem's own test suite and the
/// teacher's `softwaredisk.c` analogue: no persistence, just a flat array.
pub struct MemoryDisk {
    blocks: Box<[Block]>,
}

impl MemoryDisk {
    pub fn new() -> Self {
        let mut disk = Self {
            blocks: vec![[0u8; BLOCK_SIZE]; TOTAL_BLOCKS].into_boxed_slice(),
        };
        disk.init().expect("zero-fill never fails");
        disk
    }
}

impl Default for MemoryDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for MemoryDisk {
    fn init(&mut self) -> Result<(), DeviceError> {
        for block in self.blocks.iter_mut() {
            block.fill(0);
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.blocks.len()
    }

    fn read(&self, index: usize, buf: &mut Block) -> Result<(), DeviceError> {
        check_range(index, self.blocks.len())?;
        buf.copy_from_slice(&self.blocks[index]);
        Ok(())
    }

    fn write(&mut self, index: usize, buf: &Block) -> Result<(), DeviceError> {
        check_range(index, self.blocks.len())?;
        self.blocks[index].copy_from_slice(buf);
        Ok(())
    }
}

/// A [`BlockDevice`] backed by a host file, laid out as `TOTAL_BLOCKS`
/// contiguous `BLOCK_SIZE`-byte records. Used by the demo CLI so a disk
/// image can be created, written to across process invocations, and
/// inspected like the original's on-disk software disk file.
pub struct FileBackedDisk {
    file: File,
}

impl FileBackedDisk {
    /// Opens an existing disk image without touching its contents.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Creates a new disk image of `TOTAL_BLOCKS` zero-filled blocks.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut disk = Self { file };
        disk.init()?;
        Ok(disk)
    }

    fn seek_to(&mut self, index: usize) -> Result<(), DeviceError> {
        self.file
            .seek(SeekFrom::Start((index * BLOCK_SIZE) as u64))?;
        Ok(())
    }
}

impl BlockDevice for FileBackedDisk {
    fn init(&mut self) -> Result<(), DeviceError> {
        let zero = [0u8; BLOCK_SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        for _ in 0..TOTAL_BLOCKS {
            self.file.write_all(&zero)?;
        }
        self.file.flush()?;
        Ok(())
    }

    fn size(&self) -> usize {
        TOTAL_BLOCKS
    }

    fn read(&self, index: usize, buf: &mut Block) -> Result<(), DeviceError> {
        check_range(index, TOTAL_BLOCKS)?;
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start((index * BLOCK_SIZE) as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, index: usize, buf: &Block) -> Result<(), DeviceError> {
        check_range(index, TOTAL_BLOCKS)?;
        self.seek_to(index)?;
        self.file.write_all(buf)?;
        Ok(())
    }
}
