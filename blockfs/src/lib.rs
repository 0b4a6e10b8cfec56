//! A small block-based filesystem over a single fixed-size backing store.
//!
//! A container is addressed as a flat array of 512-byte blocks, carved into
//! a directory region, a per-file metadata region, a free-space bitmap and
//! a data region. Files are flat (no subdirectories), addressed through 12
//! direct block pointers plus one indirect pointer, and every on-disk
//! integer field is ASCII-decimal rather than binary, matching the
//! original backing-store format bit-for-bit.
//!
//! ```no_run
//! use blockfs::{FileSystem, MemoryDisk};
//!
//! let device = MemoryDisk::new();
//! let mut fs = FileSystem::mount(device).unwrap();
//! let mut h = fs.create_file(b"hello.txt").unwrap();
//! fs.write_file(&mut h, b"hi");
//! fs.seek_file(&mut h, 0).unwrap();
//! let mut buf = [0u8; 2];
//! fs.read_file(&mut h, &mut buf);
//! assert_eq!(&buf, b"hi");
//! ```

mod ascii;
mod bitmap;
mod device;
mod directory;
mod error;
mod file_io;
mod fs;
mod handle;
mod layout;
mod metadata;

pub use device::{Block, BlockDevice, DeviceError, FileBackedDisk, MemoryDisk, BLOCK_SIZE};
pub use error::FsError;
pub use fs::FileSystem;
pub use handle::{FileHandle, OpenMode};
pub use layout::{MAX_DATA_BLOCKS_PER_FILE, MAX_FILES, MAX_FILE_SIZE, TOTAL_BLOCKS};
