//! The flat file directory (§4.4): a fixed-capacity array of name -> file-id
//! entries plus the set of file-ids currently open.

use crate::ascii::{decode_decimal, encode_decimal};
use crate::device::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::FsError;
use crate::layout::{
    ADDR_WIDTH, DIR_ENTRIES_PER_BLOCK, DIR_ENTRY_SIZE, DIR_START_BLOCK, MAX_FILES,
};

const NAME_FIELD_LEN: usize = DIR_ENTRY_SIZE - ADDR_WIDTH;

#[derive(Clone)]
struct DirEntry {
    bytes: [u8; DIR_ENTRY_SIZE],
}

impl DirEntry {
    fn empty() -> Self {
        Self {
            bytes: [0u8; DIR_ENTRY_SIZE],
        }
    }

    fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    fn name_bytes(&self) -> &[u8] {
        let name_field = &self.bytes[..NAME_FIELD_LEN];
        let len = name_field.iter().position(|&b| b == 0).unwrap_or(name_field.len());
        &name_field[..len]
    }

    fn file_id(&self) -> usize {
        decode_decimal(&self.bytes[NAME_FIELD_LEN..]) as usize
    }

    fn occupy(name: &[u8], id: usize) -> Self {
        let mut entry = Self::empty();
        entry.bytes[..name.len()].copy_from_slice(name);
        encode_decimal(id as u32, &mut entry.bytes[NAME_FIELD_LEN..]);
        entry
    }
}

/// In-memory mirror of the directory region plus the open-file set.
pub struct Directory {
    entries: heapless::Vec<DirEntry, MAX_FILES>,
    opened_files: heapless::Vec<usize, MAX_FILES>,
}

impl Directory {
    pub fn load<D: BlockDevice>(device: &D) -> Result<Self, FsError> {
        let mut entries = heapless::Vec::new();
        let mut block: Block = [0u8; BLOCK_SIZE];
        for block_no in 0..crate::layout::DIR_BLOCK_COUNT {
            device
                .read(DIR_START_BLOCK + block_no, &mut block)
                .map_err(FsError::io)?;
            for slot in 0..DIR_ENTRIES_PER_BLOCK {
                let start = slot * DIR_ENTRY_SIZE;
                let mut bytes = [0u8; DIR_ENTRY_SIZE];
                bytes.copy_from_slice(&block[start..start + DIR_ENTRY_SIZE]);
                entries
                    .push(DirEntry { bytes })
                    .unwrap_or_else(|_| unreachable!("DIR_BLOCK_COUNT matches MAX_FILES"));
            }
        }
        Ok(Self {
            entries,
            opened_files: heapless::Vec::new(),
        })
    }

    /// Linear scan, strict equality of the name portion.
    pub fn lookup(&self, name: &[u8]) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.is_empty() && e.name_bytes() == name)
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_empty()).count()
    }

    /// Every occupied slot as `(file_id, name)`, in slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_empty())
            .map(|(id, e)| (id, e.name_bytes()))
    }

    /// Validates `name`, claims the first empty slot, writes the entry and
    /// flushes its containing block. Does not touch the metadata region --
    /// callers (the FS facade) are responsible for creating the matching
    /// metadata record in the same slot.
    pub fn add<D: BlockDevice>(&mut self, device: &mut D, name: &[u8]) -> Result<usize, FsError> {
        if name.is_empty() || name.len() > NAME_FIELD_LEN - 1 {
            return Err(FsError::IllegalFilename);
        }
        let id = self
            .entries
            .iter()
            .position(|e| e.is_empty())
            .ok_or(FsError::OutOfSpace)?;

        self.entries[id] = DirEntry::occupy(name, id);
        self.flush_block_containing(device, id)?;
        Ok(id)
    }

    /// Zeroes the slot and flushes its containing block. Callers are
    /// responsible for destroying the matching metadata record and for
    /// rejecting deletion of an open file before calling this.
    pub fn remove<D: BlockDevice>(&mut self, device: &mut D, id: usize) -> Result<(), FsError> {
        self.entries[id] = DirEntry::empty();
        self.flush_block_containing(device, id)
    }

    pub fn mark_open(&mut self, id: usize) {
        if !self.opened_files.contains(&id) {
            let _ = self.opened_files.push(id);
        }
    }

    pub fn mark_closed(&mut self, id: usize) {
        if let Some(pos) = self.opened_files.iter().position(|&x| x == id) {
            self.opened_files.swap_remove(pos);
        }
    }

    pub fn is_open(&self, id: usize) -> bool {
        self.opened_files.contains(&id)
    }

    fn flush_block_containing<D: BlockDevice>(
        &self,
        device: &mut D,
        id: usize,
    ) -> Result<(), FsError> {
        let block_no = id / DIR_ENTRIES_PER_BLOCK;
        let first_in_block = block_no * DIR_ENTRIES_PER_BLOCK;
        let mut block: Block = [0u8; BLOCK_SIZE];
        for i in 0..DIR_ENTRIES_PER_BLOCK {
            let start = i * DIR_ENTRY_SIZE;
            block[start..start + DIR_ENTRY_SIZE]
                .copy_from_slice(&self.entries[first_in_block + i].bytes);
        }
        device
            .write(DIR_START_BLOCK + block_no, &block)
            .map_err(FsError::io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDisk;

    #[test]
    fn add_then_lookup_finds_the_same_id() {
        let mut device = MemoryDisk::new();
        let mut dir = Directory::load(&device).unwrap();
        let id = dir.add(&mut device, b"hello.txt").unwrap();
        assert_eq!(dir.lookup(b"hello.txt"), Some(id));
        assert_eq!(dir.lookup(b"missing"), None);
    }

    #[test]
    fn rejects_empty_and_overlong_names() {
        let mut device = MemoryDisk::new();
        let mut dir = Directory::load(&device).unwrap();
        assert_eq!(dir.add(&mut device, b""), Err(FsError::IllegalFilename));
        let long = vec![b'a'; NAME_FIELD_LEN];
        assert_eq!(dir.add(&mut device, &long), Err(FsError::IllegalFilename));
    }

    #[test]
    fn open_set_has_no_duplicates() {
        let mut device = MemoryDisk::new();
        let mut dir = Directory::load(&device).unwrap();
        let id = dir.add(&mut device, b"a").unwrap();
        dir.mark_open(id);
        dir.mark_open(id);
        assert!(dir.is_open(id));
        dir.mark_closed(id);
        assert!(!dir.is_open(id));
    }

    #[test]
    fn remove_frees_the_slot_for_reuse() {
        let mut device = MemoryDisk::new();
        let mut dir = Directory::load(&device).unwrap();
        let id = dir.add(&mut device, b"a").unwrap();
        dir.remove(&mut device, id).unwrap();
        assert_eq!(dir.lookup(b"a"), None);
        assert_eq!(dir.add(&mut device, b"b").unwrap(), id);
    }
}
