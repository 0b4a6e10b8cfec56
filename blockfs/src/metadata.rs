//! Per-file metadata records (§4.3): a fixed-capacity array of `F` 64-byte
//! records, each holding a file's size, block count, direct pointers and
//! one indirect pointer, packed as ASCII-decimal per §3.

use crate::ascii::{decode_decimal, encode_decimal};
use crate::device::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::FsError;
use crate::layout::{
    DIRECT_POINTERS, INDIRECT_POINTERS, MAX_FILES, META_BLOCKS_DIGITS, META_RECORDS_PER_BLOCK,
    META_RECORD_SIZE, META_SIZE_DIGITS, META_START_BLOCK,
};

const SIZE_FIELD: std::ops::Range<usize> = 0..META_SIZE_DIGITS;
const BLOCKS_FIELD: std::ops::Range<usize> = META_SIZE_DIGITS..META_SIZE_DIGITS + META_BLOCKS_DIGITS;
const POINTERS_START: usize = META_SIZE_DIGITS + META_BLOCKS_DIGITS;

fn pointer_field(k: usize) -> std::ops::Range<usize> {
    let start = POINTERS_START + k * crate::layout::ADDR_WIDTH;
    start..start + crate::layout::ADDR_WIDTH
}

/// One 64-byte metadata record. A record is active iff byte 0 is non-zero
/// (the first digit of a non-empty size field, or a deliberately reserved
/// non-NUL sentinel for a freshly created empty file -- see `create`).
#[derive(Clone)]
pub struct MetaRecord {
    bytes: [u8; META_RECORD_SIZE],
}

impl MetaRecord {
    fn empty() -> Self {
        Self {
            bytes: [0u8; META_RECORD_SIZE],
        }
    }

    pub fn is_active(&self) -> bool {
        self.bytes[0] != 0
    }

    pub fn size(&self) -> u32 {
        decode_decimal(&self.bytes[SIZE_FIELD])
    }

    pub fn set_size(&mut self, value: u32) {
        encode_decimal(value, &mut self.bytes[SIZE_FIELD]);
        // "0" must still mark the record active: store a leading zero digit
        // (ASCII '0' = 0x30) so byte 0 is never the NUL that means "empty".
        if value == 0 {
            self.bytes[0] = b'0';
        }
    }

    pub fn block_count(&self) -> u32 {
        decode_decimal(&self.bytes[BLOCKS_FIELD])
    }

    pub fn set_block_count(&mut self, value: u32) {
        encode_decimal(value, &mut self.bytes[BLOCKS_FIELD]);
    }

    /// Reads direct pointer `k` (`0 <= k < DIRECT_POINTERS`).
    pub fn direct(&self, k: usize) -> u32 {
        debug_assert!(k < DIRECT_POINTERS);
        decode_decimal(&self.bytes[pointer_field(k)])
    }

    pub fn set_direct(&mut self, k: usize, block: u32) {
        debug_assert!(k < DIRECT_POINTERS);
        encode_decimal(block, &mut self.bytes[pointer_field(k)]);
    }

    pub fn indirect(&self) -> u32 {
        decode_decimal(&self.bytes[pointer_field(DIRECT_POINTERS)])
    }

    pub fn set_indirect(&mut self, block: u32) {
        debug_assert!(INDIRECT_POINTERS == 1);
        encode_decimal(block, &mut self.bytes[pointer_field(DIRECT_POINTERS)]);
    }
}

/// In-memory mirror of the metadata region.
pub struct MetaTable {
    records: heapless::Vec<MetaRecord, MAX_FILES>,
}

impl MetaTable {
    /// Reads the full metadata region and recomputes the active count from
    /// scratch (byte 0 != 0), rather than trusting a separately maintained
    /// counter -- see DESIGN.md on the original's drifting size field.
    pub fn load<D: BlockDevice>(device: &D) -> Result<Self, FsError> {
        let mut records = heapless::Vec::new();
        let mut block: Block = [0u8; BLOCK_SIZE];
        for block_no in 0..crate::layout::META_BLOCK_COUNT {
            device
                .read(META_START_BLOCK + block_no, &mut block)
                .map_err(FsError::io)?;
            for slot in 0..META_RECORDS_PER_BLOCK {
                let start = slot * META_RECORD_SIZE;
                let mut bytes = [0u8; META_RECORD_SIZE];
                bytes.copy_from_slice(&block[start..start + META_RECORD_SIZE]);
                records
                    .push(MetaRecord { bytes })
                    .unwrap_or_else(|_| unreachable!("META_BLOCK_COUNT matches MAX_FILES"));
            }
        }
        Ok(Self { records })
    }

    pub fn read(&self, id: usize) -> &MetaRecord {
        &self.records[id]
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_active()).count()
    }

    /// Overwrites the in-memory record and flushes the one on-disk block
    /// that holds it.
    pub fn write<D: BlockDevice>(
        &mut self,
        device: &mut D,
        id: usize,
        record: MetaRecord,
    ) -> Result<(), FsError> {
        self.records[id] = record;
        self.flush_block_containing(device, id)
    }

    /// Requires the slot to currently be empty; initializes size=0,
    /// blocks=0 and persists it.
    pub fn create<D: BlockDevice>(&mut self, device: &mut D, id: usize) -> Result<(), FsError> {
        debug_assert!(!self.records[id].is_active());
        let mut record = MetaRecord::empty();
        record.set_size(0);
        record.set_block_count(0);
        self.write(device, id, record)
    }

    /// Zeroes the slot and persists it.
    pub fn destroy<D: BlockDevice>(&mut self, device: &mut D, id: usize) -> Result<(), FsError> {
        self.write(device, id, MetaRecord::empty())
    }

    fn flush_block_containing<D: BlockDevice>(
        &self,
        device: &mut D,
        id: usize,
    ) -> Result<(), FsError> {
        let block_no = id / META_RECORDS_PER_BLOCK;
        let slot = id % META_RECORDS_PER_BLOCK;
        let mut block: Block = [0u8; BLOCK_SIZE];
        let first_in_block = block_no * META_RECORDS_PER_BLOCK;
        for i in 0..META_RECORDS_PER_BLOCK {
            let start = i * META_RECORD_SIZE;
            block[start..start + META_RECORD_SIZE]
                .copy_from_slice(&self.records[first_in_block + i].bytes);
        }
        let _ = slot;
        device
            .write(META_START_BLOCK + block_no, &block)
            .map_err(FsError::io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDisk;

    #[test]
    fn fresh_record_is_active_with_zero_size_and_blocks() {
        let mut device = MemoryDisk::new();
        let mut table = MetaTable::load(&device).unwrap();
        table.create(&mut device, 5).unwrap();
        let record = table.read(5);
        assert!(record.is_active());
        assert_eq!(record.size(), 0);
        assert_eq!(record.block_count(), 0);
    }

    #[test]
    fn direct_and_indirect_pointers_round_trip() {
        let mut device = MemoryDisk::new();
        let mut table = MetaTable::load(&device).unwrap();
        table.create(&mut device, 0).unwrap();
        let mut record = table.read(0).clone();
        record.set_direct(11, 4321);
        record.set_indirect(777);
        table.write(&mut device, 0, record).unwrap();

        let record = table.read(0);
        assert_eq!(record.direct(11), 4321);
        assert_eq!(record.indirect(), 777);
    }

    #[test]
    fn destroy_clears_active_bit_and_persists() {
        let mut device = MemoryDisk::new();
        let mut table = MetaTable::load(&device).unwrap();
        table.create(&mut device, 3).unwrap();
        table.destroy(&mut device, 3).unwrap();
        assert!(!table.read(3).is_active());

        let reloaded = MetaTable::load(&device).unwrap();
        assert!(!reloaded.read(3).is_active());
    }

    #[test]
    fn active_count_is_recomputed_not_tracked() {
        let mut device = MemoryDisk::new();
        let mut table = MetaTable::load(&device).unwrap();
        table.create(&mut device, 0).unwrap();
        table.create(&mut device, 1).unwrap();
        assert_eq!(table.active_count(), 2);
        table.destroy(&mut device, 0).unwrap();
        assert_eq!(table.active_count(), 1);
    }
}
