//! Integration tests for the blockfs filesystem: end-to-end, multi-call
//! scenarios exercised against a mounted `FileSystem`, as opposed to the
//! single-module unit tests colocated with each component.

use blockfs::{FileSystem, FsError, MemoryDisk, OpenMode, MAX_FILE_SIZE};

fn mounted() -> FileSystem<MemoryDisk> {
    FileSystem::mount(MemoryDisk::new()).unwrap()
}

#[test]
fn scenario_create_write_seek_read_round_trip() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"a").unwrap();
    assert_eq!(fs.write_file(&mut h, b"hello"), 5);
    fs.seek_file(&mut h, 0).unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(fs.read_file(&mut h, &mut buf), 5);
    assert_eq!(&buf, b"hello");
    assert_eq!(fs.file_length(&h).unwrap(), 5);
}

#[test]
fn scenario_seek_past_eof_extends_and_allocates_two_blocks() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"b").unwrap();
    fs.seek_file(&mut h, 600).unwrap();
    assert_eq!(fs.file_length(&h).unwrap(), 601);
}

#[test]
fn scenario_crossing_direct_limit_bumps_block_count_by_two() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"c").unwrap();
    assert_eq!(fs.write_file(&mut h, &vec![b'X'; 6144]), 6144);
    assert_eq!(fs.file_length(&h).unwrap(), 6144);

    assert_eq!(fs.write_file(&mut h, b"Y"), 1);
    assert_eq!(fs.file_length(&h).unwrap(), 6145);
}

#[test]
fn scenario_write_beyond_max_file_size_clamps_and_reports() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"d").unwrap();
    let payload = vec![b'Z'; 72_000];
    assert_eq!(fs.write_file(&mut h, &payload), MAX_FILE_SIZE);
    assert_eq!(fs.last_error(), Some(FsError::ExceedsMaxFileSize));
}

#[test]
fn scenario_writing_one_more_byte_at_the_ceiling_then_failing() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"d2").unwrap();
    fs.seek_file(&mut h, MAX_FILE_SIZE - 1).unwrap();
    assert_eq!(fs.write_file(&mut h, b"X"), 1);
    assert_eq!(fs.last_error(), None);
    assert_eq!(fs.write_file(&mut h, b"Y"), 0);
    assert_eq!(fs.last_error(), Some(FsError::ExceedsMaxFileSize));
}

#[test]
fn scenario_seek_beyond_max_file_size_leaves_position_untouched() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"d3").unwrap();
    fs.write_file(&mut h, b"hello");
    fs.seek_file(&mut h, 3).unwrap();

    assert_eq!(
        fs.seek_file(&mut h, MAX_FILE_SIZE),
        Err(FsError::ExceedsMaxFileSize)
    );
    // The rejected seek must not have moved the handle off byte 3.
    let mut buf = [0u8; 2];
    assert_eq!(fs.read_file(&mut h, &mut buf), 2);
    assert_eq!(&buf, b"lo");
}

#[test]
fn scenario_read_only_handle_rejects_write_without_mutation() {
    let mut fs = mounted();
    let h = fs.create_file(b"e").unwrap();
    fs.close_file(h).unwrap();

    let mut h = fs.open_file(b"e", OpenMode::ReadOnly).unwrap();
    assert_eq!(fs.write_file(&mut h, b"nope"), 0);
    assert_eq!(fs.last_error(), Some(FsError::FileReadOnly));
    assert_eq!(fs.file_length(&h).unwrap(), 0);
}

#[test]
fn scenario_delete_closed_file_frees_its_blocks() {
    let mut fs = mounted();
    let h = fs.create_file(b"f").unwrap();
    fs.close_file(h).unwrap();
    fs.delete_file(b"f").unwrap();
    assert!(!fs.file_exists(b"f"));
}

#[test]
fn the_801st_file_reports_out_of_space() {
    let mut fs = mounted();
    for i in 0..blockfs::MAX_FILES {
        fs.create_file(i.to_string().as_bytes()).unwrap();
    }
    assert_eq!(
        fs.create_file(b"overflow"),
        Err(FsError::OutOfSpace)
    );
}

#[test]
fn deleting_an_open_file_is_rejected() {
    let mut fs = mounted();
    let _h = fs.create_file(b"g").unwrap();
    assert_eq!(fs.delete_file(b"g"), Err(FsError::FileOpen));
}

#[test]
fn opening_an_already_open_file_is_rejected() {
    let mut fs = mounted();
    let _h = fs.create_file(b"h").unwrap();
    assert_eq!(
        fs.open_file(b"h", OpenMode::ReadWrite),
        Err(FsError::FileOpen)
    );
}

#[test]
fn reading_a_not_open_handle_like_state_reports_file_not_open() {
    let mut fs = mounted();
    let h = fs.create_file(b"i").unwrap();
    fs.close_file(h).unwrap();

    let mut stale = h;
    let mut buf = [0u8; 4];
    assert_eq!(fs.read_file(&mut stale, &mut buf), 0);
    assert_eq!(fs.last_error(), Some(FsError::FileNotOpen));
}

#[test]
fn seeking_beyond_eof_then_reading_the_gap_yields_zero_bytes() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"j").unwrap();
    fs.write_file(&mut h, b"abc");
    fs.seek_file(&mut h, 1000).unwrap();
    fs.seek_file(&mut h, 3).unwrap();

    let mut buf = [0xAAu8; 997];
    let n = fs.read_file(&mut h, &mut buf);
    assert_eq!(n, 997);
    assert!(buf.iter().all(|&b| b == 0));
}

#[test]
fn a_fully_populated_file_uses_every_addressable_block() {
    let mut fs = mounted();
    let mut h = fs.create_file(b"k").unwrap();
    let payload = vec![b'Q'; MAX_FILE_SIZE];
    assert_eq!(fs.write_file(&mut h, &payload), MAX_FILE_SIZE);
    assert_eq!(fs.file_length(&h).unwrap(), MAX_FILE_SIZE);

    fs.seek_file(&mut h, 0).unwrap();
    let mut buf = vec![0u8; MAX_FILE_SIZE];
    assert_eq!(fs.read_file(&mut h, &mut buf), MAX_FILE_SIZE);
    assert!(buf.iter().all(|&b| b == b'Q'));
}

#[test]
fn exhausting_the_device_mid_write_returns_exactly_what_fit() {
    let mut fs = mounted();

    // Each full-size file burns 140 data blocks plus 1 indirect block.
    for i in 0..34 {
        let mut h = fs.create_file(format!("filler{i}").as_bytes()).unwrap();
        assert_eq!(fs.write_file(&mut h, &vec![b'F'; MAX_FILE_SIZE]), MAX_FILE_SIZE);
        fs.close_file(h).unwrap();
    }
    // 34 * 141 = 4794 of the 4798 data blocks are now used; burn 3 more to
    // leave exactly one free.
    let mut h = fs.create_file(b"almost-full").unwrap();
    assert_eq!(fs.write_file(&mut h, &vec![b'G'; 3 * 512]), 3 * 512);
    fs.close_file(h).unwrap();

    // One free data block remains. A write needing two blocks should land
    // exactly the bytes that fit in the one block it could still get.
    let mut h = fs.create_file(b"z").unwrap();
    let written = fs.write_file(&mut h, &vec![b'H'; 513]);
    assert_eq!(written, 512);
    assert_eq!(fs.last_error(), Some(FsError::OutOfSpace));
}

#[test]
fn active_directory_slots_match_active_metadata_records_after_mixed_use() {
    let mut fs = mounted();
    let h1 = fs.create_file(b"m1").unwrap();
    let h2 = fs.create_file(b"m2").unwrap();
    fs.close_file(h1).unwrap();
    fs.delete_file(b"m1").unwrap();

    assert!(!fs.file_exists(b"m1"));
    assert!(fs.file_exists(b"m2"));
    assert_eq!(fs.list_files().len(), 1);
    fs.close_file(h2).unwrap();
}
