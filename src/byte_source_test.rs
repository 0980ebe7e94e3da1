use std::io::Write;

use tempfile::NamedTempFile;

use super::*;

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn reads_whole_range() {
    let f = write_temp(b"hello world\n");
    let source = ByteSource::open(f.path()).unwrap();
    assert_eq!(source.length(), 12);
    assert_eq!(source.read_range(0, 5).unwrap(), b"hello");
    assert_eq!(source.read_range(6, 11).unwrap(), b"world");
}

#[test]
fn read_range_clamps_past_end() {
    let f = write_temp(b"abc");
    let source = ByteSource::open(f.path()).unwrap();
    assert_eq!(source.read_range(0, 100).unwrap(), b"abc");
    assert_eq!(source.read_range(5, 10).unwrap(), b"");
}

#[test]
fn read_tail_from_offset() {
    let f = write_temp(b"abcdef");
    let source = ByteSource::open(f.path()).unwrap();
    assert_eq!(source.read_tail_from(3).unwrap(), b"def");
}

#[test]
fn fingerprint_changes_with_content() {
    let f1 = write_temp(b"hello");
    let f2 = write_temp(b"world");
    let s1 = ByteSource::open(f1.path()).unwrap();
    let s2 = ByteSource::open(f2.path()).unwrap();
    assert_ne!(s1.prefix_fingerprint(5).unwrap(), s2.prefix_fingerprint(5).unwrap());
}

#[test]
fn fingerprint_stable_for_same_prefix() {
    let f = write_temp(b"hello world, more text here");
    let source = ByteSource::open(f.path()).unwrap();
    assert_eq!(source.prefix_fingerprint(5).unwrap(), source.prefix_fingerprint(5).unwrap());
}

#[test]
fn utf16le_source_reads_as_utf8() {
    let mut bytes = vec![0xFFu8, 0xFE];
    for unit in "hi\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let f = write_temp(&bytes);
    let source = ByteSource::open(f.path()).unwrap();
    assert_eq!(source.read_range(0, source.length()).unwrap(), b"hi\n");
}
