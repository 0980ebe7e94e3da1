use std::io::Write;

use tempfile::NamedTempFile;

use super::*;

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

fn utf16le(source: &str) -> Vec<u8> {
    let mut out = UTF16_LE_BOM.to_vec();
    for unit in source.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

fn utf16be(source: &str) -> Vec<u8> {
    let mut out = UTF16_BE_BOM.to_vec();
    for unit in source.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[test]
fn plain_ascii_is_utf8() {
    let f = write_temp(b"hello\nworld\n");
    let result = probe(f.path()).unwrap();
    assert_eq!(result.encoding, Encoding::Utf8);
    assert!(result.is_supported);
}

#[test]
fn utf8_bom_is_detected() {
    let mut bytes = UTF8_BOM.to_vec();
    bytes.extend_from_slice(b"hello\n");
    let f = write_temp(&bytes);
    let result = probe(f.path()).unwrap();
    assert_eq!(result.encoding, Encoding::Utf8);
}

#[test]
fn utf16le_bom_is_detected() {
    let bytes = utf16le("hello\nworld\n");
    let f = write_temp(&bytes);
    let result = probe(f.path()).unwrap();
    assert_eq!(result.encoding, Encoding::Utf16Le);
    assert!(result.is_supported);
}

#[test]
fn utf16be_bom_is_detected() {
    let bytes = utf16be("hello\nworld\n");
    let f = write_temp(&bytes);
    let result = probe(f.path()).unwrap();
    assert_eq!(result.encoding, Encoding::Utf16Be);
    assert!(result.is_supported);
}

#[test]
fn utf16le_transcodes_to_utf8() {
    let bytes = utf16le("hello\nworld\n");
    let decoded = transcode_to_utf8(&bytes[2..], Encoding::Utf16Le);
    assert_eq!(decoded, b"hello\nworld\n");
}

#[test]
fn directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = probe(dir.path());
    match result {
        Err(EngineError::Io(msg)) => assert!(msg.contains("directory"), "{}", msg),
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn missing_file_is_not_found() {
    let result = probe(std::path::Path::new("/nonexistent_probe_test_file.txt"));
    assert!(matches!(result, Err(EngineError::Io(_))));
}
