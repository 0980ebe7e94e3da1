use std::io::Write;

use tempfile::NamedTempFile;

use super::*;
use super::test_support::lock as test_lock;

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn open_rejects_relative_paths() {
    let result = Session::open(Path::new("relative/path.txt"));
    assert!(matches!(result, Err(EngineError::PathNotAbsolute(_))));
}

#[test]
fn open_file_sets_current_session_and_line_count() {
    let _guard = test_lock();
    let f = write_temp(b"a\nbb\nccc");
    let line_count = open_file(f.path(), |_| {}).unwrap();
    assert_eq!(line_count, 3);
    assert_eq!(current().unwrap().line_count(), 3);
}

#[test]
fn open_file_replaces_prior_session() {
    let _guard = test_lock();
    let f1 = write_temp(b"one\ntwo\n");
    open_file(f1.path(), |_| {}).unwrap();
    assert_eq!(current().unwrap().line_count(), 2);

    let f2 = write_temp(b"x\ny\nz\nw\n");
    open_file(f2.path(), |_| {}).unwrap();
    assert_eq!(current().unwrap().path(), f2.path());
    assert_eq!(current().unwrap().line_count(), 4);
}

#[test]
fn apply_append_extends_index_and_returns_new_lines() {
    let _guard = test_lock();
    let f = write_temp(b"a\nb\nc\n");
    open_file(f.path(), |_| {}).unwrap();
    let session = current().unwrap();

    let mut file = std::fs::OpenOptions::new().append(true).open(f.path()).unwrap();
    file.write_all(b"d\ne\n").unwrap();
    file.flush().unwrap();

    let new_length = session.byte_source_raw_length().unwrap();
    let fp = session.byte_source_raw_fingerprint(FINGERPRINT_PREFIX_BYTES).unwrap();
    let event = session.apply_append(new_length, fp).unwrap();

    match event {
        ChangeEvent::Append { old_line_count, new_line_count, new_lines } => {
            assert_eq!(old_line_count, 3);
            assert_eq!(new_line_count, 5);
            assert_eq!(new_lines, vec![vec!["d".to_string()], vec!["e".to_string()]]);
        }
        other => panic!("expected Append, got {:?}", other),
    }

    let chunk = session.get_chunk(3, 5).unwrap();
    assert_eq!(chunk, vec![vec!["d".to_string()], vec!["e".to_string()]]);
}

#[test]
fn apply_rebuild_reindexes_after_truncation() {
    let _guard = test_lock();
    let f = write_temp(b"a\nb\nc\nd\ne\n");
    open_file(f.path(), |_| {}).unwrap();
    let session = current().unwrap();
    assert_eq!(session.line_count(), 5);

    std::fs::write(f.path(), b"only\n").unwrap();

    let fp = session.byte_source_raw_fingerprint(FINGERPRINT_PREFIX_BYTES).unwrap();
    let event = session.apply_rebuild(fp).unwrap();
    match event {
        ChangeEvent::Truncate { line_count } => assert_eq!(line_count, 1),
        other => panic!("expected Truncate, got {:?}", other),
    }
    assert_eq!(session.line_count(), 1);
}

#[test]
fn parse_file_installs_spec_used_by_get_chunk() {
    let _guard = test_lock();
    let f = write_temp(b"1.2.3.4 - - [t] \"req\" 200 5\n");
    open_file(f.path(), |_| {}).unwrap();
    let session = current().unwrap();
    assert!(!session.has_parse_spec());

    let spec = ParseSpec::compile(r#"(\d{1,3}(?:\.\d{1,3}){3}) - - \[(.*?)\] "(.*?)" (\d{3}) (\d+|-)"#, 5).unwrap();
    session.parse_file(spec);
    assert!(session.has_parse_spec());

    let chunk = session.get_chunk(0, 1).unwrap();
    assert_eq!(chunk, vec![vec!["1.2.3.4", "t", "req", "200", "5"].into_iter().map(String::from).collect::<Vec<_>>()]);
}
