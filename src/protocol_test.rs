use std::io::{BufReader, Cursor};
use std::io::Write;

use tempfile::NamedTempFile;

use super::*;
use crate::session;

fn roundtrip(commands: &[&str]) -> Vec<Value> {
    let input = format!("{}\n", commands.join("\n"));
    let mut output = Vec::new();
    run(BufReader::new(Cursor::new(input)), &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn malformed_json_yields_error_response() {
    let responses = roundtrip(&["not json at all"]);
    assert_eq!(responses.len(), 1);
    assert!(responses[0].get("Error").is_some());
}

#[test]
fn multi_key_object_is_malformed_command() {
    let responses = roundtrip(&[r#"{"OpenFile": {"path": "/tmp/x"}, "Search": {"pattern": "a"}}"#]);
    assert_eq!(responses.len(), 1);
    let message = responses[0]["Error"]["message"].as_str().unwrap();
    assert!(message.contains("malformed command"), "{}", message);
}

#[test]
fn session_scoped_command_without_open_file_errors() {
    // A fresh process-wide session may already be open from another test in
    // this binary; this only checks the error *shape* when GetChunk runs
    // against whatever Session currently exists (or none).
    let _guard = session::test_support::lock();
    let responses = roundtrip(&[r#"{"GetChunk": {"start_line": 0, "end_line": 1}}"#]);
    assert_eq!(responses.len(), 1);
    assert!(responses[0].get("Chunk").is_some() || responses[0].get("Error").is_some());
}

#[test]
fn get_file_encoding_does_not_require_a_session() {
    let f = write_temp(b"hello\nworld\n");
    let command = format!(r#"{{"GetFileEncoding": {{"path": "{}"}}}}"#, f.path().to_string_lossy());
    let responses = roundtrip(&[&command]);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["Encoding"]["encoding"], "UTF-8");
    assert_eq!(responses[0]["Encoding"]["is_supported"], true);
}

#[test]
fn open_file_then_get_chunk_round_trips_lines() {
    let _guard = session::test_support::lock();
    let f = write_temp(b"a\nb\nc\n");
    let open = format!(r#"{{"OpenFile": {{"path": "{}"}}}}"#, f.path().to_string_lossy());
    let responses = roundtrip(&[&open, r#"{"GetChunk": {"start_line": 0, "end_line": 2}}"#]);
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["FileOpened"]["line_count"], 3);
    assert_eq!(responses[1]["Chunk"]["data"], serde_json::json!([["a"], ["b"]]));
}

#[test]
fn open_file_then_search_emits_progress_and_results() {
    let _guard = session::test_support::lock();
    let f = write_temp(b"abc\nabd\nxyz\n");
    let open = format!(r#"{{"OpenFile": {{"path": "{}"}}}}"#, f.path().to_string_lossy());
    let responses = roundtrip(&[&open, r#"{"Search": {"pattern": "ab"}}"#]);

    let last = responses.last().unwrap();
    assert!(last.get("SearchResults").is_some(), "{:?}", last);
    assert_eq!(last["SearchResults"]["total_matches"], 2);
    assert_eq!(last["SearchResults"]["search_complete"], true);
}

#[test]
fn unknown_command_name_is_malformed() {
    let responses = roundtrip(&[r#"{"FrobnicateFile": {}}"#]);
    assert!(responses[0]["Error"]["message"].as_str().unwrap().contains("unknown command"));
}

#[test]
fn get_session_status_reports_open_session() {
    let _guard = session::test_support::lock();
    let f = write_temp(b"one\ntwo\n");
    let open = format!(r#"{{"OpenFile": {{"path": "{}"}}}}"#, f.path().to_string_lossy());
    let responses = roundtrip(&[&open, r#"{"GetSessionStatus": null}"#]);
    let status = &responses[1]["SessionStatus"];
    assert_eq!(status["line_count"], 2);
    assert_eq!(status["has_parse_spec"], false);
    assert_eq!(status["search_in_progress"], false);
}
