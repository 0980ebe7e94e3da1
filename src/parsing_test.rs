use super::*;

#[test]
fn rejects_capture_count_mismatch() {
    let result = ParseSpec::compile(r"(\d+) (\d+)", 3);
    assert!(matches!(result, Err(EngineError::ColumnCountMismatch { expected: 3, found: 2 })));
}

#[test]
fn extracts_matching_columns() {
    let spec = ParseSpec::compile(r"(\w+) (\w+)", 2).unwrap();
    let cols = spec.extract("hello world").unwrap();
    assert_eq!(cols, vec!["hello", "world"]);
}

#[test]
fn non_matching_line_returns_none() {
    let spec = ParseSpec::compile(r"^\d+$", 0).unwrap();
    assert!(spec.extract("not a number").is_none());
}

#[test]
fn detects_common_log_format() {
    let lines = vec![
        r#"127.0.0.1 - - [10/Oct/2000:13:55:36 -0700] "GET /a HTTP/1.0" 200 2326"#,
        r#"127.0.0.1 - - [10/Oct/2000:13:55:37 -0700] "GET /b HTTP/1.0" 404 -"#,
    ];
    assert_eq!(detect_format(lines.into_iter()), LogFormatGuess::CommonLogFormat);
}

#[test]
fn detects_ncsa_combined() {
    let lines = vec![
        r#"127.0.0.1 - - [10/Oct/2000:13:55:36 -0700] "GET /a HTTP/1.0" 200 2326 "http://ref" "UA/1.0""#,
        r#"127.0.0.1 - - [10/Oct/2000:13:55:37 -0700] "GET /b HTTP/1.0" 404 - "http://ref" "UA/1.0""#,
    ];
    assert_eq!(detect_format(lines.into_iter()), LogFormatGuess::NcsaCombined);
}

#[test]
fn detects_syslog_3164() {
    let lines = vec![
        "<34>Oct 11 22:14:15 mymachine su: failed login",
        "<34>Oct 11 22:14:16 mymachine su: failed login again",
    ];
    assert_eq!(detect_format(lines.into_iter()), LogFormatGuess::SyslogRfc3164);
}

#[test]
fn unrecognized_lines_are_other() {
    let lines = vec!["just some free text", "with no particular structure at all"];
    assert_eq!(detect_format(lines.into_iter()), LogFormatGuess::Other);
}

#[test]
fn empty_sample_is_other() {
    assert_eq!(detect_format(std::iter::empty()), LogFormatGuess::Other);
}

#[test]
fn builtin_pattern_roundtrips_through_compile() {
    let (pattern, cols) = LogFormatGuess::CommonLogFormat.builtin_pattern().unwrap();
    let spec = ParseSpec::compile(pattern, cols).unwrap();
    let extracted = spec
        .extract(r#"127.0.0.1 - - [10/Oct/2000:13:55:36 -0700] "GET /a HTTP/1.0" 200 2326"#)
        .unwrap();
    assert_eq!(extracted[0], "127.0.0.1");
    assert_eq!(extracted[5], "200");
}
