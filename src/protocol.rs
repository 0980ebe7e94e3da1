//! Protocol Dispatcher (§4.8/§6) — newline-delimited JSON in, newline-
//! delimited JSON out. Each input line is a single-key object naming a
//! command; each output line is a single-key object naming a response or
//! an unsolicited watcher event.
//!
//! Generalized from a Tauri `#[tauri::command]`-style macro dispatcher
//! (`fn viewer_open(...) -> Result<T, String>`) to a hand-rolled
//! reader/writer loop, since there is no Tauri runtime here — the shape
//! (thin handler, `log::debug!` per call, errors turned into a string
//! payload) is otherwise the same.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoding::Encoding;
use crate::error::EngineError;
use crate::parsing::{LogFormatGuess, ParseSpec};
use crate::query::{self, MatchRecord};
use crate::session::{self, ChangeEvent};

#[derive(Deserialize)]
struct PathParams {
    path: String,
}

#[derive(Deserialize)]
struct ParseFileParams {
    log_format: String,
    pattern: Option<String>,
    nbr_columns: Option<usize>,
}

#[derive(Deserialize)]
struct ChunkParams {
    start_line: usize,
    end_line: usize,
}

#[derive(Deserialize)]
struct SearchParams {
    pattern: String,
}

enum Command {
    GetFileEncoding { path: String },
    OpenFile { path: String },
    GetParsingInformation,
    ParseFile { log_format: String, pattern: Option<String>, nbr_columns: Option<usize> },
    GetChunk { start_line: usize, end_line: usize },
    Search { pattern: String },
    GetSessionStatus,
}

/// A wire response or unsolicited event. Variant names are used verbatim as
/// the single JSON key (no casing transform); field names are plain
/// snake_case (`is_supported`, `start_line`, ...).
#[derive(Serialize)]
enum Response {
    Encoding { encoding: Encoding, is_supported: bool },
    FileOpened { line_count: usize },
    ParsingInformation { log_format: LogFormatGuess },
    Chunk { data: Vec<Vec<String>>, start_line: usize, end_line: usize },
    Progress { percent: u8 },
    SearchResults { matches: Vec<MatchRecord>, total_matches: usize, search_complete: bool },
    FileTruncated { line_count: usize },
    LinesAdded { old_line_count: usize, new_line_count: usize, new_lines: Vec<Vec<String>> },
    SessionStatus {
        path: String,
        encoding: Encoding,
        line_count: usize,
        has_parse_spec: bool,
        search_in_progress: bool,
    },
    Info { message: String },
    Error { message: String },
}

impl From<EngineError> for Response {
    fn from(e: EngineError) -> Self {
        Response::Error { message: e.to_string() }
    }
}

/// Internal messages the dispatch loop drains from its event queue: watcher
/// ticks (posted from the watcher thread, §4.6) and, while a Search is in
/// flight, its Progress stream and terminal outcome (posted from the
/// dedicated thread the dispatcher spawns for that Search, §4.8).
enum Outbound {
    Watcher(ChangeEvent),
    SearchProgress(u8),
    SearchDone(Result<query::SearchOutcome, EngineError>),
}

fn parse_command(line: &str) -> Result<Command, EngineError> {
    let value: Value = serde_json::from_str(line).map_err(|e| EngineError::MalformedCommand(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| EngineError::MalformedCommand("command must be a JSON object".to_string()))?;
    if obj.len() != 1 {
        return Err(EngineError::MalformedCommand(format!(
            "command object must have exactly one key, found {}",
            obj.len()
        )));
    }
    let (name, params) = obj.iter().next().expect("checked len == 1 above");
    let params = params.clone();

    match name.as_str() {
        "GetFileEncoding" => Ok(Command::GetFileEncoding { path: from_value::<PathParams>(params)?.path }),
        "OpenFile" => Ok(Command::OpenFile { path: from_value::<PathParams>(params)?.path }),
        "GetParsingInformation" => Ok(Command::GetParsingInformation),
        "ParseFile" => {
            let p = from_value::<ParseFileParams>(params)?;
            Ok(Command::ParseFile { log_format: p.log_format, pattern: p.pattern, nbr_columns: p.nbr_columns })
        }
        "GetChunk" => {
            let p = from_value::<ChunkParams>(params)?;
            Ok(Command::GetChunk { start_line: p.start_line, end_line: p.end_line })
        }
        "Search" => Ok(Command::Search { pattern: from_value::<SearchParams>(params)?.pattern }),
        "GetSessionStatus" => Ok(Command::GetSessionStatus),
        other => Err(EngineError::MalformedCommand(format!("unknown command: {}", other))),
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, EngineError> {
    serde_json::from_value(value).map_err(|e| EngineError::MalformedCommand(e.to_string()))
}

fn change_event_to_response(event: ChangeEvent) -> Response {
    match event {
        ChangeEvent::Append { old_line_count, new_line_count, new_lines } => {
            Response::LinesAdded { old_line_count, new_line_count, new_lines }
        }
        ChangeEvent::Truncate { line_count } => Response::FileTruncated { line_count },
        ChangeEvent::Info { message } => Response::Info { message },
    }
}

/// Run the dispatch loop: read commands from `input` line by line, write
/// responses to `output`, until EOF. Returns `Ok(())` on clean shutdown.
pub fn run<R: BufRead, W: Write>(mut input: R, mut output: W) -> std::io::Result<()> {
    let (tx, rx): (Sender<Outbound>, Receiver<Outbound>) = mpsc::channel();

    let mut line = String::new();
    loop {
        drain_watcher_events(&rx, &mut output)?;

        line.clear();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 {
            log::info!("dispatcher: EOF on input, shutting down");
            return Ok(());
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            continue;
        }

        log::debug!("dispatcher: received command line ({} bytes)", trimmed.len());

        match parse_command(trimmed) {
            Ok(Command::Search { pattern }) => run_search(&pattern, &tx, &rx, &mut output)?,
            Ok(command) => {
                let response = dispatch(command, &tx);
                write_response(&mut output, &response)?;
            }
            Err(e) => write_response(&mut output, &Response::from(e))?,
        }
    }
}

fn dispatch(command: Command, tx: &Sender<Outbound>) -> Response {
    let result: Result<Response, EngineError> = (|| match command {
        Command::GetFileEncoding { path } => handle_get_file_encoding(&path),
        Command::OpenFile { path } => handle_open_file(&path, tx.clone()),
        Command::GetParsingInformation => handle_get_parsing_information(),
        Command::ParseFile { log_format, pattern, nbr_columns } => handle_parse_file(&log_format, pattern, nbr_columns),
        Command::GetChunk { start_line, end_line } => handle_get_chunk(start_line, end_line),
        Command::GetSessionStatus => handle_get_session_status(),
        Command::Search { .. } => unreachable!("Search is handled by run_search, not dispatch"),
    })();

    result.unwrap_or_else(Response::from)
}

fn handle_get_file_encoding(path: &str) -> Result<Response, EngineError> {
    let path = std::path::Path::new(path);
    if !path.is_absolute() {
        return Err(EngineError::PathNotAbsolute(path.to_string_lossy().into_owned()));
    }
    let probe = crate::encoding::probe(path)?;
    Ok(Response::Encoding { encoding: probe.encoding, is_supported: probe.is_supported })
}

fn handle_open_file(path: &str, tx: Sender<Outbound>) -> Result<Response, EngineError> {
    let path = std::path::Path::new(path);
    log::debug!("dispatcher: OpenFile {}", path.display());
    let line_count = session::open_file(path, move |event| {
        let _ = tx.send(Outbound::Watcher(event));
    })?;
    Ok(Response::FileOpened { line_count })
}

fn handle_get_parsing_information() -> Result<Response, EngineError> {
    let session = session::current()?;
    let sample = session.first_lines(40)?;
    let log_format = crate::parsing::detect_format(sample.iter().map(String::as_str));
    Ok(Response::ParsingInformation { log_format })
}

fn handle_parse_file(log_format: &str, pattern: Option<String>, nbr_columns: Option<usize>) -> Result<Response, EngineError> {
    let session = session::current()?;

    let guess = parse_log_format_tag(log_format)?;
    let (pattern, nbr_columns) = match (pattern, nbr_columns) {
        (Some(pattern), Some(nbr_columns)) => (pattern, nbr_columns),
        _ => guess
            .builtin_pattern()
            .map(|(p, n)| (p.to_string(), n))
            .ok_or_else(|| EngineError::MalformedCommand(format!("'{}' has no built-in pattern; supply pattern and nbr_columns", log_format)))?,
    };

    let spec = ParseSpec::compile(&pattern, nbr_columns)?;
    session.parse_file(spec);
    Ok(Response::ParsingInformation { log_format: guess })
}

fn parse_log_format_tag(tag: &str) -> Result<LogFormatGuess, EngineError> {
    match tag {
        "CommonLogFormat" => Ok(LogFormatGuess::CommonLogFormat),
        "SyslogRFC3164" => Ok(LogFormatGuess::SyslogRfc3164),
        "SyslogRFC5424" => Ok(LogFormatGuess::SyslogRfc5424),
        "W3CExtended" => Ok(LogFormatGuess::W3cExtended),
        "CommonEventFormat" => Ok(LogFormatGuess::CommonEventFormat),
        "NCSACombined" => Ok(LogFormatGuess::NcsaCombined),
        "Other" => Ok(LogFormatGuess::Other),
        other => Err(EngineError::MalformedCommand(format!("unknown log_format: {}", other))),
    }
}

fn handle_get_chunk(start_line: usize, end_line: usize) -> Result<Response, EngineError> {
    let session = session::current()?;
    let data = query::get_chunk(&session, start_line, end_line)?;
    Ok(Response::Chunk { data, start_line, end_line })
}

fn handle_get_session_status() -> Result<Response, EngineError> {
    let session = session::current()?;
    Ok(Response::SessionStatus {
        path: session.path().to_string_lossy().into_owned(),
        encoding: session.encoding(),
        line_count: session.line_count(),
        has_parse_spec: session.has_parse_spec(),
        search_in_progress: session.search_in_progress(),
    })
}

/// Run a Search on a dedicated thread so the dispatch loop can keep draining
/// the watcher-event queue and forwarding Progress events while it runs
/// (§4.8: "a Search occupies the dispatcher until it completes" — occupies,
/// not blocks everything else from being observed).
fn run_search<W: Write>(pattern: &str, tx: &Sender<Outbound>, rx: &Receiver<Outbound>, output: &mut W) -> std::io::Result<()> {
    let session = match session::current() {
        Ok(s) => s,
        Err(e) => return write_response(output, &Response::from(e)),
    };

    log::debug!("dispatcher: Search dispatched, pattern={:?}", pattern);

    let pattern = pattern.to_string();
    let search_tx = tx.clone();
    thread::spawn(move || {
        let progress_tx = search_tx.clone();
        let result = query::search(&session, &pattern, move |percent| {
            let _ = progress_tx.send(Outbound::SearchProgress(percent));
        });
        let _ = search_tx.send(Outbound::SearchDone(result));
    });

    loop {
        match rx.recv() {
            Ok(Outbound::Watcher(event)) => write_response(output, &change_event_to_response(event))?,
            Ok(Outbound::SearchProgress(percent)) => write_response(output, &Response::Progress { percent })?,
            Ok(Outbound::SearchDone(Ok(outcome))) => {
                return write_response(
                    output,
                    &Response::SearchResults {
                        matches: outcome.matches,
                        total_matches: outcome.total_matches,
                        search_complete: outcome.search_complete,
                    },
                );
            }
            Ok(Outbound::SearchDone(Err(e))) => return write_response(output, &Response::from(e)),
            Err(_) => return Ok(()),
        }
    }
}

fn drain_watcher_events<W: Write>(rx: &Receiver<Outbound>, output: &mut W) -> std::io::Result<()> {
    while let Ok(event) = rx.try_recv() {
        match event {
            Outbound::Watcher(change) => write_response(output, &change_event_to_response(change))?,
            // Progress/SearchDone only arrive while run_search is draining rx itself.
            Outbound::SearchProgress(_) | Outbound::SearchDone(_) => {}
        }
    }
    Ok(())
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(response).expect("Response serialization is infallible");
    bytes.push(b'\n');
    output.write_all(&bytes)?;
    output.flush()
}

#[cfg(test)]
mod protocol_test;
