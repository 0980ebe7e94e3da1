//! Query Engine — GetChunk (§4.4) and Search (§4.5).
//!
//! GetChunk is a thin, lazy pass-through onto the Line Index. Search
//! partitions the byte view across a rayon-driven worker pool, one worker
//! per partition, coordinating through a shared atomic byte counter (for
//! throttled Progress) and a shared atomic match counter (for the 1000-match
//! cap), then merges partial results in partition order.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

use crate::byte_source::ByteSource;
use crate::config;
use crate::error::EngineError;
use crate::line_index::{LineIndex, decode_line, split_columns};
use crate::parsing::ParseSpec;
use crate::session::Session;

/// A single regex hit, located to a line, a column, and a byte sub-range of
/// that column string.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchRecord {
    pub line_number: u64,
    pub column: u32,
    pub start_index: u32,
    pub end_index: u32,
}

pub struct SearchOutcome {
    pub matches: Vec<MatchRecord>,
    pub total_matches: usize,
    pub search_complete: bool,
}

/// Read `[start_line, end_line)`, clamped, optionally split into columns by
/// the session's installed ParseSpec. Lazy: touches no session state.
pub fn get_chunk(session: &Session, start_line: usize, end_line: usize) -> Result<Vec<Vec<String>>, EngineError> {
    session.get_chunk(start_line, end_line)
}

/// Run a full-file regex search, reporting throttled progress through
/// `on_progress` as it goes, and returning the merged, capped, sorted result.
///
/// Runs to completion on the calling thread (the dispatcher's search-command
/// handler spawns a dedicated thread for this so command processing for the
/// *next* command can start only once this returns, per §4.8's "a Search
/// occupies the dispatcher until it completes").
pub fn search(
    session: &Session,
    pattern: &str,
    on_progress: impl Fn(u8) + Send + Sync + 'static,
) -> Result<SearchOutcome, EngineError> {
    let regex = Regex::new(pattern)?;

    session.mark_search(true);
    let result = session.with_shared(|source, index, parse_spec| run_search(source, index, parse_spec, &regex, on_progress));
    session.mark_search(false);
    result
}

fn run_search(
    source: &ByteSource,
    index: &LineIndex,
    parse_spec: Option<&ParseSpec>,
    regex: &Regex,
    on_progress: impl Fn(u8) + Send + Sync + 'static,
) -> Result<SearchOutcome, EngineError> {
    let line_count = index.line_count();
    let total_bytes = source.length();
    let match_cap = config::search_match_cap();

    if line_count == 0 {
        return Ok(SearchOutcome { matches: Vec::new(), total_matches: 0, search_complete: true });
    }

    let partitions = partition_lines(index, total_bytes, config::search_worker_count().clamp(1, line_count));

    let bytes_processed = Arc::new(AtomicU64::new(0));
    let match_count = Arc::new(AtomicUsize::new(0));
    let cap_reached = Arc::new(AtomicBool::new(false));
    let done = Arc::new(AtomicBool::new(false));
    let error_slot: Arc<Mutex<Option<EngineError>>> = Arc::new(Mutex::new(None));

    let monitor = spawn_progress_monitor(bytes_processed.clone(), done.clone(), total_bytes, on_progress);

    let per_partition: Vec<Vec<MatchRecord>> = partitions
        .par_iter()
        .map(|&(start_line, end_line)| {
            match search_partition(
                source,
                index,
                parse_spec,
                regex,
                start_line,
                end_line,
                &bytes_processed,
                &match_count,
                &cap_reached,
                match_cap,
            ) {
                Ok(matches) => matches,
                Err(e) => {
                    *error_slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(e);
                    Vec::new()
                }
            }
        })
        .collect();

    done.store(true, Ordering::Release);
    let _ = monitor.join();

    if let Some(e) = error_slot.lock().unwrap_or_else(|p| p.into_inner()).take() {
        return Err(e);
    }

    let mut matches: Vec<MatchRecord> = per_partition.into_iter().flatten().collect();
    matches.sort_by_key(|m| (m.line_number, m.column, m.start_index));

    let total_found = matches.len();
    matches.truncate(match_cap);
    let total_matches = matches.len();

    Ok(SearchOutcome {
        matches,
        total_matches,
        search_complete: total_found < match_cap,
    })
}

/// Split `[0, line_count)` into `worker_count` roughly equal-byte ranges,
/// each boundary snapped forward to the nearest line start so no line
/// straddles two partitions (§4.5 step 2).
fn partition_lines(index: &LineIndex, total_bytes: u64, worker_count: usize) -> Vec<(usize, usize)> {
    let line_count = index.line_count();
    let mut boundaries = Vec::with_capacity(worker_count + 1);
    boundaries.push(0usize);
    for i in 1..worker_count {
        let raw_offset = total_bytes.saturating_mul(i as u64) / worker_count as u64;
        boundaries.push(index.line_at_or_after(raw_offset));
    }
    boundaries.push(line_count);

    boundaries.windows(2).map(|w| (w[0], w[1])).filter(|&(s, e)| s < e).collect()
}

#[allow(clippy::too_many_arguments)]
fn search_partition(
    source: &ByteSource,
    index: &LineIndex,
    parse_spec: Option<&ParseSpec>,
    regex: &Regex,
    start_line: usize,
    end_line: usize,
    bytes_processed: &AtomicU64,
    match_count: &AtomicUsize,
    cap_reached: &AtomicBool,
    match_cap: usize,
) -> Result<Vec<MatchRecord>, EngineError> {
    let mut matches = Vec::new();
    if start_line >= end_line {
        return Ok(matches);
    }

    let (partition_lo, partition_hi) = index.lines_byte_range(start_line, end_line);
    let buffer = source.read_range(partition_lo, partition_hi)?;

    for line in start_line..end_line {
        if cap_reached.load(Ordering::Relaxed) {
            break;
        }
        let (lo, hi) = index.line_byte_range(line);
        let rel = (lo - partition_lo) as usize..(hi - partition_lo) as usize;
        let raw = &buffer[rel.clone()];
        bytes_processed.fetch_add(rel.len() as u64, Ordering::Relaxed);

        let text = decode_line(raw);
        let columns = split_columns(&text, parse_spec);

        for (column, value) in columns.iter().enumerate() {
            for m in regex.find_iter(value) {
                let prev = match_count.fetch_add(1, Ordering::Relaxed);
                if prev + 1 >= match_cap {
                    cap_reached.store(true, Ordering::Relaxed);
                }
                matches.push(MatchRecord {
                    line_number: line as u64,
                    column: column as u32,
                    start_index: m.start() as u32,
                    end_index: m.end() as u32,
                });
                if cap_reached.load(Ordering::Relaxed) {
                    break;
                }
            }
            if cap_reached.load(Ordering::Relaxed) {
                break;
            }
        }
    }

    Ok(matches)
}

/// Poll `bytes_processed` at a throttled cadence and report non-decreasing
/// percent-complete to `on_progress`, stopping once `done` is set.
fn spawn_progress_monitor(
    bytes_processed: Arc<AtomicU64>,
    done: Arc<AtomicBool>,
    total_bytes: u64,
    on_progress: impl Fn(u8) + Send + Sync + 'static,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_emitted: i64 = -1;
        let mut last_emit_at = Instant::now();
        let min_interval = config::progress_min_interval();

        loop {
            let finished = done.load(Ordering::Acquire);
            let processed = bytes_processed.load(Ordering::Relaxed);
            let percent = if total_bytes == 0 { 100 } else { ((processed as u128 * 100) / total_bytes as u128).min(100) as i64 };

            if percent > last_emitted && (finished || last_emit_at.elapsed() >= min_interval) {
                on_progress(percent as u8);
                last_emitted = percent;
                last_emit_at = Instant::now();
            }

            if finished {
                return;
            }
            thread::sleep(min_interval.min(std::time::Duration::from_millis(50)));
        }
    })
}

#[cfg(test)]
mod query_test;
