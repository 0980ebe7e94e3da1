//! Line Index — a dense, monotonically growing vector of byte offsets.
//!
//! `offsets[0] == 0`, `offsets[len-1] == byte_length`, and line `i` occupies
//! `[offsets[i], offsets[i+1])` (minus its trailing newline). This is the only
//! structure that lets a line number be resolved to a byte range; it is kept
//! fully in memory rather than as a sparse checkpoint table, per the fixed
//! 8-bytes-per-line memory budget.

use memchr::memchr_iter;

use crate::byte_source::ByteSource;
use crate::error::EngineError;
use crate::parsing::ParseSpec;

const SCAN_CHUNK: usize = 256 * 1024;

pub struct LineIndex {
    offsets: Vec<u64>,
    /// Whether `offsets`'s last entry is a manufactured end-of-file marker
    /// (the byte view doesn't end on a newline) rather than a real newline
    /// boundary that happens to coincide with the current length — only the
    /// former should be dropped before an append extends the index.
    sentinel_is_manufactured: bool,
}

impl LineIndex {
    /// Full scan of `source`, building the dense offset vector from scratch.
    pub fn build(source: &ByteSource) -> Result<Self, EngineError> {
        let mut offsets = vec![0u64];
        scan_newlines(source, 0, source.length(), &mut offsets)?;
        let sentinel_is_manufactured = push_terminal_sentinel(&mut offsets, source.length());
        Ok(Self { offsets, sentinel_is_manufactured })
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn byte_length(&self) -> u64 {
        *self.offsets.last().unwrap_or(&0)
    }

    /// Byte offset of the start of `line`, clamped to the index bounds.
    pub fn line_start(&self, line: usize) -> u64 {
        self.offsets[line.min(self.offsets.len() - 1)]
    }

    /// The raw half-open byte range `[start, end)` for `line`, newline included
    /// when one terminates the line — `decode_line` strips it on read.
    pub(crate) fn line_byte_range(&self, line: usize) -> (u64, u64) {
        (self.offsets[line], self.offsets[line + 1])
    }

    /// The raw half-open byte range spanning `[start_line, end_line)`, used
    /// by Search to read one partition's bytes in a single call.
    pub fn lines_byte_range(&self, start_line: usize, end_line: usize) -> (u64, u64) {
        let start_line = start_line.min(self.line_count());
        let end_line = end_line.min(self.line_count());
        (self.offsets[start_line], self.offsets[end_line])
    }

    /// The first line number whose start offset is `>= byte_offset` — used to
    /// snap a raw byte split point onto a line boundary for Search
    /// partitioning. Clamped to `line_count`.
    pub fn line_at_or_after(&self, byte_offset: u64) -> usize {
        self.offsets.partition_point(|&o| o < byte_offset).min(self.line_count())
    }

    /// Extend the index in place after the file grows from `old_length` to the
    /// byte source's current length. Only the newly appended bytes are scanned.
    /// Returns the 0-based line numbers that are newly complete.
    pub fn extend_from_append(
        &mut self,
        source: &ByteSource,
        old_length: u64,
    ) -> Result<std::ops::Range<usize>, EngineError> {
        let new_length = source.length();
        debug_assert!(new_length >= old_length);

        let old_line_count = self.line_count();
        // Only drop the sentinel when it was manufactured — a real newline
        // boundary that happens to sit at `old_length` must stay, or the
        // line before it silently merges with the first newly appended line.
        if self.sentinel_is_manufactured {
            self.offsets.pop();
        }

        scan_newlines(source, old_length, new_length, &mut self.offsets)?;
        self.sentinel_is_manufactured = push_terminal_sentinel(&mut self.offsets, new_length);

        Ok(old_line_count..self.line_count())
    }

    /// Resolve `[start_line, end_line)` (clamped) into decoded, optionally
    /// parsed rows. Each row is a list of column strings — a single-element
    /// list when no `ParseSpec` is installed, or when the line doesn't match it.
    pub fn get_chunk(
        &self,
        source: &ByteSource,
        start_line: usize,
        end_line: usize,
        parse_spec: Option<&ParseSpec>,
    ) -> Result<Vec<Vec<String>>, EngineError> {
        let line_count = self.line_count();
        let start_line = start_line.min(line_count);
        let end_line = end_line.min(line_count).max(start_line);

        let mut rows = Vec::with_capacity(end_line - start_line);
        for line in start_line..end_line {
            let (lo, hi) = self.line_byte_range(line);
            let raw = source.read_range(lo, hi)?;
            let text = decode_line(&raw);
            rows.push(split_columns(&text, parse_spec));
        }
        Ok(rows)
    }
}

/// Decode a raw line's bytes as UTF-8 (lossy), stripping a trailing `\n` and
/// then a trailing `\r` left over from a CRLF terminator.
pub(crate) fn decode_line(raw: &[u8]) -> String {
    let raw = if raw.last() == Some(&b'\n') { &raw[..raw.len() - 1] } else { raw };
    let raw = if raw.last() == Some(&b'\r') { &raw[..raw.len() - 1] } else { raw };
    String::from_utf8_lossy(raw).into_owned()
}

/// Append the end-of-file sentinel unless the last newline already scanned
/// landed exactly on `length` — a file that ends with a newline should not
/// manufacture a trailing empty line, per the engine's line-counting contract.
/// Returns whether a sentinel was actually manufactured.
fn push_terminal_sentinel(offsets: &mut Vec<u64>, length: u64) -> bool {
    if offsets.last() != Some(&length) {
        offsets.push(length);
        true
    } else {
        false
    }
}

pub(crate) fn split_columns(line: &str, parse_spec: Option<&ParseSpec>) -> Vec<String> {
    match parse_spec {
        Some(spec) => spec.extract(line).unwrap_or_else(|| vec![line.to_string()]),
        None => vec![line.to_string()],
    }
}

/// Scan `source`'s bytes in `[from, to)` for newlines, pushing `offset+1` for
/// each one found (the start of the next line) onto `offsets`.
fn scan_newlines(source: &ByteSource, from: u64, to: u64, offsets: &mut Vec<u64>) -> Result<(), EngineError> {
    let mut pos = from;
    while pos < to {
        let chunk_end = (pos + SCAN_CHUNK as u64).min(to);
        let chunk = source.read_range(pos, chunk_end)?;
        for nl in memchr_iter(b'\n', &chunk) {
            offsets.push(pos + nl as u64 + 1);
        }
        pos = chunk_end;
    }
    Ok(())
}

#[cfg(test)]
mod line_index_test;
