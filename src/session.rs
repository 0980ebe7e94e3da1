//! Session orchestration (§3/§5) — the single process-wide, long-lived
//! Session, its watcher lifecycle, and the read/write discipline that lets
//! GetChunk and Search share access while append/rebuild take it exclusively.
//!
//! Narrowed from a multi-session-by-UUID design to a single global slot, per
//! §3's "exactly one Session exists after a successful OpenFile" invariant.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock};

use crate::byte_source::ByteSource;
use crate::encoding::Encoding;
use crate::error::EngineError;
use crate::ignore_poison::{IgnorePoison, IgnoreRwPoison};
use crate::line_index::LineIndex;
use crate::parsing::ParseSpec;
use crate::watcher;

/// How many raw on-disk bytes the watcher fingerprints to detect rotation.
pub const FINGERPRINT_PREFIX_BYTES: u64 = 4096;

/// What the watcher observed and materialized on a tick, ready to become a
/// `FileTruncated` or `LinesAdded` wire event.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Append {
        old_line_count: usize,
        new_line_count: usize,
        new_lines: Vec<Vec<String>>,
    },
    Truncate {
        line_count: usize,
    },
    /// A recoverable IO error on a watcher tick (§7: "reported as
    /// Info{message} and does not terminate the session").
    Info {
        message: String,
    },
}

struct SessionInner {
    source: ByteSource,
    index: LineIndex,
    parse_spec: Option<Arc<ParseSpec>>,
    last_length: u64,
    last_fingerprint: blake3::Hash,
}

/// The single open file context. Held behind an `Arc` so a watcher thread
/// can keep a reference after `OpenFile` has already swapped the global slot
/// to a new Session — the old watcher notices via the generation counter and
/// exits instead of touching a Session nobody can reach anymore.
pub struct Session {
    path: PathBuf,
    encoding: Encoding,
    inner: RwLock<SessionInner>,
    search_in_progress: std::sync::atomic::AtomicBool,
}

impl Session {
    fn open(path: &Path) -> Result<Self, EngineError> {
        if !path.is_absolute() {
            return Err(EngineError::PathNotAbsolute(path.to_string_lossy().into_owned()));
        }
        let source = ByteSource::open(path)?;
        let index = LineIndex::build(&source)?;
        let last_length = source.raw_file_length()?;
        let last_fingerprint = source.raw_prefix_fingerprint(FINGERPRINT_PREFIX_BYTES)?;
        let encoding = source.encoding();

        Ok(Self {
            path: path.to_path_buf(),
            encoding,
            inner: RwLock::new(SessionInner {
                source,
                index,
                parse_spec: None,
                last_length,
                last_fingerprint,
            }),
            search_in_progress: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn line_count(&self) -> usize {
        self.inner.read_ignore_poison().index.line_count()
    }

    pub fn has_parse_spec(&self) -> bool {
        self.inner.read_ignore_poison().parse_spec.is_some()
    }

    pub fn search_in_progress(&self) -> bool {
        self.search_in_progress.load(Ordering::Acquire)
    }

    pub fn mark_search(&self, running: bool) {
        self.search_in_progress.store(running, Ordering::Release);
    }

    pub fn last_observed(&self) -> (u64, blake3::Hash) {
        let inner = self.inner.read_ignore_poison();
        (inner.last_length, inner.last_fingerprint)
    }

    pub fn byte_source_raw_length(&self) -> Result<u64, EngineError> {
        self.inner.read_ignore_poison().source.raw_file_length()
    }

    pub fn byte_source_raw_fingerprint(&self, n: u64) -> Result<blake3::Hash, EngineError> {
        self.inner.read_ignore_poison().source.raw_prefix_fingerprint(n)
    }

    pub fn get_chunk(&self, start_line: usize, end_line: usize) -> Result<Vec<Vec<String>>, EngineError> {
        let inner = self.inner.read_ignore_poison();
        inner.index.get_chunk(&inner.source, start_line, end_line, inner.parse_spec.as_deref())
    }

    pub fn parse_file(&self, spec: ParseSpec) {
        let mut inner = self.inner.write_ignore_poison();
        inner.parse_spec = Some(Arc::new(spec));
    }

    pub fn first_lines(&self, n: usize) -> Result<Vec<String>, EngineError> {
        let inner = self.inner.read_ignore_poison();
        let count = inner.index.line_count().min(n);
        let raw = inner.index.get_chunk(&inner.source, 0, count, None)?;
        Ok(raw.into_iter().map(|row| row.into_iter().next().unwrap_or_default()).collect())
    }

    /// Run `f` with shared access to the line index and byte source, and the
    /// ParseSpec snapshot captured at the start of the call — this is the
    /// shape Search uses so it can run fully concurrently with GetChunk.
    pub fn with_shared<R>(&self, f: impl FnOnce(&ByteSource, &LineIndex, Option<&ParseSpec>) -> R) -> R {
        let inner = self.inner.read_ignore_poison();
        f(&inner.source, &inner.index, inner.parse_spec.as_deref())
    }

    /// Exclusive: extend the index over newly appended bytes and materialize
    /// the new lines for a `LinesAdded` event.
    pub fn apply_append(&self, new_raw_length: u64, new_fingerprint: blake3::Hash) -> Result<ChangeEvent, EngineError> {
        let mut inner = self.inner.write_ignore_poison();
        let old_line_count = inner.index.line_count();
        let old_length = inner.index.byte_length();

        inner.source = inner.source.reopen()?;
        let added = inner.index.extend_from_append(&inner.source, old_length)?;
        let new_lines = inner.index.get_chunk(&inner.source, added.start, added.end, inner.parse_spec.as_deref())?;

        inner.last_length = new_raw_length;
        inner.last_fingerprint = new_fingerprint;

        Ok(ChangeEvent::Append {
            old_line_count,
            new_line_count: inner.index.line_count(),
            new_lines,
        })
    }

    /// Exclusive: full rebuild after a truncation or rotation. Re-probes
    /// encoding since a rotated file may not share the old one's.
    pub fn apply_rebuild(&self, new_fingerprint: blake3::Hash) -> Result<ChangeEvent, EngineError> {
        let mut inner = self.inner.write_ignore_poison();
        inner.source = ByteSource::open(&self.path)?;
        inner.index = LineIndex::build(&inner.source)?;
        inner.last_length = inner.source.raw_file_length()?;
        inner.last_fingerprint = new_fingerprint;

        Ok(ChangeEvent::Truncate {
            line_count: inner.index.line_count(),
        })
    }
}

/// Bumped on every `OpenFile`; lets a stale watcher thread recognize that its
/// Session has been replaced and stop polling instead of leaking forever.
static GENERATION: LazyLock<Arc<AtomicU64>> = LazyLock::new(|| Arc::new(AtomicU64::new(0)));

static CURRENT: LazyLock<Mutex<Option<Arc<Session>>>> = LazyLock::new(|| Mutex::new(None));

/// Replace the global Session with a freshly opened one, discarding any
/// prior session (§4.8: "OpenFile may be sent at any time; it discards any
/// prior Session"). Spawns the watcher thread for the new session; the old
/// session's watcher (if any) notices the generation bump on its next tick.
pub fn open_file(path: &Path, on_event: impl Fn(ChangeEvent) + Send + 'static) -> Result<usize, EngineError> {
    let session = Arc::new(Session::open(path)?);
    let line_count = session.line_count();

    let generation = GENERATION.fetch_add(1, Ordering::AcqRel) + 1;
    *CURRENT.lock_ignore_poison() = Some(session.clone());

    watcher::spawn(session, generation, GENERATION.clone(), on_event);

    Ok(line_count)
}

pub fn current() -> Result<Arc<Session>, EngineError> {
    CURRENT.lock_ignore_poison().clone().ok_or(EngineError::NoSessionOpen)
}


#[cfg(test)]
mod session_test;
