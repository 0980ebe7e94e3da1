//! File Watcher (§4.6) — polls (length, prefix fingerprint) at a fixed
//! cadence and classifies what it sees as unchanged, an append, or a
//! truncate/rotation.
//!
//! The classification itself is a pure function (`classify`); the poll loop
//! lives on its own thread per open Session, spawned and torn down by
//! `session::open_file` each time `OpenFile` replaces the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crate::config;
use crate::session::{ChangeEvent, FINGERPRINT_PREFIX_BYTES, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Unchanged,
    Append,
    TruncateOrRotate,
}

fn classify(old_length: u64, old_fingerprint: blake3::Hash, new_length: u64, new_fingerprint: blake3::Hash) -> Classification {
    if new_length == old_length && new_fingerprint == old_fingerprint {
        Classification::Unchanged
    } else if new_length > old_length && new_fingerprint == old_fingerprint {
        Classification::Append
    } else {
        Classification::TruncateOrRotate
    }
}

/// Spawn the poll loop for `session`. `generation` is this watcher's own
/// session epoch; `current_generation` is the session-wide counter bumped by
/// every `OpenFile` — the loop exits as soon as they disagree, since that
/// means a later `OpenFile` has already replaced the session this watcher
/// was tracking.
pub fn spawn(
    session: Arc<Session>,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    on_event: impl Fn(ChangeEvent) + Send + 'static,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            thread::sleep(config::watcher_poll_interval());
            if current_generation.load(Ordering::Acquire) != generation {
                return;
            }
            match tick(&session) {
                Ok(Some(event)) => on_event(event),
                Ok(None) => {}
                Err(e) => {
                    // Recoverable: report and keep polling, don't tear down the session.
                    log::warn!("watcher: tick failed, will retry: {}", e);
                    on_event(ChangeEvent::Info { message: e.to_string() });
                }
            }
        }
    })
}

/// Sample the file once and, if it changed, update the session's index and
/// return the event to deliver to the client.
fn tick(session: &Session) -> Result<Option<ChangeEvent>, crate::error::EngineError> {
    let (old_length, old_fingerprint) = session.last_observed();
    let new_length = session.byte_source_raw_length()?;
    let new_fingerprint = session.byte_source_raw_fingerprint(FINGERPRINT_PREFIX_BYTES)?;

    match classify(old_length, old_fingerprint, new_length, new_fingerprint) {
        Classification::Unchanged => Ok(None),
        Classification::Append => {
            log::info!("watcher: append detected ({} -> {} bytes)", old_length, new_length);
            session.apply_append(new_length, new_fingerprint).map(Some)
        }
        Classification::TruncateOrRotate => {
            log::info!("watcher: truncate/rotation detected ({} -> {} bytes)", old_length, new_length);
            session.apply_rebuild(new_fingerprint).map(Some)
        }
    }
}
