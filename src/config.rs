//! Process-level tuning knobs that aren't part of the wire protocol (§10.2).
//!
//! The protocol defines no CLI flags, so these are compiled defaults,
//! optionally overridden by environment variables read once at startup —
//! the same "const default, runtime override" shape as the watcher's own
//! debounce interval.

use std::env;
use std::sync::LazyLock;
use std::time::Duration;

const DEFAULT_WATCHER_POLL_MS: u64 = 1000;
const DEFAULT_SEARCH_MATCH_CAP: usize = 1000;
const DEFAULT_PROGRESS_RATE_HZ: u64 = 10;

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// How often the file watcher samples (length, fingerprint). `LOGSCOPE_WATCHER_POLL_MS`.
pub fn watcher_poll_interval() -> Duration {
    static MS: LazyLock<u64> = LazyLock::new(|| env_u64("LOGSCOPE_WATCHER_POLL_MS", DEFAULT_WATCHER_POLL_MS));
    Duration::from_millis(*MS)
}

/// Search stops collecting matches once this many are found. `LOGSCOPE_SEARCH_MATCH_CAP`.
pub fn search_match_cap() -> usize {
    static CAP: LazyLock<usize> = LazyLock::new(|| env_usize("LOGSCOPE_SEARCH_MATCH_CAP", DEFAULT_SEARCH_MATCH_CAP));
    *CAP
}

/// Minimum spacing between Progress events, derived from the rate cap. `LOGSCOPE_PROGRESS_RATE_HZ`.
pub fn progress_min_interval() -> Duration {
    static HZ: LazyLock<u64> = LazyLock::new(|| env_u64("LOGSCOPE_PROGRESS_RATE_HZ", DEFAULT_PROGRESS_RATE_HZ).max(1));
    Duration::from_millis(1000 / *HZ)
}

/// Number of parallel Search workers. Defaults to the host core count.
/// `LOGSCOPE_SEARCH_WORKERS` overrides it (mainly useful for deterministic tests).
pub fn search_worker_count() -> usize {
    static OVERRIDE: LazyLock<Option<usize>> = LazyLock::new(|| env::var("LOGSCOPE_SEARCH_WORKERS").ok().and_then(|v| v.parse().ok()));
    OVERRIDE.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
}
