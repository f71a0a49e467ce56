use std::sync::{
    OnceLock,
    atomic::{AtomicU64, Ordering},
};

use super::clock::now_millis;

/// Returns a process-unique, monotonically increasing identifier.
///
/// Seeded from the wall clock so ids from a restarted process are unlikely to
/// repeat the previous run's.
pub fn rand_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_millis().wrapping_mul(1_000)));
    counter.fetch_add(1, Ordering::Relaxed)
}
