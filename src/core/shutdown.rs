//! Cooperative shutdown helpers
//!
//! Every long-running loop in the crate shares one `Arc<AtomicBool>` that the
//! Ctrl+C handler sets. These helpers keep the checks uniform.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep between flag checks
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Has shutdown been requested?
pub fn is_shutdown(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

/// Sleep for `duration`, waking early if the flag is set.
///
/// Returns `true` if the full duration elapsed, `false` if interrupted.
pub fn sleep_unless_shutdown(duration: Duration, flag: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;

    loop {
        if is_shutdown(flag) {
            return false;
        }

        let now = Instant::now();
        if now >= deadline {
            return true;
        }

        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
