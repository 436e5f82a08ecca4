//! Process-wide expect settings
//!
//! These mirror the global variables of the expect C library: a timeout and a
//! buffer capacity consulted by every [`Session::expect`](crate::Session::expect)
//! call, plus debugging and console echo switches.
//!
//! Settings are shared by every session in the process. They are plain relaxed
//! atomics: the last writer wins, and a setter racing with expect calls in
//! other threads only affects calls that have not yet read the value. An
//! in-flight call keeps the timeout it started with.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

/// Default timeout for expect calls (in seconds)
pub const DEFAULT_TIMEOUT_SECS: i64 = 10;

/// Default buffer capacity (in bytes)
pub const DEFAULT_MATCH_MAX: usize = 2000;

static TIMEOUT_SECS: AtomicI64 = AtomicI64::new(DEFAULT_TIMEOUT_SECS);
static MATCH_MAX: AtomicUsize = AtomicUsize::new(DEFAULT_MATCH_MAX);
static DEBUGGING: AtomicBool = AtomicBool::new(false);
static LOG_USER: AtomicBool = AtomicBool::new(false);

/// Set the timeout, in seconds, for subsequent expect calls.
///
/// A negative value waits forever. Zero only considers output that is
/// already available.
///
/// # Examples
///
/// ```
/// ptyexpect::config::set_timeout(1);
/// assert_eq!(
///     ptyexpect::config::timeout(),
///     Some(std::time::Duration::from_secs(1))
/// );
/// ```
pub fn set_timeout(secs: i64) {
    TIMEOUT_SECS.store(secs, Ordering::Relaxed);
}

/// Current timeout, `None` when expect calls wait forever.
pub fn timeout() -> Option<Duration> {
    let secs = TIMEOUT_SECS.load(Ordering::Relaxed);
    u64::try_from(secs).ok().map(Duration::from_secs)
}

/// Set how many unmatched bytes an expect call may accumulate before it gives
/// up with [`Outcome::FullBuffer`](crate::Outcome::FullBuffer).
pub fn set_match_max(bytes: usize) {
    MATCH_MAX.store(bytes, Ordering::Relaxed);
}

/// Current buffer capacity in bytes.
pub fn match_max() -> usize {
    MATCH_MAX.load(Ordering::Relaxed)
}

/// Turn engine diagnostics on or off.
///
/// Diagnostics go through the `log` facade at debug level; a logger must be
/// installed by the application to see them.
pub fn set_debugging(debug: bool) {
    DEBUGGING.store(debug, Ordering::Relaxed);
}

/// Whether engine diagnostics are on.
pub fn is_debugging() -> bool {
    DEBUGGING.load(Ordering::Relaxed)
}

/// Turn echoing of child output to stdout on or off.
pub fn set_log_to_console(log: bool) {
    LOG_USER.store(log, Ordering::Relaxed);
}

/// Whether child output is echoed to stdout.
pub fn logs_to_console() -> bool {
    LOG_USER.load(Ordering::Relaxed)
}
