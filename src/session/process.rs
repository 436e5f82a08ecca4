//! Out-of-band process termination

use crate::result::ExpectError;
use log::debug;
use rustix::io::Errno;
use rustix::process::{kill_process, Pid, Signal};
use std::io;

/// A back-reference to a spawned child by process id.
///
/// The handle does not own the process: the child may exit or be reaped at any
/// time. Because it is `Copy` it can be moved to another task to abort an
/// expect call that is blocked on the session, which then observes
/// [`Outcome::Eof`](crate::Outcome::Eof).
///
/// # Examples
///
/// ```no_run
/// use ptyexpect::{Pattern, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::spawn("cat", &[])?;
/// let process = session.process();
///
/// tokio::spawn(async move {
///     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///     let _ = process.kill();
/// });
///
/// let outcome = session.expect(&[Pattern::glob("never", 1)]).await?;
/// println!("ended with {}", outcome.code());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pid: u32,
}

impl ProcessHandle {
    pub(crate) fn new(pid: u32) -> Self {
        Self { pid }
    }

    /// OS process id.
    pub fn pid(self) -> u32 {
        self.pid
    }

    /// Forcefully terminate the process (SIGKILL).
    ///
    /// Killing a process that no longer exists reports the OS error
    /// (`no such process`); callers should treat it as advisory.
    pub fn kill(self) -> Result<(), ExpectError> {
        debug!("killing pid {}", self.pid);

        let pid = i32::try_from(self.pid)
            .ok()
            .and_then(Pid::from_raw)
            .ok_or_else(|| ExpectError::Io(io::Error::from(Errno::SRCH)))?;

        kill_process(pid, Signal::KILL).map_err(|e| ExpectError::Io(e.into()))
    }
}
