//! Session management for PTY-based process automation

mod builder;
mod process;
mod pump;
mod spawn;

pub use builder::SessionBuilder;
pub use process::ProcessHandle;

use crate::buffer::BufferManager;
use crate::engine::{MatchEngine, OutputStream};
use crate::pattern::Pattern;
use crate::result::{ExpectError, Outcome};
use bytes::Bytes;
use log::debug;
use portable_pty::{Child, ExitStatus, MasterPty};
use rustix::io::Errno;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lifecycle state of a [`Session`].
///
/// The state records what the caller did to the session. It says nothing
/// about whether the OS process has actually exited; only end of file on the
/// stream tells that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Spawned and not yet killed or closed.
    Running,
    /// [`Session::kill`] was called. The stream is still readable.
    Killed,
    /// [`Session::close`] was called. The stream is gone.
    Closed,
}

/// Main session for interacting with a spawned process.
///
/// A `Session` owns a child process's pseudo-terminal and the stream of its
/// combined output. Input is written with [`send`](Session::send); output is
/// consumed by [`expect`](Session::expect).
///
/// # Examples
///
/// ```no_run
/// use ptyexpect::{Pattern, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// ptyexpect::config::set_timeout(5);
///
/// let mut session = Session::spawn("cat", &[])?;
/// session.send_line("here's some input").await?;
///
/// let outcome = session.expect(&[Pattern::glob("input", 1)]).await?;
/// assert_eq!(outcome.code(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Session {
    _master: Option<Box<dyn MasterPty + Send>>,
    child: Option<Box<dyn Child + Send + Sync>>,
    process: ProcessHandle,
    writer: Option<Arc<Mutex<Box<dyn Write + Send>>>>,
    stream: Option<OutputStream>,
    buffer: BufferManager,
    state: SessionState,
}

impl Session {
    /// Create a new session builder.
    ///
    /// Use the builder to pass environment variables, a working directory or
    /// a terminal size.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Spawn `program` with `args` (convenience method).
    ///
    /// This is a shorthand for `Session::builder().args(args).spawn(program)`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ptyexpect::Session;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let session = Session::spawn("/bin/echo", &["hello", "world"])?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(program: &str, args: &[&str]) -> Result<Self, ExpectError> {
        SessionBuilder::new().args(args.iter().copied()).spawn(program)
    }

    /// Wait for the first of `patterns` to appear in the output.
    ///
    /// Patterns are tried in list order against all unconsumed output; the
    /// first one that matches anywhere wins. Output up to the end of the match
    /// is consumed, so the next call continues right after it.
    ///
    /// The call waits at most the global timeout
    /// ([`config::set_timeout`](crate::config::set_timeout)).
    ///
    /// # Returns
    ///
    /// - [`Outcome::Matched`] with the winning pattern's value
    /// - [`Outcome::Timeout`] when the timeout elapsed first
    /// - [`Outcome::Eof`] when the child's output closed first
    /// - [`Outcome::FullBuffer`] when more unmatched output arrived than
    ///   [`config::match_max`](crate::config::match_max) allows
    ///
    /// # Errors
    ///
    /// - [`ExpectError::BadPattern`] for a pattern of unsupported kind, before
    ///   anything is read
    /// - [`ExpectError::Pattern`] for pattern text that does not compile
    /// - [`ExpectError::Io`] when the stream fails, including
    ///   `bad file descriptor` after [`close`](Session::close)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ptyexpect::{Pattern, Session};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let mut session = Session::spawn("cat", &[])?;
    /// let patterns = [
    ///     Pattern::exact("a response", 1),
    ///     Pattern::glob("wombats", 2),
    ///     Pattern::regexp("ABO.T", 3),
    /// ];
    ///
    /// match session.expect(&patterns).await?.code() {
    ///     1 => println!("response"),
    ///     2 => println!("wombats"),
    ///     3 => println!("abort"),
    ///     code => println!("no match ({})", code),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn expect(&mut self, patterns: &[Pattern]) -> Result<Outcome, ExpectError> {
        let engine = MatchEngine::compile(patterns)?;
        let stream = self.stream.as_mut().ok_or_else(closed)?;
        engine.run(&mut self.buffer, stream).await
    }

    /// Send data to the process.
    ///
    /// Writes the given bytes to the child's terminal and flushes them.
    /// Control characters are sent as-is, e.g. `&[0x03]` for Ctrl-C or
    /// `&[0x04]` for Ctrl-D.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), ExpectError> {
        let writer = self.writer.clone().ok_or_else(closed)?;
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut writer = writer.blocking_lock();
            writer.write_all(&data)?;
            writer.flush()
        })
        .await
        .map_err(|e| ExpectError::Io(io::Error::other(e)))??;

        Ok(())
    }

    /// Send a line to the process (appends newline).
    pub async fn send_line(&mut self, line: &str) -> Result<(), ExpectError> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.send(&data).await
    }

    /// Read the next piece of raw output, bypassing pattern matching.
    ///
    /// Unconsumed output left by earlier expect calls is returned first.
    /// Otherwise this waits, without a timeout, for the next chunk. Returns
    /// `None` at end of file.
    pub async fn read_raw(&mut self) -> Result<Option<Bytes>, ExpectError> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.take()));
        }

        let stream = self.stream.as_mut().ok_or_else(closed)?;
        match stream.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(ExpectError::Io(e)),
            None => Ok(None),
        }
    }

    /// Output read from the child but not consumed by a match yet.
    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// OS process id of the child.
    pub fn pid(&self) -> u32 {
        self.process.pid()
    }

    /// A copyable handle for killing the child from elsewhere.
    pub fn process(&self) -> ProcessHandle {
        self.process
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Forcefully terminate the child (SIGKILL).
    ///
    /// Only the process is signalled; the stream stays open so that pending
    /// output can still be read, after which expect calls report
    /// [`Outcome::Eof`].
    ///
    /// # Errors
    ///
    /// The OS error when the process no longer exists (`no such process`).
    pub fn kill(&mut self) -> Result<(), ExpectError> {
        self.process.kill()?;
        if self.state == SessionState::Running {
            self.state = SessionState::Killed;
        }
        Ok(())
    }

    /// Close the stream to the child.
    ///
    /// Later expect, send and read calls fail with `bad file descriptor`. The
    /// child is not signalled and may keep running.
    pub fn close(&mut self) {
        debug!("closing stream of pid {}", self.process.pid());
        self.stream = None;
        self.writer = None;
        self._master = None;
        self.state = SessionState::Closed;
    }

    /// Check if the process is still alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the process handle has been consumed by a previous
    /// call to `wait()`.
    pub fn is_alive(&mut self) -> Result<bool, ExpectError> {
        let child = self.child.as_mut().ok_or(ExpectError::ProcessExited)?;
        match child.try_wait() {
            Ok(Some(_)) => Ok(false),
            Ok(None) => Ok(true),
            Err(e) => Err(ExpectError::Io(e)),
        }
    }

    /// Wait for the process to exit and return its exit status.
    ///
    /// After this call the child handle is consumed and subsequent calls fail
    /// with [`ExpectError::ProcessExited`].
    pub async fn wait(&mut self) -> Result<ExitStatus, ExpectError> {
        let mut child = self.child.take().ok_or(ExpectError::ProcessExited)?;

        let status = tokio::task::spawn_blocking(move || child.wait())
            .await
            .map_err(|e| ExpectError::Io(io::Error::other(e)))??;

        Ok(status)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.process.pid())
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

fn closed() -> ExpectError {
    ExpectError::Io(io::Error::from(Errno::BADF))
}
