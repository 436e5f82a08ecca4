//! Error types for ptyexpect

use crate::pattern::Pattern;
use crate::result::ERROR;
use std::io;
use thiserror::Error;

/// Errors that can occur while spawning or driving a session.
///
/// Soft outcomes of an expect call (timeout, end of file, full buffer) are not
/// errors; they are reported through [`Outcome`](crate::Outcome). Everything in
/// this enum maps to the [`ERROR`] sentinel code.
///
/// Messages that originate from the operating system are reported verbatim,
/// in the lower-case errno form (`no such file or directory`,
/// `bad file descriptor`), so callers can compare them as strings.
///
/// # Examples
///
/// ```no_run
/// use ptyexpect::{ExpectError, Pattern, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::spawn("cat", &[])?;
///
/// match session.expect(&[Pattern::glob("ready", 1)]).await {
///     Ok(outcome) => println!("outcome code {}", outcome.code()),
///     Err(ExpectError::BadPattern(p)) => eprintln!("bad pattern {}", p),
///     Err(ExpectError::Io(e)) => eprintln!("stream failed: {}", e),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum ExpectError {
    /// A pattern with an unsupported kind.
    ///
    /// Detected before any byte is read, so the session stream is untouched.
    #[error("Bad Pattern: {0}")]
    BadPattern(Pattern),

    /// A pattern of a supported kind whose text does not compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    /// The child process could not be created.
    #[error("{}", os_message(.0))]
    Spawn(io::Error),

    /// I/O failure on the session stream.
    ///
    /// Returned when reading from or writing to a closed, invalid or dead
    /// stream.
    #[error("{}", os_message(.0))]
    Io(#[from] io::Error),

    /// PTY allocation or plumbing failure.
    #[error("PTY error: {0}")]
    Pty(String),

    /// Process already waited on.
    ///
    /// Returned when calling [`Session::wait`](crate::Session::wait) a second
    /// time.
    #[error("Process has already exited")]
    ProcessExited,
}

impl ExpectError {
    /// Numeric result code for this error, always [`ERROR`].
    pub fn code(&self) -> i64 {
        ERROR
    }

    /// The underlying OS error, if this error carries one.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            ExpectError::Spawn(e) | ExpectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors related to compiling pattern text.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Invalid regular expression.
    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Invalid glob pattern.
    #[error("Invalid glob: {0}")]
    InvalidGlob(String),

    /// Empty pattern text.
    #[error("Pattern cannot be empty")]
    EmptyPattern,
}

/// Render an I/O error the way the C library reports errno values.
///
/// `No such file or directory (os error 2)` becomes `no such file or directory`.
/// Errors that did not come from the OS are rendered unchanged.
pub(crate) fn os_message(err: &io::Error) -> String {
    let text = err.to_string();
    let Some(code) = err.raw_os_error() else {
        return text;
    };
    let detail = text
        .strip_suffix(&format!(" (os error {code})"))
        .unwrap_or(&text);

    let mut chars = detail.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
