//! ptyexpect: expect-style automation of interactive programs
//!
//! ptyexpect drives an interactive child process (a shell, a network client,
//! a REPL) through a pseudo-terminal, so the child believes a human is typing.
//! The caller writes input and waits for patterns to show up in the child's
//! combined output, in the manner of the Unix `expect` library.
//!
//! # Features
//!
//! - **PTY based**: the child sees a real terminal
//! - **Async/await**: built on tokio; an expect call suspends the calling task
//! - **Pattern matching**: exact strings, shell globs and regular expressions
//! - **List-order precedence**: the first listed pattern that matches wins
//! - **Incremental**: matches may span any number of reads
//! - **Sentinels**: timeout, end of file and full buffer are ordinary outcomes
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ptyexpect::{config, Pattern, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     config::set_timeout(5);
//!
//!     let mut session = Session::spawn("cat", &[])?;
//!     session.send_line("oh and more").await?;
//!
//!     let outcome = session.expect(&[Pattern::glob("more", 1)]).await?;
//!     assert_eq!(outcome.code(), 1);
//!
//!     session.send_line("Or maybe it was a goat?").await?;
//!     let outcome = session.expect(&[Pattern::glob("goat", 2)]).await?;
//!     assert_eq!(outcome.code(), 2);
//!
//!     session.kill()?;
//!     Ok(())
//! }
//! ```
//!
//! # Result codes
//!
//! Every pattern carries a caller-chosen value that is reported when it
//! matches. Conditions other than a match have reserved negative codes:
//!
//! | Code           | Meaning                                   |
//! |----------------|-------------------------------------------|
//! | `value` (>= 0) | the pattern with this value matched       |
//! | [`ERROR`]      | hard error, see [`ExpectError`]           |
//! | [`TIMEOUT`]    | nothing matched before the global timeout |
//! | [`FULLBUFFER`] | too much unmatched output                 |
//! | [`EOF`]        | the child's output closed                 |
//!
//! # Global settings
//!
//! The timeout, buffer capacity, debugging and console echo switches are
//! process-wide, like the globals of the C library; see [`config`].

#![warn(missing_docs)]

#[cfg(not(unix))]
compile_error!("ptyexpect drives children through Unix pseudo-terminals");

mod buffer;
pub mod config;
mod engine;
mod pattern;
mod result;
mod session;

// Public API exports
pub use pattern::{validate, Pattern, PatternKind};
pub use result::{
    ExpectError, MatchResult, Outcome, PatternError, EOF, ERROR, FULLBUFFER, TIMEOUT,
};
pub use session::{ProcessHandle, Session, SessionBuilder, SessionState};

// Re-export commonly used types
pub use portable_pty::ExitStatus;
