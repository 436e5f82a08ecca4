//! Result types for expect operations

mod error;

pub use error::{ExpectError, PatternError};
pub(crate) use error::os_message;

/// Result code for a hard error (see [`ExpectError`]).
pub const ERROR: i64 = -1;

/// Result code when no pattern matched before the timeout elapsed.
pub const TIMEOUT: i64 = -2;

/// Result code when the buffer filled up without a match.
pub const FULLBUFFER: i64 = -5;

/// Result code when the child's output side closed before a match.
pub const EOF: i64 = -11;

/// Outcome of an expect call.
///
/// A successful call either matched one of the patterns or ended in one of the
/// soft conditions below. Each outcome maps onto a numeric code through
/// [`Outcome::code`]: the matched pattern's value, or one of the negative
/// sentinels [`TIMEOUT`], [`EOF`] and [`FULLBUFFER`]. Pattern values are
/// unsigned, so the two ranges never collide.
///
/// # Examples
///
/// ```no_run
/// use ptyexpect::{Outcome, Pattern, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let mut session = Session::spawn("cat", &[])?;
/// match session.expect(&[Pattern::exact("$ ", 1)]).await? {
///     Outcome::Matched(m) => println!("output before prompt: {}", m.before),
///     Outcome::Timeout => println!("no prompt yet"),
///     Outcome::Eof => println!("child went away"),
///     Outcome::FullBuffer => println!("too much unexpected output"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A pattern matched.
    Matched(MatchResult),

    /// The global timeout elapsed without a match.
    Timeout,

    /// The stream reached end of file without a match.
    Eof,

    /// More unmatched output arrived than the buffer may hold.
    ///
    /// The unmatched output is discarded.
    FullBuffer,
}

impl Outcome {
    /// Numeric result code: the matched pattern's value or a sentinel.
    pub fn code(&self) -> i64 {
        match self {
            Outcome::Matched(m) => i64::from(m.value),
            Outcome::Timeout => TIMEOUT,
            Outcome::Eof => EOF,
            Outcome::FullBuffer => FULLBUFFER,
        }
    }

    /// The match details, if a pattern matched.
    pub fn matched(&self) -> Option<&MatchResult> {
        match self {
            Outcome::Matched(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` for [`Outcome::Matched`].
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Matched(_))
    }
}

/// Details of a successful pattern match.
///
/// # Regex Captures
///
/// For `RegExp` patterns the `captures` field holds every group:
///
/// ```no_run
/// use ptyexpect::{Pattern, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let mut session = Session::spawn("/bin/echo", &["user@example.com"])?;
/// let outcome = session
///     .expect(&[Pattern::regexp(r"(\w+)@(\w+)\.(\w+)", 7)])
///     .await?;
///
/// if let Some(m) = outcome.matched() {
///     // captures[0] is the full match
///     println!("User: {}", m.captures[1]);
///     println!("Domain: {}", m.captures[2]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Value of the pattern that matched.
    pub value: u32,

    /// Position of the matching pattern in the list passed to `expect`.
    pub pattern_index: usize,

    /// The matched text.
    pub matched: String,

    /// Unconsumed output that preceded the match.
    ///
    /// This is usually the interesting part, e.g. the output of a command
    /// when expecting the next prompt.
    pub before: String,

    /// Captured groups (for regex patterns).
    ///
    /// - Index 0: the full matched text
    /// - Index 1+: each capture group, empty when the group did not take part
    ///
    /// Empty for exact and glob patterns.
    pub captures: Vec<String>,
}
