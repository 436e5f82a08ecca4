//! Pattern model and validation for expect operations

mod matcher;

pub(crate) use matcher::Matcher;

use crate::result::{ExpectError, PatternError};
use std::fmt;

/// The kind of rule a [`Pattern`] applies.
///
/// Only [`Glob`](PatternKind::Glob), [`Exact`](PatternKind::Exact) and
/// [`RegExp`](PatternKind::RegExp) are accepted by
/// [`Session::expect`](crate::Session::expect). The remaining variants exist so
/// that every raw kind code of the expect C library can be represented and
/// rejected with a precise diagnostic.
///
/// | Kind       | Code | Accepted |
/// |------------|------|----------|
/// | `Glob`     | 1    | yes      |
/// | `Exact`    | 2    | yes      |
/// | `RegExp`   | 3    | yes      |
/// | `Compiled` | 4    | no       |
/// | `Null`     | 5    | no       |
/// | `Other(n)` | n    | no       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Shell-style wildcard pattern (`*`, `?`, `[...]`).
    Glob,
    /// Literal substring.
    Exact,
    /// Regular expression.
    RegExp,
    /// Precompiled regular expression. Not supported.
    Compiled,
    /// Null byte / end marker. Not supported.
    Null,
    /// Any other raw code.
    Other(u32),
}

impl PatternKind {
    /// Raw numeric code of this kind.
    pub fn code(self) -> u32 {
        match self {
            PatternKind::Glob => 1,
            PatternKind::Exact => 2,
            PatternKind::RegExp => 3,
            PatternKind::Compiled => 4,
            PatternKind::Null => 5,
            PatternKind::Other(code) => code,
        }
    }

    /// Whether the matcher honors this kind.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            PatternKind::Glob | PatternKind::Exact | PatternKind::RegExp
        )
    }
}

impl From<u32> for PatternKind {
    fn from(code: u32) -> Self {
        match code {
            1 => PatternKind::Glob,
            2 => PatternKind::Exact,
            3 => PatternKind::RegExp,
            4 => PatternKind::Compiled,
            5 => PatternKind::Null,
            other => PatternKind::Other(other),
        }
    }
}

/// A matching rule paired with the value returned when it matches.
///
/// # Examples
///
/// ```
/// use ptyexpect::{Pattern, PatternKind};
///
/// let prompt = Pattern::exact("$ ", 0);
/// let failure = Pattern::glob("*rror*", 1);
/// let number = Pattern::regexp(r"\d+ packets", 2);
///
/// // Raw form, as the C library spells it
/// let same = Pattern::new(PatternKind::from(2), "$ ", 0);
/// assert_eq!(prompt, same);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    /// Rule kind.
    pub kind: PatternKind,
    /// Pattern source; meaning depends on `kind`.
    pub text: String,
    /// Value reported when this pattern matches.
    pub value: u32,
}

impl Pattern {
    /// Create a pattern of any kind.
    pub fn new(kind: PatternKind, text: impl Into<String>, value: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            value,
        }
    }

    /// Create an exact substring pattern.
    pub fn exact(text: impl Into<String>, value: u32) -> Self {
        Self::new(PatternKind::Exact, text, value)
    }

    /// Create a glob pattern.
    ///
    /// Globs are unanchored: `more` matches any output containing `more`.
    /// `*` matches any run of output, newlines included. `?` matches one
    /// character, or one byte where the output is not valid UTF-8. Character
    /// classes such as `[a-z]` match a single byte.
    pub fn glob(text: impl Into<String>, value: u32) -> Self {
        Self::new(PatternKind::Glob, text, value)
    }

    /// Create a regular expression pattern.
    ///
    /// The expression is compiled when it is passed to
    /// [`Session::expect`](crate::Session::expect); invalid syntax is reported
    /// there.
    pub fn regexp(text: impl Into<String>, value: u32) -> Self {
        Self::new(PatternKind::RegExp, text, value)
    }

    /// Convert pattern to a matcher implementation
    pub(crate) fn to_matcher(&self) -> Result<Box<dyn Matcher>, PatternError> {
        use matcher::{ExactMatcher, GlobMatcher, RegexMatcher};

        match self.kind {
            PatternKind::Exact => Ok(Box::new(ExactMatcher::new(self.text.as_bytes())?)),
            PatternKind::RegExp => Ok(Box::new(RegexMatcher::new(&self.text)?)),
            PatternKind::Glob => Ok(Box::new(GlobMatcher::new(&self.text)?)),
            // validate() rejects these before any matcher is built
            PatternKind::Compiled | PatternKind::Null | PatternKind::Other(_) => {
                Err(PatternError::InvalidGlob(format!(
                    "unsupported pattern kind {}",
                    self.kind.code()
                )))
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {} {}}}", self.kind.code(), self.text, self.value)
    }
}

/// Check that every pattern has a supported kind.
///
/// Fails on the first offending pattern, in list order.
pub fn validate(patterns: &[Pattern]) -> Result<(), ExpectError> {
    match patterns.iter().find(|p| !p.kind.is_supported()) {
        Some(bad) => Err(ExpectError::BadPattern(bad.clone())),
        None => Ok(()),
    }
}
