//! Pattern matcher implementations

use crate::result::PatternError;
use globset::GlobBuilder;
use regex::bytes::{Regex, RegexBuilder};

/// Result of a pattern match
#[derive(Debug, Clone)]
pub struct Match {
    /// Start position of the match
    pub start: usize,
    /// End position of the match
    pub end: usize,
    /// Captured groups (for regex)
    pub captures: Vec<String>,
}

/// Trait for pattern matching
pub trait Matcher: Send + Sync {
    /// Find the leftmost match in the buffer
    fn find(&self, buffer: &[u8]) -> Option<Match>;
}

/// Exact string matcher using Boyer-Moore-Horspool algorithm
pub struct ExactMatcher {
    pattern: Vec<u8>,
    bad_char_table: [usize; 256],
}

impl ExactMatcher {
    /// Create a new exact matcher
    pub fn new(pattern: impl Into<Vec<u8>>) -> Result<Self, PatternError> {
        let pattern = pattern.into();

        if pattern.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        // Build bad character table for Boyer-Moore-Horspool
        let mut bad_char_table = [pattern.len(); 256];
        for (i, &byte) in pattern.iter().enumerate().take(pattern.len() - 1) {
            bad_char_table[byte as usize] = pattern.len() - 1 - i;
        }

        Ok(Self {
            pattern,
            bad_char_table,
        })
    }
}

impl Matcher for ExactMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        let len = self.pattern.len();
        let mut pos = 0;

        while pos + len <= buffer.len() {
            if buffer[pos..pos + len] == self.pattern[..] {
                return Some(Match {
                    start: pos,
                    end: pos + len,
                    captures: vec![],
                });
            }

            let shift_char = buffer[pos + len - 1];
            pos += self.bad_char_table[shift_char as usize];
        }

        None
    }
}

/// Regex matcher over raw bytes.
///
/// Output from a terminal is not guaranteed to be valid UTF-8, so the
/// expression runs on bytes; captures are converted lossily.
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    /// Create a new regex matcher
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl Matcher for RegexMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        let captures = self.regex.captures(buffer)?;
        let full_match = captures.get(0)?;

        let capture_strings = captures
            .iter()
            .map(|group| {
                group
                    .map(|g| String::from_utf8_lossy(g.as_bytes()).into_owned())
                    .unwrap_or_default()
            })
            .collect();

        Some(Match {
            start: full_match.start(),
            end: full_match.end(),
            captures: capture_strings,
        })
    }
}

/// One UTF-8 encoded character, or any single byte when the input is not
/// valid UTF-8 at that point. Alternatives are tried in order.
const ANY_CHAR: &str = r"(?:[\x00-\x7F]|[\xC2-\xDF][\x80-\xBF]|[\xE0-\xEF][\x80-\xBF]{2}|[\xF0-\xF4][\x80-\xBF]{3}|[\x80-\xFF])";

/// Glob pattern matcher.
///
/// The glob is translated by `globset` into a regular expression, which is then
/// run unanchored over the buffer, so the glob matches any substring. `*` spans
/// newlines and path separators; `?` matches a single character, or a single
/// byte of output that is not valid UTF-8.
pub struct GlobMatcher {
    regex: Regex,
}

impl GlobMatcher {
    /// Create a new glob matcher
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|e| PatternError::InvalidGlob(e.to_string()))?;

        // globset anchors the whole expression as `(?-u)^...$`
        let anchored = glob.regex();
        let body = anchored
            .strip_prefix("(?-u)^")
            .and_then(|rest| rest.strip_suffix('$'))
            .ok_or_else(|| {
                PatternError::InvalidGlob(format!("unexpected translation {}", anchored))
            })?;

        let regex = RegexBuilder::new(&format!("(?-u){}", widen_any(body)))
            .dot_matches_new_line(true)
            .build()?;

        Ok(Self { regex })
    }
}

/// Replace each single-byte `.` that globset emits for `?` with [`ANY_CHAR`].
///
/// globset escapes every literal, so an unescaped `.` comes either from `?` or
/// from the `.*` of a `*`, which already spans any bytes and is kept.
fn widen_any(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '.' if chars.peek() != Some(&'*') => out.push_str(ANY_CHAR),
            _ => out.push(c),
        }
    }
    out
}

impl Matcher for GlobMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        self.regex.find(buffer).map(|m| Match {
            start: m.start(),
            end: m.end(),
            captures: vec![],
        })
    }
}
