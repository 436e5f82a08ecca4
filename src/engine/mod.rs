//! The expect engine: incremental multi-pattern matching over child output
//!
//! Output arrives as chunks on a channel fed by the session's pump thread.
//! Every chunk is appended to the session buffer and the whole unconsumed
//! buffer is rescanned, so a match may span any number of reads. Patterns are
//! tried in list order and the first one with any match wins, even when a
//! later pattern matches earlier in the buffer.

use crate::buffer::BufferManager;
use crate::config;
use crate::pattern::{self, Matcher, Pattern};
use crate::result::{ExpectError, MatchResult, Outcome};
use bytes::Bytes;
use log::debug;
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

/// One read from the child: a chunk of output or the error that ended reading.
pub(crate) type Chunk = io::Result<Bytes>;

/// Receiving side of a session's output channel. A closed channel is EOF.
pub(crate) type OutputStream = UnboundedReceiver<Chunk>;

struct CompiledPattern {
    index: usize,
    value: u32,
    matcher: Box<dyn Matcher>,
}

/// A validated, compiled pattern list ready to run against a stream.
pub(crate) struct MatchEngine {
    patterns: Vec<CompiledPattern>,
    timeout: Option<Duration>,
    match_max: usize,
    debugging: bool,
    log_to_console: bool,
}

impl MatchEngine {
    /// Validate and compile `patterns`.
    ///
    /// Kind validation runs over the whole list before anything is compiled,
    /// and both happen before any I/O. The global settings are read once, at
    /// this point, and hold for the rest of the call.
    pub fn compile(patterns: &[Pattern]) -> Result<Self, ExpectError> {
        pattern::validate(patterns)?;

        let patterns = patterns
            .iter()
            .enumerate()
            .map(|(index, p)| {
                Ok(CompiledPattern {
                    index,
                    value: p.value,
                    matcher: p.to_matcher()?,
                })
            })
            .collect::<Result<Vec<_>, ExpectError>>()?;

        Ok(Self {
            patterns,
            timeout: config::timeout(),
            match_max: config::match_max(),
            debugging: config::is_debugging(),
            log_to_console: config::logs_to_console(),
        })
    }

    /// Try every pattern, in list order, against the unconsumed buffer.
    ///
    /// On a match the buffer is consumed up to the end of the match.
    pub fn scan(&self, buffer: &mut BufferManager) -> Option<MatchResult> {
        let (compiled, m) = self
            .patterns
            .iter()
            .find_map(|c| c.matcher.find(buffer.as_bytes()).map(|m| (c, m)))?;

        let (before, matched) = buffer.consume(m.start, m.end);

        if self.debugging {
            debug!(
                "pattern #{} (value {}) matched {:?}",
                compiled.index, compiled.value, matched
            );
        }

        Some(MatchResult {
            value: compiled.value,
            pattern_index: compiled.index,
            matched,
            before,
            captures: m.captures,
        })
    }

    /// Read from `stream` until a pattern matches or the call ends in a soft
    /// outcome, echoing output to stdout when console logging is on.
    pub async fn run(
        &self,
        buffer: &mut BufferManager,
        stream: &mut OutputStream,
    ) -> Result<Outcome, ExpectError> {
        self.run_with_echo(buffer, stream, &mut io::stdout()).await
    }

    /// Like [`run`](Self::run), with console echo going to `sink`.
    ///
    /// Output already in `buffer` is tested first. After that patterns are
    /// only retested when new bytes arrive.
    pub async fn run_with_echo<W: Write + Send>(
        &self,
        buffer: &mut BufferManager,
        stream: &mut OutputStream,
        sink: &mut W,
    ) -> Result<Outcome, ExpectError> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(result) = self.scan(buffer) {
                return Ok(Outcome::Matched(result));
            }

            if buffer.exceeds(self.match_max) {
                if self.debugging {
                    debug!(
                        "buffer full ({} bytes, max {}), discarding",
                        buffer.len(),
                        self.match_max
                    );
                }
                buffer.clear();
                return Ok(Outcome::FullBuffer);
            }

            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, stream.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        if self.debugging {
                            debug!("timed out after {:?}", self.timeout);
                        }
                        return Ok(Outcome::Timeout);
                    }
                },
                None => stream.recv().await,
            };

            match next {
                Some(Ok(chunk)) => {
                    if self.debugging {
                        debug!("read {} bytes: {:?}", chunk.len(), String::from_utf8_lossy(&chunk));
                    }
                    if self.log_to_console {
                        echo(sink, &chunk);
                    }
                    buffer.append(&chunk);
                }
                Some(Err(e)) => {
                    if self.debugging {
                        debug!("read failed: {}", e);
                    }
                    return Err(ExpectError::Io(e));
                }
                None => {
                    if self.debugging {
                        debug!("eof with {} unmatched bytes", buffer.len());
                    }
                    return Ok(Outcome::Eof);
                }
            }
        }
    }
}

/// Copy child output to the console sink.
fn echo<W: Write>(sink: &mut W, chunk: &[u8]) {
    // Echo is best effort; a closed stdout must not fail the expect call
    let _ = sink.write_all(chunk).and_then(|_| sink.flush());
}

#[cfg(test)]
impl MatchEngine {
    fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn match_max(mut self, match_max: usize) -> Self {
        self.match_max = match_max;
        self
    }

    fn debugging(mut self, debugging: bool) -> Self {
        self.debugging = debugging;
        self
    }

    fn log_to_console(mut self, log_to_console: bool) -> Self {
        self.log_to_console = log_to_console;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternKind;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

    fn stream_of(chunks: &[&[u8]]) -> (UnboundedSender<Chunk>, OutputStream) {
        let (tx, rx) = unbounded_channel();
        for chunk in chunks {
            tx.send(Ok(Bytes::copy_from_slice(chunk))).unwrap();
        }
        (tx, rx)
    }

    fn engine(patterns: &[Pattern]) -> MatchEngine {
        MatchEngine::compile(patterns)
            .unwrap()
            .timeout(Some(Duration::from_millis(200)))
            .match_max(2000)
            .debugging(false)
            .log_to_console(false)
    }

    // `#[tokio::test]` runs on the current thread, so a thread-local record
    // list sees exactly the engine under test.
    thread_local! {
        static RECORDS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    struct ThreadRecorder;

    impl log::Log for ThreadRecorder {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            RECORDS.with(|r| r.borrow_mut().push(record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static RECORDER: ThreadRecorder = ThreadRecorder;

    fn record_logs() {
        let _ = log::set_logger(&RECORDER);
        log::set_max_level(log::LevelFilter::Trace);
        RECORDS.with(|r| r.borrow_mut().clear());
    }

    fn recorded() -> Vec<String> {
        RECORDS.with(|r| r.borrow().clone())
    }

    fn disambiguation_patterns() -> Vec<Pattern> {
        vec![
            Pattern::exact("a response", 1),
            Pattern::glob("wombats", 2),
            Pattern::regexp("ABO.T", 3),
        ]
    }

    #[tokio::test]
    async fn test_exact_match_returns_value() {
        let (_tx, mut rx) = stream_of(&[b"hello world\r\n"]);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::exact("hello world\r\n", 1)])
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 1);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_first_pattern_in_list_wins() {
        let (_tx, mut rx) = stream_of(&[b"wombats and then a response\n"]);
        let mut buffer = BufferManager::new();

        let outcome = engine(&disambiguation_patterns())
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        // "wombats" starts earlier but "a response" is first in the list
        let m = outcome.matched().unwrap();
        assert_eq!(m.value, 1);
        assert_eq!(m.pattern_index, 0);
        assert_eq!(m.before, "wombats and then ");
        assert_eq!(buffer.as_bytes(), b"\n");
    }

    #[tokio::test]
    async fn test_disambiguation_sequence() {
        let (tx, mut rx) = stream_of(&[]);
        let mut buffer = BufferManager::new();
        let prompt = engine(&[Pattern::exact(">>", 0)]);
        let patterns = engine(&disambiguation_patterns());

        let lines: [(&[u8], i64); 4] = [
            (b">> a response\r\n", 1),
            (b">> a response with wombats therein\r\n", 1),
            (b">> another response with wombats therein\r\n", 2),
            (b">> ABORT\r\n", 3),
        ];

        for (line, expected) in lines {
            tx.send(Ok(Bytes::copy_from_slice(line))).unwrap();
            assert_eq!(prompt.run(&mut buffer, &mut rx).await.unwrap().code(), 0);
            assert_eq!(
                patterns.run(&mut buffer, &mut rx).await.unwrap().code(),
                expected
            );
        }
    }

    #[tokio::test]
    async fn test_match_spanning_reads() {
        let (_tx, mut rx) = stream_of(&[b"pass", b"wo", b"rd: "]);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::regexp(r"password:\s", 5)])
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 5);
    }

    #[tokio::test]
    async fn test_leftover_output_is_matched_without_reading() {
        let (_tx, mut rx) = stream_of(&[]);
        let mut buffer = BufferManager::new();
        buffer.append(b"Or maybe it was a goat?\r\n");

        let outcome = engine(&[Pattern::glob("goat", 2)])
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 2);
    }

    #[tokio::test]
    async fn test_timeout() {
        let (_tx, mut rx) = stream_of(&[b"nothing useful"]);
        let mut buffer = BufferManager::new();

        let started = std::time::Instant::now();
        let outcome = engine(&[Pattern::glob("input", 1)])
            .timeout(Some(Duration::from_millis(100)))
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(100));
        // Unmatched output stays for the next call
        assert_eq!(buffer.as_bytes(), b"nothing useful");
    }

    #[tokio::test]
    async fn test_zero_timeout_uses_available_output() {
        let (_tx, mut rx) = stream_of(&[b"ready\n"]);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::exact("ready", 1)])
            .timeout(Some(Duration::ZERO))
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 1);
    }

    #[tokio::test]
    async fn test_eof_when_channel_closes() {
        let (tx, mut rx) = stream_of(&[b"partial output"]);
        drop(tx);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::glob("input", 1)])
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Eof);
        assert_eq!(outcome.code(), crate::EOF);
    }

    #[tokio::test]
    async fn test_match_before_eof() {
        let (tx, mut rx) = stream_of(&[b"last words"]);
        drop(tx);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::exact("words", 4)])
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 4);
    }

    #[tokio::test]
    async fn test_full_buffer() {
        let flood = b"y\n".repeat(64);
        let (_tx, mut rx) = stream_of(&[&flood]);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::exact("n", 1)])
            .match_max(100)
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::FullBuffer);
        assert_eq!(outcome.code(), crate::FULLBUFFER);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_match_wins_over_full_buffer() {
        let mut flood = b"y\n".repeat(64);
        flood.extend_from_slice(b"done");
        let (_tx, mut rx) = stream_of(&[&flood]);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::exact("done", 1)])
            .match_max(100)
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 1);
    }

    #[tokio::test]
    async fn test_read_error_is_hard_error() {
        let (tx, mut rx) = stream_of(&[]);
        tx.send(Err(io::Error::other("pty gone"))).unwrap();
        let mut buffer = BufferManager::new();

        let result = engine(&[Pattern::glob("input", 1)])
            .run(&mut buffer, &mut rx)
            .await;

        match result {
            Err(ExpectError::Io(e)) => assert_eq!(e.to_string(), "pty gone"),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_kind_rejected_before_compiling() {
        // The invalid regex after the bad kind is never compiled
        let patterns = [
            Pattern::new(PatternKind::from(44), "bad pattern", 2),
            Pattern::regexp("(unclosed", 3),
        ];

        match MatchEngine::compile(&patterns) {
            Err(ExpectError::BadPattern(p)) => assert_eq!(p.to_string(), "{44 bad pattern 2}"),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("bad pattern accepted"),
        }
    }

    #[test]
    fn test_invalid_regex_is_pattern_error() {
        let result = MatchEngine::compile(&[Pattern::regexp("(unclosed", 3)]);
        assert!(matches!(result, Err(ExpectError::Pattern(_))));
    }

    proptest! {
        #[test]
        fn prop_first_listed_pattern_wins(
            words in prop::collection::vec("[a-d]{1,3}", 1..6),
            output in "[a-d ]{0,40}",
        ) {
            let patterns: Vec<Pattern> = words
                .iter()
                .enumerate()
                .map(|(i, w)| Pattern::exact(w.as_str(), i as u32))
                .collect();
            let expected = words
                .iter()
                .position(|w| output.contains(w.as_str()))
                .map(|i| i as i64);

            let (tx, mut rx) = stream_of(&[output.as_bytes()]);
            drop(tx);
            let mut buffer = BufferManager::new();
            let outcome = tokio_test::block_on(engine(&patterns).run(&mut buffer, &mut rx)).unwrap();

            match expected {
                Some(value) => prop_assert_eq!(outcome.code(), value),
                None => prop_assert_eq!(outcome, Outcome::Eof),
            }
        }
    }

    #[tokio::test]
    async fn test_console_echo_copies_every_chunk() {
        let (_tx, mut rx) = stream_of(&[b"first ", b"second ", b"prompt> ", b"after"]);
        let mut buffer = BufferManager::new();
        let mut console = Vec::new();

        let outcome = engine(&[Pattern::exact("prompt>", 1)])
            .log_to_console(true)
            .run_with_echo(&mut buffer, &mut rx, &mut console)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 1);
        // Only chunks read by this call are echoed
        assert_eq!(console, b"first second prompt> ");
    }

    #[tokio::test]
    async fn test_console_echo_off() {
        let (_tx, mut rx) = stream_of(&[b"first ", b"prompt> "]);
        let mut buffer = BufferManager::new();
        let mut console = Vec::new();

        let outcome = engine(&[Pattern::exact("prompt>", 1)])
            .run_with_echo(&mut buffer, &mut rx, &mut console)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 1);
        assert!(console.is_empty());
    }

    #[tokio::test]
    async fn test_debugging_logs_reads_and_match() {
        record_logs();
        let (_tx, mut rx) = stream_of(&[b"login: "]);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::exact("login:", 4)])
            .debugging(true)
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome.code(), 4);
        let records = recorded();
        assert_eq!(records.len(), 2, "{:?}", records);
        assert!(records[0].starts_with("read 7 bytes"));
        assert_eq!(records[1], "pattern #0 (value 4) matched \"login:\"");
    }

    #[tokio::test]
    async fn test_debugging_logs_eof() {
        record_logs();
        let (tx, mut rx) = stream_of(&[b"abc"]);
        drop(tx);
        let mut buffer = BufferManager::new();

        let outcome = engine(&[Pattern::exact("zzz", 1)])
            .debugging(true)
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Eof);
        assert_eq!(recorded().last().unwrap(), "eof with 3 unmatched bytes");
    }

    #[tokio::test]
    async fn test_no_logs_without_debugging() {
        record_logs();
        let (tx, mut rx) = stream_of(&[b"login: "]);
        drop(tx);
        let mut buffer = BufferManager::new();

        engine(&[Pattern::exact("login:", 1)])
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();
        engine(&[Pattern::exact("password:", 2)])
            .run(&mut buffer, &mut rx)
            .await
            .unwrap();

        assert!(recorded().is_empty(), "{:?}", recorded());
    }
}
