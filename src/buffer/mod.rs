//! Accumulation buffer for process output

use bytes::{Bytes, BytesMut};

/// Holds output that has been read from the child but not yet consumed by a
/// match.
///
/// Bytes only ever leave from the front: a match consumes everything up to its
/// end, so the next expect call starts right after it.
pub struct BufferManager {
    buffer: BytesMut,
}

impl Default for BufferManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferManager {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Append data to the buffer
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Unconsumed bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop everything before `end` and return the text of the first `start`
    /// bytes along with the bytes in `start..end`.
    pub fn consume(&mut self, start: usize, end: usize) -> (String, String) {
        let end = end.min(self.buffer.len());
        let start = start.min(end);

        let taken = self.buffer.split_to(end);
        let before = String::from_utf8_lossy(&taken[..start]).into_owned();
        let matched = String::from_utf8_lossy(&taken[start..]).into_owned();
        (before, matched)
    }

    /// Drop every unconsumed byte
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Take every unconsumed byte out of the buffer
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Number of unconsumed bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns `true` when more than `max_size` bytes are waiting
    pub fn exceeds(&self, max_size: usize) -> bool {
        self.buffer.len() > max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buffer = BufferManager::new();
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_appends() {
        let mut buffer = BufferManager::new();
        buffer.append(b"Hello ");
        buffer.append(b"World");
        assert_eq!(buffer.len(), 11);
        assert_eq!(buffer.as_bytes(), b"Hello World");
    }

    #[test]
    fn test_consume_splits_before_and_matched() {
        let mut buffer = BufferManager::new();
        buffer.append(b"here's some input for you");

        let (before, matched) = buffer.consume(12, 17);
        assert_eq!(before, "here's some ");
        assert_eq!(matched, "input");
        assert_eq!(buffer.as_bytes(), b" for you");
    }

    #[test]
    fn test_consume_keeps_rest_for_next_call() {
        let mut buffer = BufferManager::new();
        buffer.append(b">> a response with wombats therein\r\n");

        buffer.consume(0, 2);
        buffer.consume(1, 11);
        assert_eq!(buffer.as_bytes(), b" with wombats therein\r\n");
    }

    #[test]
    fn test_consume_clamps_out_of_range() {
        let mut buffer = BufferManager::new();
        buffer.append(b"abc");

        let (before, matched) = buffer.consume(5, 100);
        assert_eq!(before, "abc");
        assert_eq!(matched, "");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take() {
        let mut buffer = BufferManager::new();
        buffer.append(b"Binary\x00Data");

        let taken = buffer.take();
        assert_eq!(&taken[..], b"Binary\x00Data");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_exceeds() {
        let mut buffer = BufferManager::new();
        buffer.append(&b"A".repeat(10));

        assert!(!buffer.exceeds(10));
        assert!(buffer.exceeds(9));

        buffer.clear();
        assert!(!buffer.exceeds(0));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut buffer = BufferManager::new();
        buffer.append(&[0xFF, b'o', b'k']);

        let (before, matched) = buffer.consume(1, 3);
        assert_eq!(before, "\u{FFFD}");
        assert_eq!(matched, "ok");
    }
}
