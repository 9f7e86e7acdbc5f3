use bytes::{Bytes, BytesMut};
use tracing::debug;

/// Terminator written after the last chunk of a message.
pub const DEFAULT_TERMINATOR: &str = "<END>";

/// Slice `text` into chunks of at most `chunk_size` bytes.
///
/// Chunks end on character boundaries so every chunk is valid UTF-8 on its
/// own. A character wider than `chunk_size` gets a chunk to itself. The
/// terminator is not included; an empty `text` yields no chunks.
pub fn split_sentinel(text: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(text.len() / chunk_size + 1);
    let mut rest = text;

    while !rest.is_empty() {
        let mut end = chunk_size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Accumulates text chunks until the terminator arrives.
#[derive(Debug)]
pub struct SentinelReassembler {
    buf: BytesMut,
    terminator: Bytes,
}

impl SentinelReassembler {
    pub fn new(terminator: impl Into<Bytes>) -> Self {
        Self {
            buf: BytesMut::new(),
            terminator: terminator.into(),
        }
    }

    /// Feed one packet. Returns the complete message when the packet is
    /// exactly the terminator; every other packet is appended as-is.
    pub fn push(&mut self, packet: &[u8]) -> Option<Bytes> {
        if packet == self.terminator.as_ref() {
            debug!(size = self.buf.len(), "sentinel terminator received");
            return Some(self.buf.split().freeze());
        }
        self.buf.extend_from_slice(packet);
        None
    }

    /// Discard any partial message.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }
}

impl Default for SentinelReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_in_fives() {
        let chunks = split_sentinel("hello world", 5);
        assert_eq!(chunks, vec!["hello", " worl", "d"]);

        let mut reassembler = SentinelReassembler::default();
        for chunk in &chunks {
            assert!(reassembler.push(chunk.as_bytes()).is_none());
        }
        let message = reassembler.push(DEFAULT_TERMINATOR.as_bytes()).unwrap();
        assert_eq!(message.as_ref(), b"hello world");
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_sentinel("", 5).is_empty());

        let mut reassembler = SentinelReassembler::default();
        let message = reassembler.push(b"<END>").unwrap();
        assert!(message.is_empty());
    }

    #[test]
    fn chunks_respect_char_boundaries() {
        let text = "añb€c";
        let chunks = split_sentinel(text, 2);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.len() <= 3, "{chunk:?}");
        }
        assert_eq!(chunks, vec!["a", "ñ", "b", "€", "c"]);
    }

    #[test]
    fn terminator_must_match_exactly() {
        let mut reassembler = SentinelReassembler::new("EOM");
        assert!(reassembler.push(b"EOM ").is_none());
        assert!(reassembler.push(b"xEOM").is_none());
        let message = reassembler.push(b"EOM").unwrap();
        assert_eq!(message.as_ref(), b"EOM xEOM");
    }

    #[test]
    fn buffer_cleared_after_completion() {
        let mut reassembler = SentinelReassembler::default();
        reassembler.push(b"one");
        assert_eq!(reassembler.push(b"<END>").unwrap().as_ref(), b"one");
        assert_eq!(reassembler.buffered_len(), 0);

        reassembler.push(b"two");
        assert_eq!(reassembler.push(b"<END>").unwrap().as_ref(), b"two");
    }

    #[test]
    fn reset_discards_partial_message() {
        let mut reassembler = SentinelReassembler::default();
        reassembler.push(b"stale");
        reassembler.reset();
        reassembler.push(b"fresh");
        assert_eq!(reassembler.push(b"<END>").unwrap().as_ref(), b"fresh");
        assert_eq!(reassembler.terminator(), b"<END>");
    }
}
