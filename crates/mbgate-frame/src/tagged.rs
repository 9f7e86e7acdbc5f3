use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

/// Tag prefix size in bytes.
pub const TAG_SIZE: usize = 1;

/// Position of a fragment within its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// The whole message in one packet.
    Single = 0x00,
    /// First packet of a multi-packet message.
    Start = 0x01,
    /// Any packet between `Start` and `End`.
    Continue = 0x02,
    /// Last packet of a multi-packet message.
    End = 0x03,
}

impl Tag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Tag::Single),
            0x01 => Some(Tag::Start),
            0x02 => Some(Tag::Continue),
            0x03 => Some(Tag::End),
            _ => None,
        }
    }

    /// Whether this tag closes a message.
    pub fn completes(self) -> bool {
        matches!(self, Tag::Single | Tag::End)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Single => "SINGLE",
            Tag::Start => "START",
            Tag::Continue => "CONTINUE",
            Tag::End => "END",
        }
    }
}

/// One tagged packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub tag: Tag,
    pub payload: Bytes,
}

impl Fragment {
    pub fn new(tag: Tag, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    /// Packet size on the wire (tag byte + payload).
    pub fn wire_size(&self) -> usize {
        TAG_SIZE + self.payload.len()
    }

    /// Append the wire form to `dst`.
    ///
    /// ```text
    /// ┌──────────┬──────────────────────────┐
    /// │ Tag (1B) │ Payload (≤ mtu - 1 bytes) │
    /// └──────────┴──────────────────────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        dst.put_u8(self.tag as u8);
        dst.put_slice(&self.payload);
    }

    /// The wire form as a standalone packet.
    pub fn to_packet(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Parse one packet. Returns `None` for an empty packet or an unknown tag.
pub fn decode_fragment(packet: &[u8]) -> Option<Fragment> {
    let (&tag, payload) = packet.split_first()?;
    let tag = Tag::from_byte(tag)?;
    Some(Fragment::new(tag, Bytes::copy_from_slice(payload)))
}

/// Slice `message` into tagged fragments of at most `max_payload` bytes each.
///
/// A message that fits (including an empty one) becomes a single `Single`
/// fragment; anything longer becomes `Start`, zero or more `Continue`, `End`.
///
/// `max_payload` must be nonzero; the writer validates this before calling.
pub fn split_tagged(message: &[u8], max_payload: usize) -> Vec<Fragment> {
    let max_payload = max_payload.max(1);
    if message.len() <= max_payload {
        return vec![Fragment::new(Tag::Single, Bytes::copy_from_slice(message))];
    }

    let chunks: Vec<&[u8]> = message.chunks(max_payload).collect();
    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let tag = match i {
                0 => Tag::Start,
                i if i == last => Tag::End,
                _ => Tag::Continue,
            };
            Fragment::new(tag, Bytes::copy_from_slice(chunk))
        })
        .collect()
}

/// Accumulates tagged packets until a message completes.
#[derive(Debug, Default)]
pub struct TaggedReassembler {
    buf: BytesMut,
}

impl TaggedReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one packet. Returns the complete message on `Single` or `End`.
    ///
    /// Payloads are appended in arrival order; there is no sequence check, so
    /// a `Start` in the middle of a message does not restart it.
    pub fn push(&mut self, packet: &[u8]) -> Option<Bytes> {
        let Some(fragment) = decode_fragment(packet) else {
            debug!(size = packet.len(), "dropping untagged packet");
            return None;
        };

        self.buf.extend_from_slice(&fragment.payload);
        if fragment.tag.completes() {
            Some(self.buf.split().freeze())
        } else {
            None
        }
    }

    /// Discard any partial message.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Bytes held for the message in progress.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}
